//! evmgate - Ethereum JSON-RPC gateway over a native node.

use clap::Parser;

mod cli;

fn main() -> eyre::Result<()> {
    cli::Cli::parse().run()
}
