use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use evmgate_config::GatewayConfig;
use evmgate_rpc::{EventSource, InMemoryNode, NativeClient, RpcServer, RpcServerConfig};

#[derive(Parser, Debug)]
#[command(name = "evmgate")]
#[command(about = "Ethereum JSON-RPC gateway over a native node")]
pub(crate) struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Serve an in-process development chain.
    #[arg(long)]
    pub dev: bool,

    /// Block interval of the development chain, in milliseconds.
    #[arg(long, default_value_t = 1000, requires = "dev")]
    pub block_interval: u64,

    /// Override the configured chain id.
    #[arg(long)]
    pub chain_id: Option<u64>,
}

impl Cli {
    pub(crate) fn load_config(&self) -> eyre::Result<GatewayConfig> {
        let mut config = GatewayConfig::load(self.config.as_deref())?;
        if let Some(chain_id) = self.chain_id {
            config.chain.chain_id = chain_id;
        }
        Ok(config)
    }

    pub(crate) fn run(self) -> eyre::Result<()> {
        let config = self.load_config()?;

        let filter = if self.verbose { "debug" } else { config.log.filter.as_str() };
        tracing_subscriber::fmt().with_env_filter(filter).init();
        tracing::debug!(?config, "Full configuration");

        if !self.dev {
            return Err(eyre::eyre!(
                "no upstream transport is bundled; run with --dev to serve an in-process chain"
            ));
        }

        let rpc_config = RpcServerConfig::from_gateway(&config)?;
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(run_dev(rpc_config, Duration::from_millis(self.block_interval)))
    }
}

async fn run_dev(config: RpcServerConfig, block_interval: Duration) -> eyre::Result<()> {
    tracing::info!(chain_id = config.backend.chain_id, ?block_interval, "Starting development chain");

    let (node, events) = InMemoryNode::new();
    let server = RpcServer::new(
        config,
        Arc::clone(&node) as Arc<dyn NativeClient>,
        Arc::clone(&node) as Arc<dyn EventSource>,
        events,
    );
    let handle = server.start().await?;
    tracing::info!(http = %handle.http_addr(), ws = %handle.ws_addr(), "Gateway ready");

    let producer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(block_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let block = node.produce_block(Vec::new()).await;
            tracing::debug!(height = block.height(), hash = %block.hash(), "Produced block");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
        _ = producer => tracing::warn!("Block producer stopped"),
    }
    handle.abort();
    Ok(())
}
