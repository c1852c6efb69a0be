//! Translation of native blocks and results into Ethereum JSON-RPC structures.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/evmgate/evmgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block;
pub use block::{
    BlockContext, eth_header_from_native, eth_msgs_from_block, find_eth_tx_index, format_block,
    rpc_block_from_native,
};

mod bloom;
pub use bloom::{block_bloom, bloom_filter, logs_bloom};

mod error;
pub use error::TranslateError;

mod filter;
pub use filter::{LogFilter, filter_logs};

mod logs;
pub use logs::{
    NativeLog, all_tx_logs_from_events, logs_from_block_results, parse_tx_logs_from_event,
    tx_logs_from_events,
};

mod parsed;
pub use parsed::{ParsedTx, ParsedTxs, parse_tx_indexer_result};

mod receipt;
pub use receipt::build_receipt;

mod transaction;
pub use transaction::rpc_tx_from_msg;

mod types;
pub use types::{BlockTransactions, EthHeader, RpcBlock, RpcLog, RpcTransaction, RpcTransactionReceipt};

mod validity;
pub use validity::{
    DEFAULT_GAS_LIMIT, block_gas_limit, block_gas_used, should_ignore_gas_used,
    tx_exceeds_block_gas_limit, tx_is_valid_enough, tx_state_db_commit_error,
};
