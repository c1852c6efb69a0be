//! Configuration types for the evmgate gateway.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/evmgate/evmgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod chain;
pub use chain::{ChainConfig, DEFAULT_CHAIN_ID};

mod error;
pub use error::ConfigError;

mod gateway;
pub use gateway::GatewayConfig;

mod log;
pub use log::{DEFAULT_LOG_FILTER, LogConfig};

mod rpc;
pub use rpc::{
    DEFAULT_BLOCK_RANGE_CAP, DEFAULT_FILTER_CAP, DEFAULT_FILTER_TIMEOUT_SECS, DEFAULT_HTTP_ADDR,
    DEFAULT_LOGS_CAP, DEFAULT_MAX_CONNECTIONS, DEFAULT_WS_ADDR, JsonRpcConfig,
};
