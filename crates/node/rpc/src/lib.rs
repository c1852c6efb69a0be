//! Ethereum JSON-RPC and WebSocket gateway over a native node.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/evmgate/evmgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod backend;
pub use backend::{Backend, BackendConfig};

mod config;
pub use config::{CorsConfig, RpcServerConfig};

mod error;
pub use error::{RpcError, codes};

mod eth;
pub use eth::{
    EthApiImpl, EthApiServer, NetApiImpl, NetApiServer, Web3ApiImpl, Web3ApiServer,
};

mod events;

mod filters;
pub use filters::{FiltersApi, FiltersConfig};

mod indexer_service;
pub use indexer_service::{DEFAULT_POLL_INTERVAL, IndexerService};

mod logs;

pub mod memory;
pub use memory::InMemoryNode;

mod server;
pub use server::{RpcServer, RpcServerHandle, ServerError};

mod subscriber;
pub use subscriber::{
    DEFAULT_SUBSCRIPTION_CAPACITY, EVM_EVENTS_QUERY, EventSubscriber, HEADER_EVENTS_QUERY,
    Subscription, SubscriptionKind, TX_EVENTS_QUERY,
};

mod tx_info;

mod types;
pub use types::{
    BlockNumberOrTag, BlockTag, FilterChanges, FilterCriteria, FilterKind, SubscriptionId,
    ValueOrArray,
};

mod upstream;
pub use upstream::{ClientError, EventSource, NativeClient};

mod websocket;
pub use websocket::WsGateway;

#[cfg(test)]
mod test_utils;
