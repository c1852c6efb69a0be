//! Interfaces of the native node consumed by the gateway.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use evmgate_primitives::{ConsensusParams, NativeBlock, NativeBlockResult, NativeTxResult, TxDecoder};
use thiserror::Error;

/// Errors returned by the native node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The node could not be reached or refused the request.
    #[error("native node unavailable: {0}")]
    Unavailable(String),

    /// The node rejected the query.
    #[error("invalid native query: {0}")]
    InvalidQuery(String),

    /// The node answered with data that could not be interpreted.
    #[error("malformed native response: {0}")]
    Malformed(String),
}

/// Block and query access to the native node.
///
/// Absent blocks and results are `Ok(None)`. Errors are never retried by the
/// gateway.
#[async_trait]
pub trait NativeClient: Send + Sync {
    /// Height of the latest committed block.
    async fn latest_height(&self) -> Result<u64, ClientError>;

    /// Block at `height`.
    async fn block_by_height(&self, height: u64) -> Result<Option<NativeBlock>, ClientError>;

    /// Block with `hash`.
    async fn block_by_hash(&self, hash: B256) -> Result<Option<NativeBlock>, ClientError>;

    /// Execution results of the block at `height`.
    async fn block_results(&self, height: u64) -> Result<Option<NativeBlockResult>, ClientError>;

    /// Consensus parameters in force at `height`.
    async fn consensus_params(&self, height: u64) -> Result<ConsensusParams, ClientError>;

    /// Base fee at `height`, `None` while the fee market is inactive.
    async fn base_fee(&self, height: u64) -> Result<Option<U256>, ClientError>;

    /// Ethereum address of the validator with consensus address `proposer`.
    async fn validator_account(&self, proposer: &Bytes, height: u64) -> Result<Address, ClientError>;

    /// Searches the native transaction index with an event query.
    async fn tx_search(&self, query: &str) -> Result<Vec<NativeTxResult>, ClientError>;

    /// Raw transactions waiting in the mempool.
    async fn unconfirmed_txs(&self) -> Result<Vec<Bytes>, ClientError>;

    /// Decoder for the node's transaction encoding.
    fn tx_decoder(&self) -> Arc<dyn TxDecoder>;
}

/// Subscription control of the native event stream.
///
/// Events for every subscribed query arrive on a single stream handed to the
/// [`EventSubscriber`](crate::EventSubscriber), each tagged with its query.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Starts delivering events matching `query`.
    async fn subscribe(&self, query: &str) -> Result<(), ClientError>;

    /// Stops delivering events matching `query`.
    async fn unsubscribe(&self, query: &str) -> Result<(), ClientError>;
}
