//! Native block, header and block-result types.

use alloy_primitives::{B256, Bytes};
use serde::{Deserialize, Serialize};

use crate::{AbciEvent, TxExecResult};

/// Header of a native (Tendermint) block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeHeader {
    /// Block height.
    pub height: u64,
    /// Block hash (block id).
    pub hash: B256,
    /// Hash of the previous block (`last_block_id`).
    pub parent_hash: B256,
    /// Block time as unix seconds.
    pub time: u64,
    /// Consensus address of the proposer.
    pub proposer_address: Bytes,
    /// Application state hash after the previous block.
    pub app_hash: B256,
    /// Merkle root of the block's transactions, empty for blocks without txs.
    pub data_hash: Option<B256>,
}

/// A native block: header plus opaquely-encoded transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBlock {
    /// Block header.
    pub header: NativeHeader,
    /// Raw transactions in block order.
    pub txs: Vec<Bytes>,
    /// Encoded block size in bytes.
    pub size: u64,
}

impl NativeBlock {
    /// Returns the block height.
    pub const fn height(&self) -> u64 {
        self.header.height
    }

    /// Returns the block hash.
    pub const fn hash(&self) -> B256 {
        self.header.hash
    }
}

/// Execution results for every transaction of a block plus end-of-block events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBlockResult {
    /// Block height.
    pub height: u64,
    /// One result per native transaction, same order as [`NativeBlock::txs`].
    pub txs_results: Vec<TxExecResult>,
    /// Events emitted while finalizing the block.
    pub end_block_events: Vec<AbciEvent>,
}

/// Consensus parameters relevant to block translation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Block parameters.
    pub block: BlockParams,
}

/// Block-level consensus limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    /// Maximum gas per block, `-1` when unlimited.
    pub max_gas: i64,
    /// Maximum block size in bytes.
    pub max_bytes: i64,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self { max_gas: -1, max_bytes: 22_020_096 }
    }
}
