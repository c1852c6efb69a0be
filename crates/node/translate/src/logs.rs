//! Extraction of Ethereum logs from native transaction events.

use alloy_primitives::{Address, B256, Bytes, U64};
use evmgate_primitives::{AbciEvent, NativeBlockResult, event_types};
use serde::{Deserialize, Serialize};

use crate::{RpcLog, TranslateError};

/// Log as serialized by the native EVM module inside a `tx_log` attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics.
    #[serde(default)]
    pub topics: Vec<B256>,
    /// Unindexed data, hex encoded.
    #[serde(default)]
    pub data: Bytes,
    /// Block number.
    #[serde(default)]
    pub block_number: u64,
    /// Ethereum transaction hash.
    #[serde(default)]
    pub tx_hash: B256,
    /// Ethereum transaction index within the block.
    #[serde(default)]
    pub tx_index: u64,
    /// Block hash.
    #[serde(default)]
    pub block_hash: B256,
    /// Log index within the block.
    #[serde(default)]
    pub index: u64,
    /// Whether the log was reverted by a reorg.
    #[serde(default)]
    pub removed: bool,
}

impl From<NativeLog> for RpcLog {
    fn from(log: NativeLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_number: U64::from(log.block_number),
            transaction_hash: log.tx_hash,
            transaction_index: U64::from(log.tx_index),
            block_hash: log.block_hash,
            log_index: U64::from(log.index),
            removed: log.removed,
        }
    }
}

/// Parses every `tx_log` attribute of one log event.
pub fn parse_tx_logs_from_event(event: &AbciEvent) -> Result<Vec<RpcLog>, TranslateError> {
    event
        .attributes_with_key(event_types::ATTR_TX_LOG)
        .map(|raw| Ok(serde_json::from_str::<NativeLog>(&raw)?.into()))
        .collect()
}

/// Returns the logs of the Ethereum message at `msg_index`.
///
/// Log events are emitted once per Ethereum message, in message order.
pub fn tx_logs_from_events(events: &[AbciEvent], msg_index: usize) -> Result<Vec<RpcLog>, TranslateError> {
    let event = events
        .iter()
        .filter(|event| event.is(event_types::TX_LOG))
        .nth(msg_index)
        .ok_or(TranslateError::LogsNotFound(msg_index))?;
    parse_tx_logs_from_event(event)
}

/// Returns the logs of every Ethereum message in the events, grouped per message.
pub fn all_tx_logs_from_events(events: &[AbciEvent]) -> Result<Vec<Vec<RpcLog>>, TranslateError> {
    events
        .iter()
        .filter(|event| event.is(event_types::TX_LOG))
        .map(parse_tx_logs_from_event)
        .collect()
}

/// Returns the logs of every Ethereum message in a block, grouped per message.
pub fn logs_from_block_results(results: &NativeBlockResult) -> Result<Vec<Vec<RpcLog>>, TranslateError> {
    let mut block_logs = Vec::new();
    for res in &results.txs_results {
        block_logs.extend(all_tx_logs_from_events(&res.events)?);
    }
    Ok(block_logs)
}
