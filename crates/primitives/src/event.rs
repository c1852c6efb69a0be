//! Structured ABCI events and the native event-stream payloads.

use std::collections::BTreeMap;

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

use crate::{NativeHeader, TxExecResult};

/// Well-known event types and attribute keys emitted by the native EVM module.
pub mod event_types {
    /// Emitted before execution, carrying the Ethereum hash of the message.
    pub const PENDING_ETHEREUM_TX: &str = "eth.evm.v1.EventPendingEthereumTx";
    /// Emitted after execution with final index, gas used and failure reason.
    pub const ETHEREUM_TX: &str = "eth.evm.v1.EventEthereumTx";
    /// Emitted once per Ethereum message with its JSON-encoded logs.
    pub const TX_LOG: &str = "eth.evm.v1.EventTxLog";
    /// Emitted at end of block with the block bloom.
    pub const BLOCK_BLOOM: &str = "eth.evm.v1.EventBlockBloom";
    /// Generic message event carrying the handling module.
    pub const MESSAGE: &str = "message";

    /// Ethereum transaction hash attribute.
    pub const ATTR_ETH_HASH: &str = "eth_hash";
    /// Ethereum transaction index attribute.
    pub const ATTR_INDEX: &str = "index";
    /// Gas used attribute.
    pub const ATTR_GAS_USED: &str = "gas_used";
    /// VM failure reason attribute, empty on success.
    pub const ATTR_ETH_TX_FAILED: &str = "eth_tx_failed";
    /// Single JSON-encoded log attribute.
    pub const ATTR_TX_LOG: &str = "tx_log";
    /// Hex-encoded bloom attribute.
    pub const ATTR_BLOOM: &str = "bloom";
    /// Module attribute of the `message` event.
    pub const ATTR_MODULE: &str = "module";
    /// Name of the EVM module.
    pub const MODULE_EVM: &str = "evm";
}

/// A key/value attribute of an [`AbciEvent`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value, possibly JSON-quoted.
    pub value: String,
}

impl EventAttribute {
    /// Creates a new attribute.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Returns the value with typed-event JSON quoting removed.
    pub fn unquoted_value(&self) -> String {
        let raw = self.value.as_str();
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            if let Ok(value) = serde_json::from_str::<String>(raw) {
                return value;
            }
        }
        raw.to_string()
    }
}

/// A typed, key-value-attributed event emitted during execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbciEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ordered attributes.
    pub attributes: Vec<EventAttribute>,
}

impl AbciEvent {
    /// Creates an event from a type and `(key, value)` pairs.
    pub fn new<K, V>(kind: impl Into<String>, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind: kind.into(),
            attributes: attributes.into_iter().map(|(k, v)| EventAttribute::new(k, v)).collect(),
        }
    }

    /// Returns the unquoted value of the first attribute with `key`.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.iter().find(|attr| attr.key == key).map(EventAttribute::unquoted_value)
    }

    /// Returns the unquoted values of every attribute with `key`, in order.
    pub fn attributes_with_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = String> + 'a {
        self.attributes.iter().filter(move |attr| attr.key == key).map(EventAttribute::unquoted_value)
    }

    /// Returns true if the event has the given type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// Payload of a `NewBlockHeader` native event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDataNewBlockHeader {
    /// The new header.
    pub header: NativeHeader,
    /// Number of transactions in the block.
    pub num_txs: u64,
    /// End-of-block events, including the block bloom.
    pub end_block_events: Vec<AbciEvent>,
}

/// Payload of a `Tx` native event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDataTx {
    /// Height of the including block.
    pub height: u64,
    /// Position of the transaction in the block.
    pub index: u32,
    /// Raw native transaction.
    pub tx: Bytes,
    /// Execution result.
    pub result: TxExecResult,
}

/// Payload variants delivered by the native event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventData {
    /// A new block header was committed.
    NewBlockHeader(EventDataNewBlockHeader),
    /// A transaction was executed.
    Tx(EventDataTx),
}

/// One item of the native event stream, answering a subscribed query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeEvent {
    /// The query string this event matched, doubles as the bus topic name.
    pub query: String,
    /// Event payload.
    pub data: EventData,
    /// Flattened `type.key -> values` index of the emitted events.
    #[serde(default)]
    pub events: BTreeMap<String, Vec<String>>,
}

impl NativeEvent {
    /// Creates an event, deriving the flattened index from ABCI events.
    pub fn new(query: impl Into<String>, data: EventData) -> Self {
        let mut events: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let abci = match &data {
            EventData::NewBlockHeader(header) => &header.end_block_events,
            EventData::Tx(tx) => &tx.result.events,
        };
        for event in abci {
            for attr in &event.attributes {
                events
                    .entry(format!("{}.{}", event.kind, attr.key))
                    .or_default()
                    .push(attr.unquoted_value());
            }
        }
        Self { query: query.into(), data, events }
    }

    /// Returns true if any emitted event has type `kind`.
    pub fn has_event_type(&self, kind: &str) -> bool {
        let prefix = format!("{kind}.");
        self.events.keys().any(|key| key.starts_with(&prefix))
    }
}
