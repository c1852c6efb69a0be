//! Execution results and the per-message index record.

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

use crate::AbciEvent;

/// ABCI response codes the gateway inspects.
pub mod codes {
    /// Successful execution.
    pub const OK: u32 = 0;
    /// Native out-of-gas code.
    pub const OUT_OF_GAS: u32 = 11;
}

/// Execution result of one native transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxExecResult {
    /// Response code, zero on success.
    pub code: u32,
    /// Free-form execution log.
    #[serde(default)]
    pub log: String,
    /// Gas requested by the transaction.
    #[serde(default)]
    pub gas_wanted: u64,
    /// Gas reported by the execution.
    #[serde(default)]
    pub gas_used: u64,
    /// Events emitted during execution.
    #[serde(default)]
    pub events: Vec<AbciEvent>,
    /// Response data.
    #[serde(default)]
    pub data: Bytes,
}

impl TxExecResult {
    /// Returns true if the result code is [`codes::OK`].
    pub const fn is_ok(&self) -> bool {
        self.code == codes::OK
    }

    /// Returns an iterator over events of the given type.
    pub fn events_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a AbciEvent> + 'a {
        self.events.iter().filter(move |event| event.kind == kind)
    }
}

/// A native transaction located by an upstream search, with its result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTxResult {
    /// Block height.
    pub height: u64,
    /// Position in the block.
    pub index: u32,
    /// Raw transaction bytes.
    pub tx: Bytes,
    /// Execution result.
    pub result: TxExecResult,
}

/// Where and how an Ethereum message landed in a native block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    /// Block height.
    pub height: u64,
    /// Native transaction position within the block.
    pub tx_index: u32,
    /// Message position within the native transaction.
    pub msg_index: u32,
    /// Ethereum transaction index within the block; unknown when only the
    /// pre-execution event was seen.
    pub eth_tx_index: Option<u32>,
    /// Gas used by this message.
    pub gas_used: u64,
    /// Gas used by earlier messages of the same native transaction.
    pub cumulative_gas_used: u64,
    /// Whether the EVM execution failed.
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_types;

    #[test]
    fn events_of_filters_by_type() {
        let result = TxExecResult {
            events: vec![
                AbciEvent::new(event_types::TX_LOG, [("tx_log", "{}")]),
                AbciEvent::new(event_types::MESSAGE, [("module", "evm")]),
                AbciEvent::new(event_types::TX_LOG, [("tx_log", "{}")]),
            ],
            ..Default::default()
        };
        assert_eq!(result.events_of(event_types::TX_LOG).count(), 2);
        assert!(result.is_ok());
    }

    #[test]
    fn exec_result_defaults_when_fields_missing() {
        let result: TxExecResult = serde_json::from_str(r#"{"code":11}"#).unwrap();
        assert_eq!(result.code, codes::OUT_OF_GAS);
        assert!(result.events.is_empty());
        assert!(!result.is_ok());
    }
}
