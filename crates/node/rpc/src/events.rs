//! Decoding of native events into Ethereum notification payloads.

use alloy_primitives::B256;
use evmgate_primitives::{EventDataNewBlockHeader, EventDataTx};
use evmgate_translate::{EthHeader, RpcLog, all_tx_logs_from_events, block_bloom, eth_header_from_native};
use tracing::debug;

use crate::{Backend, RpcError};

impl Backend {
    /// Ethereum header of a `NewBlockHeader` event.
    pub async fn header_from_event(&self, data: &EventDataNewBlockHeader) -> EthHeader {
        let bloom = block_bloom(&data.end_block_events).unwrap_or_default();
        let base_fee = self.base_fee(data.header.height).await;
        eth_header_from_native(&data.header, bloom, base_fee)
    }

    /// Hashes of the Ethereum messages carried by a `Tx` event.
    ///
    /// Transactions that fail to decode yield nothing.
    pub fn eth_hashes_from_tx_event(&self, data: &EventDataTx) -> Vec<B256> {
        match self.decoder().decode_tx(&data.tx) {
            Ok(tx) => tx.ethereum_messages().map(|msg| msg.hash).collect(),
            Err(err) => {
                debug!(height = data.height, index = data.index, error = %err, "failed to decode tx");
                Vec::new()
            }
        }
    }

    /// Logs emitted by every Ethereum message of a `Tx` event.
    pub fn logs_from_tx_event(data: &EventDataTx) -> Result<Vec<RpcLog>, RpcError> {
        Ok(all_tx_logs_from_events(&data.result.events)?.into_iter().flatten().collect())
    }
}
