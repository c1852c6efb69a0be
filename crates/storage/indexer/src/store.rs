//! In-memory Ethereum transaction index.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use alloy_primitives::B256;
use evmgate_primitives::{NativeBlock, TxDecoder, TxExecResult, TxResult};
use evmgate_translate::{ParsedTxs, tx_is_valid_enough};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::IndexerError;

#[derive(Debug, Default, Clone, Copy)]
struct Bounds {
    first: Option<u64>,
    last: Option<u64>,
}

/// Index of every Ethereum message seen in indexed blocks.
///
/// Records are keyed by Ethereum hash, with a secondary ordered index on
/// `(height, eth_tx_index)`.
pub struct EvmTxIndexer {
    decoder: Arc<dyn TxDecoder>,
    by_hash: RwLock<HashMap<B256, TxResult>>,
    by_index: RwLock<BTreeMap<(u64, u32), B256>>,
    bounds: RwLock<Bounds>,
}

impl fmt::Debug for EvmTxIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmTxIndexer")
            .field("txs", &self.by_hash.read().len())
            .field("bounds", &*self.bounds.read())
            .finish_non_exhaustive()
    }
}

impl EvmTxIndexer {
    /// Creates an empty index using `decoder` to read native transactions.
    pub fn new(decoder: Arc<dyn TxDecoder>) -> Self {
        Self {
            decoder,
            by_hash: RwLock::new(HashMap::new()),
            by_index: RwLock::new(BTreeMap::new()),
            bounds: RwLock::new(Bounds::default()),
        }
    }

    /// Indexes the Ethereum messages of a block and returns how many were recorded.
    ///
    /// Transactions that are not valid enough, cannot be decoded, carry a
    /// non-Ethereum message or have unparseable events are skipped. Every
    /// recorded message receives the next block-level Ethereum index. Only
    /// blocks that record at least one message move the indexed bounds.
    pub fn index_block(&self, block: &NativeBlock, results: &[TxExecResult]) -> Result<usize, IndexerError> {
        let height = block.height();
        if block.txs.len() != results.len() {
            return Err(IndexerError::ResultsMismatch {
                height,
                txs: block.txs.len(),
                results: results.len(),
            });
        }

        let mut records = Vec::new();
        let mut eth_tx_index: u32 = 0;
        for (tx_index, (raw, result)) in block.txs.iter().zip(results).enumerate() {
            let (valid, reason) = tx_is_valid_enough(result);
            if !valid {
                debug!(height, tx_index, reason, "skipped indexing of tx");
                continue;
            }

            let tx = match self.decoder.decode_tx(raw) {
                Ok(tx) => tx,
                Err(err) => {
                    error!(height, tx_index, error = %err, "failed to decode tx");
                    continue;
                }
            };
            if !tx.is_ethereum() {
                continue;
            }

            let parsed = match ParsedTxs::parse(result, Some(&tx)) {
                Ok(parsed) => parsed,
                Err(err) => {
                    error!(height, tx_index, error = %err, "failed to parse events");
                    continue;
                }
            };

            let mut cumulative_gas_used = 0u64;
            for (msg_index, msg) in tx.ethereum_messages().enumerate() {
                let mut record = TxResult {
                    height,
                    tx_index: tx_index as u32,
                    msg_index: msg_index as u32,
                    eth_tx_index: Some(eth_tx_index),
                    ..Default::default()
                };

                if result.is_ok() {
                    let Some(parsed_tx) = parsed.get_tx_by_msg_index(msg_index) else {
                        error!(height, msg_index, "msg index not found in events");
                        continue;
                    };
                    if let Some(found) = parsed_tx.eth_tx_index
                        && found != eth_tx_index
                    {
                        error!(height, expect = eth_tx_index, found, "eth tx index don't match");
                    }
                    record.gas_used = parsed_tx.gas_used;
                    record.failed = parsed_tx.failed;
                } else {
                    record.gas_used = msg.gas();
                    record.failed = true;
                }

                cumulative_gas_used += record.gas_used;
                record.cumulative_gas_used = cumulative_gas_used;
                eth_tx_index += 1;
                records.push((msg.hash, record));
            }
        }

        let count = records.len();
        if count == 0 {
            debug!(height, "no ethereum txs in block");
            return Ok(0);
        }
        {
            let mut by_hash = self.by_hash.write();
            let mut by_index = self.by_index.write();
            for (hash, record) in records {
                if let Some(index) = record.eth_tx_index {
                    by_index.insert((height, index), hash);
                }
                by_hash.insert(hash, record);
            }
        }
        {
            let mut bounds = self.bounds.write();
            bounds.first = Some(bounds.first.map_or(height, |first| first.min(height)));
            bounds.last = Some(bounds.last.map_or(height, |last| last.max(height)));
        }

        debug!(height, txs = count, "indexed block");
        Ok(count)
    }

    /// Returns the record of the Ethereum transaction with `hash`.
    pub fn get_by_tx_hash(&self, hash: &B256) -> Option<TxResult> {
        self.by_hash.read().get(hash).cloned()
    }

    /// Returns the record at `eth_tx_index` of block `height`.
    pub fn get_by_block_and_index(&self, height: u64, eth_tx_index: u32) -> Option<TxResult> {
        let hash = *self.by_index.read().get(&(height, eth_tx_index))?;
        self.get_by_tx_hash(&hash)
    }

    /// Returns the lowest height with at least one indexed Ethereum transaction.
    pub fn first_indexed_block(&self) -> Option<u64> {
        self.bounds.read().first
    }

    /// Returns the highest height with at least one indexed Ethereum transaction.
    pub fn last_indexed_block(&self) -> Option<u64> {
        self.bounds.read().last
    }

    /// Returns the number of indexed Ethereum transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_hash.read().len()
    }

    /// Returns true if nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_hash.read().is_empty()
    }
}
