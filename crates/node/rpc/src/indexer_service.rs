//! Background service keeping the local transaction index at the chain head.

use std::{fmt, sync::Arc, time::Duration};

use evmgate_indexer::EvmTxIndexer;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{NativeClient, RpcError};

/// Default delay between head polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls the native node and indexes every block it has not seen yet.
///
/// An empty index is backfilled from height 1. Otherwise the first sync
/// resumes after the last block holding an indexed transaction, and later
/// syncs continue after the last block processed.
pub struct IndexerService {
    client: Arc<dyn NativeClient>,
    indexer: Arc<EvmTxIndexer>,
    interval: Duration,
    next_height: Mutex<Option<u64>>,
}

impl fmt::Debug for IndexerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerService")
            .field("last_indexed_block", &self.indexer.last_indexed_block())
            .field("next_height", &*self.next_height.lock())
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl IndexerService {
    /// Creates a service feeding `indexer` from `client`.
    pub fn new(client: Arc<dyn NativeClient>, indexer: Arc<EvmTxIndexer>) -> Self {
        Self { client, indexer, interval: DEFAULT_POLL_INTERVAL, next_height: Mutex::new(None) }
    }

    /// Set the delay between head polls.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Indexes every block up to the current head, returning how many were indexed.
    ///
    /// Stops early at the first block the node cannot serve.
    pub async fn sync(&self) -> Result<u64, RpcError> {
        let cursor = *self.next_height.lock();
        let next = cursor.unwrap_or_else(|| self.indexer.last_indexed_block().map_or(1, |height| height + 1));
        let latest = self.client.latest_height().await?;

        let mut indexed = 0;
        for height in next..=latest {
            let Some(block) = self.client.block_by_height(height).await? else {
                warn!(height, "block not available for indexing");
                break;
            };
            let Some(results) = self.client.block_results(height).await? else {
                warn!(height, "block results not available for indexing");
                break;
            };
            let txs = self.indexer.index_block(&block, &results.txs_results)?;
            debug!(height, txs, "indexed block");
            *self.next_height.lock() = Some(height + 1);
            indexed += 1;
        }
        Ok(indexed)
    }

    /// Runs [`IndexerService::sync`] on every poll until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval = ?self.interval, "starting indexer service");
            loop {
                match self.sync().await {
                    Ok(0) => {}
                    Ok(indexed) => info!(
                        indexed,
                        last_indexed_block = self.indexer.last_indexed_block(),
                        "indexed new blocks"
                    ),
                    Err(err) => warn!(error = %err, "indexer sync failed"),
                }
                tokio::time::sleep(self.interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        InMemoryNode,
        test_utils::{cosmos_tx, eth_result, eth_tx, hash, wait_until},
    };

    fn service(node: &Arc<InMemoryNode>) -> (IndexerService, Arc<EvmTxIndexer>) {
        let indexer = Arc::new(EvmTxIndexer::new(node.tx_decoder()));
        let service = IndexerService::new(Arc::clone(node) as Arc<dyn NativeClient>, Arc::clone(&indexer));
        (service, indexer)
    }

    #[tokio::test]
    async fn sync_backfills_then_follows_head() {
        let (node, _events) = InMemoryNode::new();
        node.produce_block(vec![(eth_tx(&[1]), eth_result(&[1], 0, vec![]))]).await;
        node.produce_block(vec![(cosmos_tx(), Default::default())]).await;
        let (service, indexer) = service(&node);

        assert_eq!(service.sync().await.unwrap(), 2);
        assert_eq!(indexer.first_indexed_block(), Some(1));
        // block 2 carries no ethereum tx
        assert_eq!(indexer.last_indexed_block(), Some(1));
        assert!(indexer.get_by_tx_hash(&hash(1)).is_some());

        assert_eq!(service.sync().await.unwrap(), 0);

        node.produce_block(vec![(eth_tx(&[2]), eth_result(&[2], 0, vec![]))]).await;
        assert_eq!(service.sync().await.unwrap(), 1);
        assert_eq!(indexer.get_by_block_and_index(3, 0).map(|res| res.height), Some(3));
    }

    #[tokio::test]
    async fn restart_resumes_after_last_block_with_entries() {
        let (node, _events) = InMemoryNode::new();
        node.produce_block(vec![(eth_tx(&[1]), eth_result(&[1], 0, vec![]))]).await;
        node.produce_block(vec![(cosmos_tx(), Default::default())]).await;
        node.produce_block(Vec::new()).await;
        let (service, indexer) = service(&node);
        assert_eq!(service.sync().await.unwrap(), 3);

        let restarted = IndexerService::new(Arc::clone(&node) as Arc<dyn NativeClient>, Arc::clone(&indexer));
        assert_eq!(restarted.sync().await.unwrap(), 2);
        assert_eq!(restarted.sync().await.unwrap(), 0);
        assert_eq!(indexer.len(), 1);
    }

    #[tokio::test]
    async fn offline_node_is_an_error() {
        let (node, _events) = InMemoryNode::new();
        node.set_online(false);
        let (service, _indexer) = service(&node);
        assert!(matches!(service.sync().await, Err(RpcError::Upstream(_))));
    }

    #[tokio::test]
    async fn spawned_service_indexes_new_blocks() {
        let (node, _events) = InMemoryNode::new();
        let (service, indexer) = service(&node);
        let task = service.with_interval(Duration::from_millis(10)).spawn();

        node.produce_block(vec![(eth_tx(&[5]), eth_result(&[5], 0, vec![]))]).await;
        wait_until(|| indexer.get_by_tx_hash(&hash(5)).is_some()).await;
        task.abort();
    }
}
