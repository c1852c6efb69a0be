//! Historical log scans behind `eth_getLogs` and `eth_getFilterLogs`.

use alloy_primitives::B256;
use evmgate_translate::{LogFilter, RpcLog, filter_logs, logs_from_block_results};
use tracing::debug;

use crate::{Backend, FilterCriteria, RpcError};

impl Backend {
    /// Logs of every Ethereum message in the block at `height`, grouped per message.
    pub async fn get_logs_by_height(&self, height: u64) -> Result<Option<Vec<Vec<RpcLog>>>, RpcError> {
        let Some(results) = self.block_results(height).await? else {
            return Ok(None);
        };
        Ok(Some(logs_from_block_results(&results)?))
    }

    /// Logs matching `criteria`.
    ///
    /// With a block hash only that block is scanned. Otherwise the inclusive
    /// range `fromBlock..=toBlock` is scanned, skipping blocks whose bloom
    /// rules out every match. Ranges wider than the block range cap are
    /// rejected and results beyond the logs cap are truncated.
    pub async fn get_logs(&self, criteria: &FilterCriteria) -> Result<Vec<RpcLog>, RpcError> {
        let filter = LogFilter::new().address(criteria.addresses());
        let filter = criteria
            .topic_sets()
            .into_iter()
            .enumerate()
            .fold(filter, |filter, (i, topics)| filter.topic(i, topics));

        if let Some(hash) = criteria.block_hash {
            return self.block_hash_logs(hash, &filter).await;
        }

        let latest = self.block_number().await?;
        let from = criteria.from_block.as_ref().map_or(latest, |block| block.resolve(latest));
        let to = criteria.to_block.as_ref().map_or(latest, |block| block.resolve(latest));
        if from > to {
            return Err(RpcError::InvalidParams(format!(
                "invalid block range params: from {from} > to {to}"
            )));
        }
        let cap = self.config().block_range_cap;
        if to - from > cap {
            return Err(RpcError::LimitExceeded(format!("maximum [from, to] blocks distance: {cap}")));
        }

        let logs_cap = self.config().logs_cap;
        let mut logs = Vec::new();
        for height in from..=to.min(latest) {
            let Some(results) = self.block_results(height).await? else {
                debug!(height, "block result not found");
                continue;
            };
            if !filter.bloom_matches(&Self::block_bloom(&results)) {
                continue;
            }

            let block_logs = logs_from_block_results(&results)?;
            logs.extend(filter_logs(block_logs.iter().flatten(), &filter));
            if logs.len() >= logs_cap {
                debug!(from, to, height, logs_cap, "log query reached the logs cap");
                logs.truncate(logs_cap);
                break;
            }
        }
        Ok(logs)
    }

    async fn block_hash_logs(&self, hash: B256, filter: &LogFilter) -> Result<Vec<RpcLog>, RpcError> {
        let Some(block) = self.block_by_hash(hash).await? else {
            debug!(%hash, "block not found");
            return Ok(Vec::new());
        };
        let Some(block_logs) = self.get_logs_by_height(block.height()).await? else {
            return Ok(Vec::new());
        };
        let mut logs = filter_logs(block_logs.iter().flatten(), filter);
        logs.truncate(self.config().logs_cap);
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy_primitives::{Address, U64};

    use super::*;
    use crate::{
        BackendConfig, BlockNumberOrTag, InMemoryNode, NativeClient, ValueOrArray,
        test_utils::{eth_result, eth_tx, log},
    };

    /// Commits blocks up to `height`, with one log of `address` at each height in `at`.
    async fn chain(height: u64, at: &[u64], address: u8) -> Arc<InMemoryNode> {
        let (node, _events) = InMemoryNode::new();
        for h in 1..=height {
            if at.contains(&h) {
                let id = h as u8;
                node.produce_block(vec![(eth_tx(&[id]), eth_result(&[id], 0, vec![vec![log(address, 0x01, h, id)]]))])
                    .await;
            } else {
                node.produce_block(vec![]).await;
            }
        }
        node
    }

    fn backend(node: &Arc<InMemoryNode>, config: BackendConfig) -> Backend {
        Backend::new(Arc::clone(node) as Arc<dyn NativeClient>, config)
    }

    fn range(from: u64, to: u64, address: u8) -> FilterCriteria {
        FilterCriteria {
            from_block: Some(from.into()),
            to_block: Some(to.into()),
            address: Some(ValueOrArray::Value(Address::repeat_byte(address))),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn range_returns_logs_in_block_order() {
        let node = chain(25, &[10, 15, 25], 0xaa).await;
        let backend = backend(&node, BackendConfig::default());

        let logs = backend.get_logs(&range(10, 20, 0xaa)).await.unwrap();
        let heights: Vec<_> = logs.iter().map(|log| log.block_number).collect();
        assert_eq!(heights, vec![U64::from(10), U64::from(15)]);
    }

    #[tokio::test]
    async fn exact_match_included_until_to_block_excludes_it() {
        let node = chain(12, &[12], 0xaa).await;
        let backend = backend(&node, BackendConfig::default());

        let mut criteria = range(1, 12, 0xaa);
        criteria.topics = Some(vec![Some(ValueOrArray::Value(B256::repeat_byte(0x01)))]);
        assert_eq!(backend.get_logs(&criteria).await.unwrap().len(), 1);

        criteria.to_block = Some(11.into());
        assert!(backend.get_logs(&criteria).await.unwrap().is_empty());

        criteria.to_block = Some(12.into());
        criteria.topics = Some(vec![Some(ValueOrArray::Value(B256::repeat_byte(0x02)))]);
        assert!(backend.get_logs(&criteria).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_addresses_are_filtered() {
        let node = chain(5, &[2, 4], 0xaa).await;
        let backend = backend(&node, BackendConfig::default());
        assert!(backend.get_logs(&range(1, 5, 0xbb)).await.unwrap().is_empty());

        let any = FilterCriteria { from_block: Some(1.into()), ..Default::default() };
        assert_eq!(backend.get_logs(&any).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn inverted_range_errors() {
        let node = chain(5, &[], 0xaa).await;
        let backend = backend(&node, BackendConfig::default());
        let err = backend.get_logs(&range(4, 2, 0xaa)).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn range_cap_rejects_wide_scans() {
        let node = chain(10, &[], 0xaa).await;
        let backend = backend(&node, BackendConfig { block_range_cap: 5, ..Default::default() });

        let err = backend.get_logs(&range(1, 10, 0xaa)).await.unwrap_err();
        assert!(matches!(err, RpcError::LimitExceeded(_)));
        assert!(backend.get_logs(&range(5, 10, 0xaa)).await.is_ok());
    }

    #[tokio::test]
    async fn logs_cap_truncates() {
        let node = chain(6, &[1, 2, 3, 4, 5, 6], 0xaa).await;
        let backend = backend(&node, BackendConfig { logs_cap: 4, ..Default::default() });

        let logs = backend.get_logs(&range(1, 6, 0xaa)).await.unwrap();
        assert_eq!(logs.len(), 4);
        assert_eq!(logs[3].block_number, U64::from(4));
    }

    #[tokio::test]
    async fn block_hash_scans_one_block() {
        let node = chain(3, &[2, 3], 0xaa).await;
        let hash = node.block_by_height(2).await.unwrap().unwrap().hash();
        let backend = backend(&node, BackendConfig::default());

        let criteria = FilterCriteria { block_hash: Some(hash), ..Default::default() };
        let logs = backend.get_logs(&criteria).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, U64::from(2));

        let unknown = FilterCriteria { block_hash: Some(B256::repeat_byte(0x99)), ..Default::default() };
        assert!(backend.get_logs(&unknown).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_tags_follow_head() {
        let node = chain(4, &[4], 0xaa).await;
        let backend = backend(&node, BackendConfig::default());

        let criteria = FilterCriteria {
            from_block: Some(BlockNumberOrTag::Latest),
            to_block: Some(BlockNumberOrTag::Latest),
            ..Default::default()
        };
        assert_eq!(backend.get_logs(&criteria).await.unwrap().len(), 1);

        let grouped = backend.get_logs_by_height(4).await.unwrap().unwrap();
        assert_eq!(grouped.len(), 1);
        assert!(backend.get_logs_by_height(9).await.unwrap().is_none());
    }
}
