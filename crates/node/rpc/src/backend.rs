//! Block access shared by the JSON-RPC, filter and WebSocket APIs.

use std::{fmt, sync::Arc};

use alloy_primitives::{Address, B256, Bloom, U64, U256};
use evmgate_config::{DEFAULT_BLOCK_RANGE_CAP, DEFAULT_CHAIN_ID, DEFAULT_LOGS_CAP};
use evmgate_indexer::EvmTxIndexer;
use evmgate_primitives::{MsgEthereumTx, NativeBlock, NativeBlockResult, TxDecoder};
use evmgate_translate::{
    BlockContext, RpcBlock, block_bloom, block_gas_limit, eth_msgs_from_block, rpc_block_from_native,
};
use tracing::debug;

use crate::{BlockNumberOrTag, NativeClient, RpcError};

/// Limits and chain identity applied by the [`Backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendConfig {
    /// Chain id reported for legacy transactions.
    pub chain_id: u64,
    /// Maximum number of logs returned by one scan.
    pub logs_cap: usize,
    /// Maximum block span of one scan.
    pub block_range_cap: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            logs_cap: DEFAULT_LOGS_CAP,
            block_range_cap: DEFAULT_BLOCK_RANGE_CAP,
        }
    }
}

/// Translating view of the native node.
///
/// Transaction lookups use the local [`EvmTxIndexer`] when one is attached,
/// and upstream `tx_search` otherwise.
pub struct Backend {
    client: Arc<dyn NativeClient>,
    decoder: Arc<dyn TxDecoder>,
    pub(crate) indexer: Option<Arc<EvmTxIndexer>>,
    config: BackendConfig,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("config", &self.config)
            .field("indexer", &self.indexer.is_some())
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Creates a backend over `client`.
    pub fn new(client: Arc<dyn NativeClient>, config: BackendConfig) -> Self {
        let decoder = client.tx_decoder();
        Self { client, decoder, indexer: None, config }
    }

    /// Uses `indexer` as the transaction index source.
    #[must_use]
    pub fn with_indexer(mut self, indexer: Arc<EvmTxIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    /// Returns the configured limits.
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Returns the chain id.
    pub const fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Returns the native client.
    pub const fn client(&self) -> &Arc<dyn NativeClient> {
        &self.client
    }

    /// Returns the transaction decoder.
    pub fn decoder(&self) -> &dyn TxDecoder {
        self.decoder.as_ref()
    }

    /// Height of the latest block.
    pub async fn block_number(&self) -> Result<u64, RpcError> {
        Ok(self.client.latest_height().await?)
    }

    /// Resolves a block reference to a height, fetching the head only for tags.
    pub async fn resolve_block_number(&self, number: &BlockNumberOrTag) -> Result<u64, RpcError> {
        match number.as_number() {
            Some(height) => Ok(height),
            None => self.block_number().await,
        }
    }

    /// Native block at `height`.
    pub async fn block_by_number(&self, height: u64) -> Result<Option<NativeBlock>, RpcError> {
        Ok(self.client.block_by_height(height).await?)
    }

    /// Native block with `hash`.
    pub async fn block_by_hash(&self, hash: B256) -> Result<Option<NativeBlock>, RpcError> {
        Ok(self.client.block_by_hash(hash).await?)
    }

    /// Execution results of the block at `height`.
    pub async fn block_results(&self, height: u64) -> Result<Option<NativeBlockResult>, RpcError> {
        Ok(self.client.block_results(height).await?)
    }

    /// Base fee at `height`.
    ///
    /// Query failures are logged and reported as an inactive fee market.
    pub async fn base_fee(&self, height: u64) -> Option<U256> {
        self.client.base_fee(height).await.unwrap_or_else(|err| {
            debug!(height, error = %err, "failed to fetch base fee");
            None
        })
    }

    /// Bloom of a block, zero when the node did not emit one.
    pub fn block_bloom(results: &NativeBlockResult) -> Bloom {
        block_bloom(&results.end_block_events).unwrap_or_else(|| {
            debug!(height = results.height, "block bloom event not found");
            Bloom::ZERO
        })
    }

    /// Ethereum messages of a block in block order.
    pub fn eth_msgs_from_block(
        &self,
        block: &NativeBlock,
        results: &NativeBlockResult,
    ) -> Result<Vec<MsgEthereumTx>, RpcError> {
        Ok(eth_msgs_from_block(block, results, self.decoder())?)
    }

    /// Fetches the per-block values needed to format `block`.
    pub async fn block_context(&self, block: &NativeBlock) -> BlockContext {
        let height = block.height();
        let miner = self
            .client
            .validator_account(&block.header.proposer_address, height)
            .await
            .unwrap_or_else(|err| {
                debug!(height, error = %err, "failed to resolve block proposer");
                Address::ZERO
            });
        let gas_limit = match self.client.consensus_params(height).await {
            Ok(params) => block_gas_limit(Some(&params)),
            Err(err) => {
                debug!(height, error = %err, "failed to fetch consensus params");
                block_gas_limit(None)
            }
        };

        BlockContext { chain_id: self.chain_id(), base_fee: self.base_fee(height).await, miner, gas_limit }
    }

    /// `eth_getBlockByNumber`.
    pub async fn get_block_by_number(
        &self,
        number: BlockNumberOrTag,
        full_tx: bool,
    ) -> Result<Option<RpcBlock>, RpcError> {
        let height = self.resolve_block_number(&number).await?;
        let Some(block) = self.block_by_number(height).await? else {
            debug!(height, "block not found");
            return Ok(None);
        };
        self.rpc_block(&block, full_tx).await
    }

    /// `eth_getBlockByHash`.
    pub async fn get_block_by_hash(&self, hash: B256, full_tx: bool) -> Result<Option<RpcBlock>, RpcError> {
        let Some(block) = self.block_by_hash(hash).await? else {
            debug!(%hash, "block not found");
            return Ok(None);
        };
        self.rpc_block(&block, full_tx).await
    }

    async fn rpc_block(&self, block: &NativeBlock, full_tx: bool) -> Result<Option<RpcBlock>, RpcError> {
        let Some(results) = self.block_results(block.height()).await? else {
            debug!(height = block.height(), "block results not found");
            return Ok(None);
        };
        let ctx = self.block_context(block).await;
        Ok(Some(rpc_block_from_native(block, &results, full_tx, self.decoder(), &ctx)?))
    }

    /// `eth_getBlockTransactionCountByNumber`.
    pub async fn get_block_transaction_count_by_number(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Option<U64>, RpcError> {
        let height = self.resolve_block_number(&number).await?;
        let Some(block) = self.block_by_number(height).await? else {
            return Ok(None);
        };
        self.block_tx_count(&block).await
    }

    /// `eth_getBlockTransactionCountByHash`.
    pub async fn get_block_transaction_count_by_hash(&self, hash: B256) -> Result<Option<U64>, RpcError> {
        let Some(block) = self.block_by_hash(hash).await? else {
            return Ok(None);
        };
        self.block_tx_count(&block).await
    }

    async fn block_tx_count(&self, block: &NativeBlock) -> Result<Option<U64>, RpcError> {
        let Some(results) = self.block_results(block.height()).await? else {
            return Ok(None);
        };
        Ok(Some(U64::from(self.eth_msgs_from_block(block, &results)?.len())))
    }
}
