//! Ethereum JSON-RPC API implementation.

use std::sync::Arc;

use alloy_primitives::{B256, Bytes, U64};
use evmgate_translate::{RpcBlock, RpcLog, RpcTransaction, RpcTransactionReceipt};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};

use crate::{BlockNumberOrTag, FilterChanges, FilterCriteria, FiltersApi, SubscriptionId};

/// Ethereum JSON-RPC API trait.
///
/// Block, transaction, receipt, filter and log methods answered from the
/// native node.
#[rpc(server, namespace = "eth")]
pub trait EthApi {
    /// Returns the chain ID.
    #[method(name = "chainId")]
    async fn chain_id(&self) -> RpcResult<U64>;

    /// Returns the current block number.
    #[method(name = "blockNumber")]
    async fn block_number(&self) -> RpcResult<U64>;

    /// Returns a block by number.
    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(
        &self,
        block: BlockNumberOrTag,
        full_transactions: bool,
    ) -> RpcResult<Option<RpcBlock>>;

    /// Returns a block by hash.
    #[method(name = "getBlockByHash")]
    async fn get_block_by_hash(&self, hash: B256, full_transactions: bool) -> RpcResult<Option<RpcBlock>>;

    /// Returns the number of Ethereum transactions in a block by number.
    #[method(name = "getBlockTransactionCountByNumber")]
    async fn get_block_transaction_count_by_number(&self, block: BlockNumberOrTag) -> RpcResult<Option<U64>>;

    /// Returns the number of Ethereum transactions in a block by hash.
    #[method(name = "getBlockTransactionCountByHash")]
    async fn get_block_transaction_count_by_hash(&self, hash: B256) -> RpcResult<Option<U64>>;

    /// Returns a transaction by hash, including pending ones.
    #[method(name = "getTransactionByHash")]
    async fn get_transaction_by_hash(&self, hash: B256) -> RpcResult<Option<RpcTransaction>>;

    /// Returns a transaction by block hash and index.
    #[method(name = "getTransactionByBlockHashAndIndex")]
    async fn get_transaction_by_block_hash_and_index(
        &self,
        hash: B256,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>>;

    /// Returns a transaction by block number and index.
    #[method(name = "getTransactionByBlockNumberAndIndex")]
    async fn get_transaction_by_block_number_and_index(
        &self,
        block: BlockNumberOrTag,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>>;

    /// Returns a transaction receipt by hash.
    #[method(name = "getTransactionReceipt")]
    async fn get_transaction_receipt(&self, hash: B256) -> RpcResult<Option<RpcTransactionReceipt>>;

    /// Installs a logs filter.
    #[method(name = "newFilter")]
    async fn new_filter(&self, criteria: FilterCriteria) -> RpcResult<SubscriptionId>;

    /// Installs a new-blocks filter.
    #[method(name = "newBlockFilter")]
    async fn new_block_filter(&self) -> RpcResult<SubscriptionId>;

    /// Installs a pending-transactions filter.
    #[method(name = "newPendingTransactionFilter")]
    async fn new_pending_transaction_filter(&self) -> RpcResult<SubscriptionId>;

    /// Returns the changes collected by a filter since the last poll.
    #[method(name = "getFilterChanges")]
    async fn get_filter_changes(&self, id: SubscriptionId) -> RpcResult<FilterChanges>;

    /// Returns every log matching a logs filter.
    #[method(name = "getFilterLogs")]
    async fn get_filter_logs(&self, id: SubscriptionId) -> RpcResult<Vec<RpcLog>>;

    /// Removes a filter.
    #[method(name = "uninstallFilter")]
    async fn uninstall_filter(&self, id: SubscriptionId) -> RpcResult<bool>;

    /// Returns logs matching the criteria.
    #[method(name = "getLogs")]
    async fn get_logs(&self, criteria: FilterCriteria) -> RpcResult<Vec<RpcLog>>;
}

/// Net namespace API.
#[rpc(server, namespace = "net")]
pub trait NetApi {
    /// Returns the network ID.
    #[method(name = "version")]
    fn version(&self) -> RpcResult<String>;
}

/// Web3 namespace API.
#[rpc(server, namespace = "web3")]
pub trait Web3Api {
    /// Returns the client version.
    #[method(name = "clientVersion")]
    fn client_version(&self) -> RpcResult<String>;

    /// Returns the Keccak-256 hash of the given data.
    #[method(name = "sha3")]
    fn sha3(&self, data: Bytes) -> RpcResult<B256>;
}

/// Ethereum API implementation over the filter registry and its backend.
#[derive(Debug, Clone)]
pub struct EthApiImpl {
    filters: Arc<FiltersApi>,
}

impl EthApiImpl {
    /// Create a new Ethereum API implementation.
    pub const fn new(filters: Arc<FiltersApi>) -> Self {
        Self { filters }
    }
}

#[jsonrpsee::core::async_trait]
impl EthApiServer for EthApiImpl {
    async fn chain_id(&self) -> RpcResult<U64> {
        Ok(U64::from(self.filters.backend().chain_id()))
    }

    async fn block_number(&self) -> RpcResult<U64> {
        Ok(U64::from(self.filters.backend().block_number().await?))
    }

    async fn get_block_by_number(
        &self,
        block: BlockNumberOrTag,
        full_transactions: bool,
    ) -> RpcResult<Option<RpcBlock>> {
        Ok(self.filters.backend().get_block_by_number(block, full_transactions).await?)
    }

    async fn get_block_by_hash(&self, hash: B256, full_transactions: bool) -> RpcResult<Option<RpcBlock>> {
        Ok(self.filters.backend().get_block_by_hash(hash, full_transactions).await?)
    }

    async fn get_block_transaction_count_by_number(&self, block: BlockNumberOrTag) -> RpcResult<Option<U64>> {
        Ok(self.filters.backend().get_block_transaction_count_by_number(block).await?)
    }

    async fn get_block_transaction_count_by_hash(&self, hash: B256) -> RpcResult<Option<U64>> {
        Ok(self.filters.backend().get_block_transaction_count_by_hash(hash).await?)
    }

    async fn get_transaction_by_hash(&self, hash: B256) -> RpcResult<Option<RpcTransaction>> {
        Ok(self.filters.backend().get_transaction_by_hash(hash).await?)
    }

    async fn get_transaction_by_block_hash_and_index(
        &self,
        hash: B256,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>> {
        Ok(self.filters.backend().get_transaction_by_block_hash_and_index(hash, index.to()).await?)
    }

    async fn get_transaction_by_block_number_and_index(
        &self,
        block: BlockNumberOrTag,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>> {
        Ok(self.filters.backend().get_transaction_by_block_number_and_index(block, index.to()).await?)
    }

    async fn get_transaction_receipt(&self, hash: B256) -> RpcResult<Option<RpcTransactionReceipt>> {
        Ok(self.filters.backend().get_transaction_receipt(hash).await?)
    }

    async fn new_filter(&self, criteria: FilterCriteria) -> RpcResult<SubscriptionId> {
        Ok(self.filters.new_filter(criteria).await?)
    }

    async fn new_block_filter(&self) -> RpcResult<SubscriptionId> {
        Ok(self.filters.new_block_filter().await?)
    }

    async fn new_pending_transaction_filter(&self) -> RpcResult<SubscriptionId> {
        Ok(self.filters.new_pending_transaction_filter().await?)
    }

    async fn get_filter_changes(&self, id: SubscriptionId) -> RpcResult<FilterChanges> {
        Ok(self.filters.get_filter_changes(&id)?)
    }

    async fn get_filter_logs(&self, id: SubscriptionId) -> RpcResult<Vec<RpcLog>> {
        Ok(self.filters.get_filter_logs(&id).await?)
    }

    async fn uninstall_filter(&self, id: SubscriptionId) -> RpcResult<bool> {
        Ok(self.filters.uninstall_filter(&id))
    }

    async fn get_logs(&self, criteria: FilterCriteria) -> RpcResult<Vec<RpcLog>> {
        Ok(self.filters.get_logs(&criteria).await?)
    }
}

/// Net API implementation.
#[derive(Clone, Debug)]
pub struct NetApiImpl {
    chain_id: u64,
}

impl NetApiImpl {
    /// Create a new Net API implementation.
    pub const fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }
}

impl NetApiServer for NetApiImpl {
    fn version(&self) -> RpcResult<String> {
        Ok(self.chain_id.to_string())
    }
}

/// Web3 API implementation.
#[derive(Clone, Debug, Default)]
pub struct Web3ApiImpl;

impl Web3ApiImpl {
    /// Create a new Web3 API implementation.
    pub const fn new() -> Self {
        Self
    }
}

impl Web3ApiServer for Web3ApiImpl {
    fn client_version(&self) -> RpcResult<String> {
        Ok(format!("evmgate/{}", env!("CARGO_PKG_VERSION")))
    }

    fn sha3(&self, data: Bytes) -> RpcResult<B256> {
        Ok(alloy_primitives::keccak256(&data))
    }
}
