//! Ethereum JSON-RPC wire types produced by the translation functions.

use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, B64, B256, Bloom, Bytes, U64, U256};
use serde::{Deserialize, Serialize};

/// Ethereum header as pushed to `newHeads` subscribers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthHeader {
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Ommers hash, always the empty-ommers root.
    pub sha3_uncles: B256,
    /// Block proposer.
    pub miner: Address,
    /// State root.
    pub state_root: B256,
    /// Transactions root.
    pub transactions_root: B256,
    /// Receipts root.
    pub receipts_root: B256,
    /// Logs bloom.
    pub logs_bloom: Bloom,
    /// Difficulty, always zero.
    pub difficulty: U256,
    /// Block number.
    pub number: U64,
    /// Gas limit.
    pub gas_limit: U64,
    /// Gas used.
    pub gas_used: U64,
    /// Block timestamp.
    pub timestamp: U64,
    /// Extra data.
    pub extra_data: Bytes,
    /// Mix hash.
    pub mix_hash: B256,
    /// Nonce.
    pub nonce: B64,
    /// Base fee per gas, omitted before activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
}

/// Rich block representation for JSON-RPC responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Block number.
    pub number: U64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Nonce.
    pub nonce: B64,
    /// Ommers hash.
    pub sha3_uncles: B256,
    /// Logs bloom filter.
    pub logs_bloom: Bloom,
    /// State root.
    pub state_root: B256,
    /// Miner/beneficiary address.
    pub miner: Address,
    /// Mix hash.
    pub mix_hash: B256,
    /// Difficulty, always zero.
    pub difficulty: U256,
    /// Extra data.
    pub extra_data: Bytes,
    /// Block size.
    pub size: U64,
    /// Gas limit.
    pub gas_limit: U64,
    /// Gas used.
    pub gas_used: U256,
    /// Block timestamp.
    pub timestamp: U64,
    /// Transactions root.
    pub transactions_root: B256,
    /// Receipts root.
    pub receipts_root: B256,
    /// Uncles, always empty.
    pub uncles: Vec<B256>,
    /// Transactions (hashes or full objects).
    pub transactions: BlockTransactions,
    /// Total difficulty, always zero.
    pub total_difficulty: U256,
    /// Base fee per gas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
}

/// Transactions in a block response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    /// Only transaction hashes.
    Hashes(Vec<B256>),
    /// Full transaction objects.
    Full(Vec<RpcTransaction>),
}

impl BlockTransactions {
    /// Returns the number of transactions.
    pub fn len(&self) -> usize {
        match self {
            Self::Hashes(hashes) => hashes.len(),
            Self::Full(txs) => txs.len(),
        }
    }

    /// Returns true if the block has no transactions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BlockTransactions {
    fn default() -> Self {
        Self::Hashes(Vec::new())
    }
}

/// Transaction object for JSON-RPC responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Block hash, absent while pending.
    #[serde(default)]
    pub block_hash: Option<B256>,
    /// Block number, absent while pending.
    #[serde(default)]
    pub block_number: Option<U64>,
    /// Sender address.
    pub from: Address,
    /// Gas limit.
    pub gas: U64,
    /// Gas price, the effective price for mined dynamic-fee transactions.
    pub gas_price: U256,
    /// Max fee per gas (EIP-1559).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    /// Max priority fee per gas (EIP-1559).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Transaction hash.
    pub hash: B256,
    /// Input data.
    pub input: Bytes,
    /// Nonce.
    pub nonce: U64,
    /// Recipient address, `null` for contract creation.
    pub to: Option<Address>,
    /// Transaction index in block, absent while pending.
    #[serde(default)]
    pub transaction_index: Option<U64>,
    /// Value transferred.
    pub value: U256,
    /// Transaction type.
    #[serde(rename = "type")]
    pub tx_type: U64,
    /// Access list of typed transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
    /// Chain ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
    /// V component of signature.
    pub v: U256,
    /// R component of signature.
    pub r: U256,
    /// S component of signature.
    pub s: U256,
}

/// Transaction receipt for JSON-RPC responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionReceipt {
    /// Transaction type.
    #[serde(rename = "type")]
    pub tx_type: U64,
    /// Status (1 = success, 0 = failure).
    pub status: U64,
    /// Gas used by this and all earlier transactions of the block.
    pub cumulative_gas_used: U64,
    /// Logs bloom filter.
    pub logs_bloom: Bloom,
    /// Logs generated.
    pub logs: Vec<RpcLog>,
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Contract address created, if any.
    pub contract_address: Option<Address>,
    /// Gas used by this transaction.
    pub gas_used: U64,
    /// Block hash.
    pub block_hash: B256,
    /// Block number.
    pub block_number: U64,
    /// Transaction index in block.
    pub transaction_index: U64,
    /// Price paid per unit of gas.
    pub effective_gas_price: U256,
    /// Sender address.
    pub from: Address,
    /// Recipient address.
    pub to: Option<Address>,
}

/// Log entry for JSON-RPC responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    /// Contract address.
    pub address: Address,
    /// Log topics.
    pub topics: Vec<B256>,
    /// Log data.
    pub data: Bytes,
    /// Block number.
    pub block_number: U64,
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Transaction index.
    pub transaction_index: U64,
    /// Block hash.
    pub block_hash: B256,
    /// Log index in block.
    pub log_index: U64,
    /// Whether this log was removed due to reorg.
    pub removed: bool,
}
