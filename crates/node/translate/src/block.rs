//! Ethereum headers and blocks built from native blocks.

use alloy_consensus::{EMPTY_OMMER_ROOT_HASH, EMPTY_ROOT_HASH};
use alloy_primitives::{Address, B64, B256, Bloom, Bytes, U64, U256};
use evmgate_primitives::{MsgEthereumTx, NativeBlock, NativeBlockResult, NativeHeader, TxDecoder};
use tracing::debug;

use crate::{
    BlockTransactions, EthHeader, RpcBlock, TranslateError, block_bloom, block_gas_used, rpc_tx_from_msg,
    tx_is_valid_enough,
};

/// Builds the Ethereum header of a native header.
///
/// Gas fields are zero; the header carries no execution totals.
pub fn eth_header_from_native(header: &NativeHeader, bloom: Bloom, base_fee: Option<U256>) -> EthHeader {
    EthHeader {
        hash: header.hash,
        parent_hash: header.parent_hash,
        sha3_uncles: EMPTY_OMMER_ROOT_HASH,
        miner: proposer_address(header),
        state_root: header.app_hash,
        transactions_root: header.data_hash.unwrap_or(EMPTY_ROOT_HASH),
        receipts_root: EMPTY_ROOT_HASH,
        logs_bloom: bloom,
        difficulty: U256::ZERO,
        number: U64::from(header.height),
        gas_limit: U64::ZERO,
        gas_used: U64::ZERO,
        timestamp: U64::from(header.time),
        extra_data: Bytes::new(),
        mix_hash: B256::ZERO,
        nonce: B64::ZERO,
        base_fee_per_gas: base_fee,
    }
}

fn proposer_address(header: &NativeHeader) -> Address {
    let bytes = header.proposer_address.as_ref();
    let tail = &bytes[bytes.len().saturating_sub(20)..];
    let mut padded = [0u8; 20];
    padded[20 - tail.len()..].copy_from_slice(tail);
    Address::from(padded)
}

/// Returns the Ethereum messages of a block in block order.
///
/// Only transactions classified valid enough are considered; undecodable
/// transactions and non-Ethereum messages are skipped. Fails when the block
/// and its results disagree on the number of transactions.
pub fn eth_msgs_from_block(
    block: &NativeBlock,
    results: &NativeBlockResult,
    decoder: &dyn TxDecoder,
) -> Result<Vec<MsgEthereumTx>, TranslateError> {
    if block.txs.len() != results.txs_results.len() {
        return Err(TranslateError::ResultsMismatch {
            height: block.height(),
            txs: block.txs.len(),
            results: results.txs_results.len(),
        });
    }

    let mut msgs = Vec::new();
    for (raw, res) in block.txs.iter().zip(&results.txs_results) {
        let (valid, reason) = tx_is_valid_enough(res);
        if !valid {
            debug!(height = block.height(), reason, "invalid tx result code");
            continue;
        }
        let tx = match decoder.decode_tx(raw) {
            Ok(tx) => tx,
            Err(err) => {
                debug!(height = block.height(), error = %err, "failed to decode transaction in block");
                continue;
            }
        };
        msgs.extend(tx.ethereum_messages().cloned());
    }
    Ok(msgs)
}

/// Returns the block-level index of the message with `hash`.
pub fn find_eth_tx_index(msgs: &[MsgEthereumTx], hash: &B256) -> Option<u32> {
    msgs.iter().position(|msg| &msg.hash == hash).and_then(|i| u32::try_from(i).ok())
}

/// Block-level values fetched by the caller from the native node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Chain id reported for legacy transactions.
    pub chain_id: u64,
    /// Base fee at this height, if active.
    pub base_fee: Option<U256>,
    /// Ethereum address of the proposer's validator account.
    pub miner: Address,
    /// Block gas limit.
    pub gas_limit: u64,
}

/// Assembles the JSON-RPC block object.
pub fn format_block(
    header: &NativeHeader,
    size: u64,
    gas_used: u64,
    transactions: BlockTransactions,
    bloom: Bloom,
    ctx: &BlockContext,
) -> RpcBlock {
    let transactions_root = if transactions.is_empty() {
        EMPTY_ROOT_HASH
    } else {
        header.data_hash.unwrap_or(EMPTY_ROOT_HASH)
    };

    RpcBlock {
        number: U64::from(header.height),
        hash: header.hash,
        parent_hash: header.parent_hash,
        nonce: B64::ZERO,
        sha3_uncles: EMPTY_OMMER_ROOT_HASH,
        logs_bloom: bloom,
        state_root: header.app_hash,
        miner: ctx.miner,
        mix_hash: B256::ZERO,
        difficulty: U256::ZERO,
        extra_data: Bytes::new(),
        size: U64::from(size),
        gas_limit: U64::from(ctx.gas_limit),
        gas_used: U256::from(gas_used),
        timestamp: U64::from(header.time),
        transactions_root,
        receipts_root: EMPTY_ROOT_HASH,
        uncles: Vec::new(),
        transactions,
        total_difficulty: U256::ZERO,
        base_fee_per_gas: ctx.base_fee,
    }
}

/// Translates a native block and its results into a JSON-RPC block.
///
/// With `full_tx` the transactions are full objects, otherwise hashes. A
/// missing bloom event yields an empty bloom.
pub fn rpc_block_from_native(
    block: &NativeBlock,
    results: &NativeBlockResult,
    full_tx: bool,
    decoder: &dyn TxDecoder,
    ctx: &BlockContext,
) -> Result<RpcBlock, TranslateError> {
    let msgs = eth_msgs_from_block(block, results, decoder)?;
    let transactions = if full_tx {
        BlockTransactions::Full(
            msgs.iter()
                .enumerate()
                .map(|(index, msg)| {
                    rpc_tx_from_msg(
                        msg,
                        block.hash(),
                        block.height(),
                        index as u64,
                        ctx.base_fee,
                        ctx.chain_id,
                    )
                })
                .collect(),
        )
    } else {
        BlockTransactions::Hashes(msgs.iter().map(|msg| msg.hash).collect())
    };

    let bloom = block_bloom(&results.end_block_events).unwrap_or_else(|| {
        debug!(height = block.height(), "block bloom event is not found");
        Bloom::ZERO
    });

    Ok(format_block(&block.header, block.size, block_gas_used(results), transactions, bloom, ctx))
}
