//! Transaction receipts assembled from index records and block results.

use alloy_primitives::{B256, U64, U256};
use evmgate_primitives::{MsgEthereumTx, NativeBlockResult, TxResult};
use tracing::debug;

use crate::{RpcTransactionReceipt, logs_bloom, tx_logs_from_events};

/// Builds the receipt of an Ethereum message.
///
/// `eth_tx_index` is the resolved block-level index of the message. The
/// cumulative gas adds the gas of every earlier native transaction of the
/// block to the in-transaction cumulative gas of the record. Missing log
/// events yield an empty log list.
pub fn build_receipt(
    msg: &MsgEthereumTx,
    res: &TxResult,
    eth_tx_index: u32,
    block_hash: B256,
    results: &NativeBlockResult,
    base_fee: Option<U256>,
) -> RpcTransactionReceipt {
    let earlier: u64 =
        results.txs_results.iter().take(res.tx_index as usize).map(|tx| tx.gas_used).sum();
    let cumulative_gas_used = earlier + res.cumulative_gas_used;

    let logs = results
        .txs_results
        .get(res.tx_index as usize)
        .map(|tx| tx_logs_from_events(&tx.events, res.msg_index as usize))
        .transpose()
        .unwrap_or_else(|err| {
            debug!(hash = %msg.hash, error = %err, "failed to parse logs");
            None
        })
        .unwrap_or_default();

    RpcTransactionReceipt {
        tx_type: U64::from(msg.tx_type().as_u8()),
        status: U64::from(u8::from(!res.failed)),
        cumulative_gas_used: U64::from(cumulative_gas_used),
        logs_bloom: logs_bloom(&logs),
        logs,
        transaction_hash: msg.hash,
        contract_address: msg.to().is_none().then(|| msg.from.create(msg.nonce())),
        gas_used: U64::from(res.gas_used),
        block_hash,
        block_number: U64::from(res.height),
        transaction_index: U64::from(eth_tx_index),
        effective_gas_price: msg.effective_gas_price(base_fee),
        from: msg.from,
        to: msg.to(),
    }
}
