//! Ethereum transaction objects built from native messages.

use alloy_primitives::{B256, U64, U256};
use evmgate_primitives::{MsgEthereumTx, TxData, TxType};

use crate::RpcTransaction;

/// Builds the JSON-RPC transaction object for an Ethereum message.
///
/// Positional fields are set only when `block_hash` is non-zero, so passing
/// [`B256::ZERO`] yields a pending transaction. Typed transactions carry their
/// own chain id and access list; legacy ones report `chain_id`.
pub fn rpc_tx_from_msg(
    msg: &MsgEthereumTx,
    block_hash: B256,
    block_number: u64,
    index: u64,
    base_fee: Option<U256>,
    chain_id: u64,
) -> RpcTransaction {
    let mined = block_hash != B256::ZERO;
    let (v, r, s) = msg.signature();

    let mut tx = RpcTransaction {
        from: msg.from,
        gas: U64::from(msg.gas()),
        gas_price: msg.gas_fee_cap(),
        hash: msg.hash,
        input: msg.input().clone(),
        nonce: U64::from(msg.nonce()),
        to: msg.to(),
        value: msg.value(),
        tx_type: U64::from(msg.tx_type().as_u8()),
        chain_id: Some(U64::from(chain_id)),
        v,
        r,
        s,
        ..Default::default()
    };

    if mined {
        tx.block_hash = Some(block_hash);
        tx.block_number = Some(U64::from(block_number));
        tx.transaction_index = Some(U64::from(index));
    }

    match msg.tx_type() {
        TxType::Legacy => {}
        TxType::AccessList => {
            tx.access_list = msg.access_list().cloned();
            tx.chain_id = msg.chain_id().map(U64::from);
        }
        TxType::DynamicFee => {
            tx.access_list = msg.access_list().cloned();
            tx.chain_id = msg.chain_id().map(U64::from);
            if let TxData::DynamicFee(data) = &msg.data {
                tx.max_fee_per_gas = Some(data.gas_fee_cap);
                tx.max_priority_fee_per_gas = Some(data.gas_tip_cap);
            }
            tx.gas_price = msg.effective_gas_price(base_fee.filter(|_| mined));
        }
    }

    tx
}
