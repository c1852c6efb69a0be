//! Fixtures shared by the gateway tests.

use alloy_primitives::{Address, B256, Bytes, U256};
use evmgate_primitives::{
    AbciEvent, DecodedTx, JsonTxCodec, LegacyTx, MsgEthereumTx, TxData, TxExecResult, TxMessage,
    event_types,
};
use evmgate_translate::NativeLog;

pub(crate) const GAS_PER_MSG: u64 = 21_000;
pub(crate) const GAS_LIMIT: u64 = 100_000;

pub(crate) fn hash(id: u8) -> B256 {
    B256::repeat_byte(id)
}

pub(crate) fn eth_msg(id: u8) -> MsgEthereumTx {
    MsgEthereumTx {
        hash: hash(id),
        from: Address::repeat_byte(0xf0),
        data: TxData::Legacy(LegacyTx {
            nonce: u64::from(id),
            gas_price: U256::from(10),
            gas_limit: GAS_LIMIT,
            to: Some(Address::repeat_byte(0xee)),
            value: U256::from(1),
            ..Default::default()
        }),
    }
}

/// Raw native transaction carrying one Ethereum message per id.
pub(crate) fn eth_tx(ids: &[u8]) -> Bytes {
    JsonTxCodec::encode(&DecodedTx {
        messages: ids.iter().map(|id| TxMessage::Ethereum(eth_msg(*id))).collect(),
    })
}

pub(crate) fn cosmos_tx() -> Bytes {
    JsonTxCodec::encode(&DecodedTx {
        messages: vec![TxMessage::Other { type_url: "/cosmos.bank.v1beta1.MsgSend".into() }],
    })
}

/// Successful execution of [`eth_tx`] whose messages take block-level
/// indexes from `first_index`; `logs[i]` are the logs of message `i`.
pub(crate) fn eth_result(ids: &[u8], first_index: u32, logs: Vec<Vec<NativeLog>>) -> TxExecResult {
    let mut events = vec![AbciEvent::new(
        event_types::MESSAGE,
        [(event_types::ATTR_MODULE, event_types::MODULE_EVM)],
    )];
    for (i, id) in ids.iter().enumerate() {
        let eth_hash = hash(*id).to_string();
        let index = (first_index + i as u32).to_string();
        events.push(AbciEvent::new(
            event_types::PENDING_ETHEREUM_TX,
            [(event_types::ATTR_ETH_HASH, eth_hash.clone()), (event_types::ATTR_INDEX, index.clone())],
        ));
        events.push(AbciEvent::new(
            event_types::ETHEREUM_TX,
            [
                (event_types::ATTR_ETH_HASH, eth_hash),
                (event_types::ATTR_INDEX, index),
                (event_types::ATTR_GAS_USED, GAS_PER_MSG.to_string()),
                (event_types::ATTR_ETH_TX_FAILED, String::new()),
            ],
        ));
    }
    for msg_logs in logs {
        let attributes: Vec<_> = msg_logs
            .iter()
            .map(|log| (event_types::ATTR_TX_LOG, serde_json::to_string(log).expect("encode log")))
            .collect();
        events.push(AbciEvent::new(event_types::TX_LOG, attributes));
    }

    TxExecResult {
        gas_wanted: GAS_LIMIT * ids.len() as u64,
        gas_used: GAS_PER_MSG * ids.len() as u64,
        events,
        ..Default::default()
    }
}

/// Execution result with only the pending events, as emitted by nodes
/// that index transactions before execution completes.
pub(crate) fn pending_only_result(ids: &[u8]) -> TxExecResult {
    let events = ids
        .iter()
        .map(|id| {
            AbciEvent::new(event_types::PENDING_ETHEREUM_TX, [(event_types::ATTR_ETH_HASH, hash(*id).to_string())])
        })
        .collect();
    TxExecResult { gas_used: GAS_PER_MSG * ids.len() as u64, events, ..Default::default() }
}

pub(crate) fn log(address: u8, topic: u8, height: u64, tx: u8) -> NativeLog {
    NativeLog {
        address: Address::repeat_byte(address),
        topics: vec![B256::repeat_byte(topic)],
        data: Bytes::from_static(b"\x01"),
        block_number: height,
        tx_hash: hash(tx),
        ..Default::default()
    }
}

/// Polls `condition` until it holds, panicking after two seconds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition reached in time");
}
