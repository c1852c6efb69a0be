//! Reconciliation of pending and committed Ethereum events into per-message records.

use std::collections::HashMap;

use alloy_primitives::B256;
use evmgate_primitives::{AbciEvent, DecodedTx, NativeTxResult, TxExecResult, TxResult, event_types};

use crate::TranslateError;

/// Ethereum message information recovered from the events of one native transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedTx {
    /// Position among the Ethereum messages of the native transaction.
    pub msg_index: usize,
    /// Ethereum transaction hash.
    pub hash: B256,
    /// Block-level Ethereum index, `None` when no event carried one.
    pub eth_tx_index: Option<u32>,
    /// Gas used by this message.
    pub gas_used: u64,
    /// Whether execution failed.
    pub failed: bool,
}

/// All Ethereum messages of one native transaction, in message order.
///
/// Entries are stored positionally so that `txs[i].msg_index == i`, with a
/// derived hash index for lookups by Ethereum hash.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedTxs {
    /// One entry per Ethereum message.
    pub txs: Vec<ParsedTx>,
    /// Ethereum hash to message index.
    pub tx_hashes: HashMap<B256, usize>,
}

impl ParsedTxs {
    /// Parses the Ethereum events of a native transaction result.
    ///
    /// Each pending event opens a new message slot, and the committed event
    /// that follows replaces it in place. A committed event with no open slot
    /// is a protocol violation. When the native transaction failed and the
    /// decoded transaction is supplied, every message is marked failed and
    /// charged its full gas limit.
    pub fn parse(result: &TxExecResult, tx: Option<&DecodedTx>) -> Result<Self, TranslateError> {
        let mut parsed = Self::default();

        for event in &result.events {
            if event.is(event_types::PENDING_ETHEREUM_TX) {
                let hash = parse_hash(event, event_types::PENDING_ETHEREUM_TX)?;
                let eth_tx_index = parse_pending_index(event)?;
                let msg_index = parsed.txs.len();
                parsed.txs.push(ParsedTx { msg_index, hash, eth_tx_index, ..Default::default() });
                parsed.tx_hashes.insert(hash, msg_index);
            } else if event.is(event_types::ETHEREUM_TX) {
                let Some(msg_index) = parsed.txs.len().checked_sub(1) else {
                    return Err(TranslateError::CommittedWithoutPending);
                };
                let committed = parse_committed(event, msg_index)?;
                if committed.hash != parsed.txs[msg_index].hash {
                    parsed.tx_hashes.insert(committed.hash, msg_index);
                }
                parsed.txs[msg_index] = committed;
            }
        }

        if !result.is_ok()
            && let Some(tx) = tx
        {
            for (i, parsed_tx) in parsed.txs.iter_mut().enumerate() {
                let msg = tx.ethereum_message(i).ok_or(TranslateError::UnexpectedMessage(i))?;
                parsed_tx.failed = true;
                parsed_tx.gas_used = msg.gas();
            }
        }

        Ok(parsed)
    }

    /// Returns the message with the given Ethereum hash.
    pub fn get_tx_by_hash(&self, hash: &B256) -> Option<&ParsedTx> {
        self.tx_hashes.get(hash).and_then(|&i| self.txs.get(i))
    }

    /// Returns the message at `msg_index`.
    pub fn get_tx_by_msg_index(&self, msg_index: usize) -> Option<&ParsedTx> {
        self.txs.get(msg_index)
    }

    /// Returns the message with the given block-level Ethereum index.
    ///
    /// Ethereum indexes within one native transaction are contiguous, so the
    /// message index is the offset from the first message's index.
    pub fn get_tx_by_tx_index(&self, tx_index: u32) -> Option<&ParsedTx> {
        let first = self.txs.first()?.eth_tx_index?;
        let msg_index = tx_index.checked_sub(first)?;
        self.get_tx_by_msg_index(msg_index as usize)
    }

    /// Gas used by messages `0..=msg_index`, zero when out of range.
    pub fn accumulative_gas_used(&self, msg_index: usize) -> u64 {
        if msg_index >= self.txs.len() {
            return 0;
        }
        self.txs[..=msg_index].iter().map(|tx| tx.gas_used).sum()
    }

    /// Returns the number of Ethereum messages.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Returns true if no Ethereum message was found.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

/// Builds the index record of one message found by an upstream tx search.
pub fn parse_tx_indexer_result(
    native: &NativeTxResult,
    tx: Option<&DecodedTx>,
    getter: impl FnOnce(&ParsedTxs) -> Option<&ParsedTx>,
) -> Result<TxResult, TranslateError> {
    let txs = ParsedTxs::parse(&native.result, tx)?;
    let parsed = getter(&txs)
        .ok_or(TranslateError::MessageNotFound { height: native.height, index: native.index })?;

    Ok(TxResult {
        height: native.height,
        tx_index: native.index,
        msg_index: parsed.msg_index as u32,
        eth_tx_index: parsed.eth_tx_index,
        gas_used: parsed.gas_used,
        cumulative_gas_used: txs.accumulative_gas_used(parsed.msg_index),
        failed: parsed.failed,
    })
}

fn parse_hash(event: &AbciEvent, kind: &'static str) -> Result<B256, TranslateError> {
    let value = event
        .attribute(event_types::ATTR_ETH_HASH)
        .ok_or(TranslateError::MissingAttribute { event: kind, key: event_types::ATTR_ETH_HASH })?;
    value
        .parse::<B256>()
        .map_err(|_| TranslateError::InvalidAttribute { key: event_types::ATTR_ETH_HASH, value })
}

fn parse_index(value: String) -> Result<u32, TranslateError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|index| *index <= i32::MAX as u32)
        .ok_or(TranslateError::InvalidAttribute { key: event_types::ATTR_INDEX, value })
}

/// Index carried by a pending event; absent or `-1` means not yet assigned.
fn parse_pending_index(event: &AbciEvent) -> Result<Option<u32>, TranslateError> {
    match event.attribute(event_types::ATTR_INDEX) {
        None => Ok(None),
        Some(value) if value == "-1" => Ok(None),
        Some(value) => parse_index(value).map(Some),
    }
}

fn parse_committed(event: &AbciEvent, msg_index: usize) -> Result<ParsedTx, TranslateError> {
    let hash = parse_hash(event, event_types::ETHEREUM_TX)?;
    let eth_tx_index = parse_index(required(event, event_types::ATTR_INDEX)?)?;
    let gas = required(event, event_types::ATTR_GAS_USED)?;
    let gas_used = gas
        .parse::<u64>()
        .map_err(|_| TranslateError::InvalidAttribute { key: event_types::ATTR_GAS_USED, value: gas })?;
    let failed =
        event.attribute(event_types::ATTR_ETH_TX_FAILED).is_some_and(|reason| !reason.is_empty());

    Ok(ParsedTx { msg_index, hash, eth_tx_index: Some(eth_tx_index), gas_used, failed })
}

fn required(event: &AbciEvent, key: &'static str) -> Result<String, TranslateError> {
    event.attribute(key).ok_or(TranslateError::MissingAttribute { event: event_types::ETHEREUM_TX, key })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};
    use evmgate_primitives::{LegacyTx, MsgEthereumTx, TxData, TxMessage};

    use super::*;

    fn hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    fn pending(h: B256) -> AbciEvent {
        AbciEvent::new(event_types::PENDING_ETHEREUM_TX, [("eth_hash", format!("\"{h}\""))])
    }

    fn committed(h: B256, index: u32, gas: u64, failed: &str) -> AbciEvent {
        AbciEvent::new(
            event_types::ETHEREUM_TX,
            [
                ("eth_hash", h.to_string()),
                ("index", index.to_string()),
                ("gas_used", gas.to_string()),
                ("eth_tx_failed", failed.to_string()),
            ],
        )
    }

    fn eth_msg(gas_limit: u64) -> TxMessage {
        TxMessage::Ethereum(MsgEthereumTx {
            hash: B256::ZERO,
            from: Address::ZERO,
            data: TxData::Legacy(LegacyTx { gas_limit, gas_price: U256::from(1), ..Default::default() }),
        })
    }

    #[test]
    fn committed_events_replace_pending() {
        let result = TxExecResult {
            events: vec![
                pending(hash(1)),
                committed(hash(1), 4, 21_000, ""),
                pending(hash(2)),
                committed(hash(2), 5, 30_000, "execution reverted"),
                pending(hash(3)),
            ],
            ..Default::default()
        };
        let parsed = ParsedTxs::parse(&result, None).unwrap();

        assert_eq!(parsed.len(), 3);
        for (i, tx) in parsed.txs.iter().enumerate() {
            assert_eq!(tx.msg_index, i);
        }
        assert_eq!(parsed.txs[0].eth_tx_index, Some(4));
        assert!(!parsed.txs[0].failed);
        assert!(parsed.txs[1].failed);
        assert_eq!(parsed.txs[2].eth_tx_index, None);

        assert_eq!(parsed.get_tx_by_hash(&hash(2)).map(|tx| tx.msg_index), Some(1));
        assert_eq!(parsed.get_tx_by_tx_index(5).map(|tx| tx.hash), Some(hash(2)));
        assert!(parsed.get_tx_by_tx_index(3).is_none());
        assert!(parsed.get_tx_by_tx_index(7).is_none());
        assert_eq!(parsed.accumulative_gas_used(1), 51_000);
        assert_eq!(parsed.accumulative_gas_used(9), 0);
    }

    #[test]
    fn committed_without_pending_is_fatal() {
        let result = TxExecResult { events: vec![committed(hash(1), 0, 1, "")], ..Default::default() };
        assert!(matches!(
            ParsedTxs::parse(&result, None),
            Err(TranslateError::CommittedWithoutPending)
        ));
    }

    #[test]
    fn second_committed_event_for_same_slot_replaces_again() {
        let result = TxExecResult {
            events: vec![pending(hash(1)), committed(hash(1), 0, 1, ""), committed(hash(1), 0, 2, "")],
            ..Default::default()
        };
        let parsed = ParsedTxs::parse(&result, None).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.txs[0].gas_used, 2);
    }

    #[test]
    fn failed_native_tx_charges_gas_limit() {
        let result = TxExecResult {
            code: 11,
            log: "out of gas in location: block gas meter; gasWanted: 1".into(),
            events: vec![pending(hash(1)), pending(hash(2))],
            ..Default::default()
        };
        let tx = DecodedTx { messages: vec![eth_msg(100), eth_msg(200)] };
        let parsed = ParsedTxs::parse(&result, Some(&tx)).unwrap();
        assert!(parsed.txs.iter().all(|tx| tx.failed));
        assert_eq!(parsed.txs[0].gas_used, 100);
        assert_eq!(parsed.txs[1].gas_used, 200);

        let short = DecodedTx { messages: vec![eth_msg(100)] };
        assert!(matches!(
            ParsedTxs::parse(&result, Some(&short)),
            Err(TranslateError::UnexpectedMessage(1))
        ));
    }

    #[test]
    fn invalid_attributes_are_rejected() {
        let bad_index = AbciEvent::new(
            event_types::ETHEREUM_TX,
            [("eth_hash", hash(1).to_string()), ("index", "-1".into()), ("gas_used", "1".into())],
        );
        let result = TxExecResult { events: vec![pending(hash(1)), bad_index], ..Default::default() };
        assert!(matches!(
            ParsedTxs::parse(&result, None),
            Err(TranslateError::InvalidAttribute { key: "index", .. })
        ));

        let no_hash = AbciEvent::new(event_types::PENDING_ETHEREUM_TX, [("index", "0")]);
        let result = TxExecResult { events: vec![no_hash], ..Default::default() };
        assert!(matches!(
            ParsedTxs::parse(&result, None),
            Err(TranslateError::MissingAttribute { key: "eth_hash", .. })
        ));
    }

    #[test]
    fn pending_event_index_is_kept_without_committed_event() {
        let indexed = |h: B256, index: &str| {
            AbciEvent::new(
                event_types::PENDING_ETHEREUM_TX,
                [("eth_hash", h.to_string()), ("index", index.to_string())],
            )
        };
        let result = TxExecResult {
            code: 11,
            log: "out of gas in location: block gas meter; gasWanted: 1".into(),
            events: vec![indexed(hash(1), "3"), indexed(hash(2), "4")],
            ..Default::default()
        };
        let parsed = ParsedTxs::parse(&result, None).unwrap();
        assert_eq!(parsed.txs[0].eth_tx_index, Some(3));
        assert_eq!(parsed.txs[1].eth_tx_index, Some(4));
        assert_eq!(parsed.get_tx_by_tx_index(4).map(|tx| tx.hash), Some(hash(2)));

        let unassigned = TxExecResult { events: vec![indexed(hash(1), "-1")], ..Default::default() };
        let parsed = ParsedTxs::parse(&unassigned, None).unwrap();
        assert_eq!(parsed.txs[0].eth_tx_index, None);
        assert!(parsed.get_tx_by_tx_index(0).is_none());

        let garbage = TxExecResult { events: vec![indexed(hash(1), "x")], ..Default::default() };
        assert!(matches!(
            ParsedTxs::parse(&garbage, None),
            Err(TranslateError::InvalidAttribute { key: "index", .. })
        ));
    }

    #[test]
    fn indexer_result_from_search_hit() {
        let native = NativeTxResult {
            height: 12,
            index: 3,
            result: TxExecResult {
                events: vec![
                    pending(hash(1)),
                    committed(hash(1), 0, 10, ""),
                    pending(hash(2)),
                    committed(hash(2), 1, 15, ""),
                ],
                ..Default::default()
            },
            ..Default::default()
        };
        let res = parse_tx_indexer_result(&native, None, |txs| txs.get_tx_by_hash(&hash(2))).unwrap();
        assert_eq!(res.height, 12);
        assert_eq!(res.tx_index, 3);
        assert_eq!(res.msg_index, 1);
        assert_eq!(res.eth_tx_index, Some(1));
        assert_eq!(res.cumulative_gas_used, 25);

        let err = parse_tx_indexer_result(&native, None, |txs| txs.get_tx_by_hash(&hash(9))).unwrap_err();
        assert!(matches!(err, TranslateError::MessageNotFound { height: 12, index: 3 }));
    }
}
