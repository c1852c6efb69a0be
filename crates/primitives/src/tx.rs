//! Native transaction envelope and the Ethereum messages it may carry.

use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Ethereum transaction type discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxType {
    /// Pre-EIP-2718 transaction.
    Legacy = 0,
    /// EIP-2930 access-list transaction.
    AccessList = 1,
    /// EIP-1559 dynamic-fee transaction.
    DynamicFee = 2,
}

impl TxType {
    /// Returns the numeric type byte.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Legacy transaction payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTx {
    /// Replay-protection chain id, if EIP-155 signed.
    pub chain_id: Option<u64>,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price.
    pub gas_price: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Value transferred.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
    /// Signature `v`.
    pub v: U256,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// EIP-2930 transaction payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListTx {
    /// Chain id.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price.
    pub gas_price: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Value transferred.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
    /// Pre-declared storage accesses.
    pub access_list: AccessList,
    /// Signature `v`.
    pub v: U256,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// EIP-1559 transaction payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicFeeTx {
    /// Chain id.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Max priority fee per gas.
    pub gas_tip_cap: U256,
    /// Max fee per gas.
    pub gas_fee_cap: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Value transferred.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
    /// Pre-declared storage accesses.
    pub access_list: AccessList,
    /// Signature `v`.
    pub v: U256,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// Closed set of Ethereum transaction payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TxData {
    /// Legacy transaction.
    Legacy(LegacyTx),
    /// Access-list transaction.
    AccessList(AccessListTx),
    /// Dynamic-fee transaction.
    DynamicFee(DynamicFeeTx),
}

/// An Ethereum transaction wrapped as a native message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEthereumTx {
    /// Ethereum transaction hash.
    pub hash: B256,
    /// Recovered sender.
    pub from: Address,
    /// Transaction payload.
    pub data: TxData,
}

impl MsgEthereumTx {
    /// Returns the transaction type.
    pub const fn tx_type(&self) -> TxType {
        match self.data {
            TxData::Legacy(_) => TxType::Legacy,
            TxData::AccessList(_) => TxType::AccessList,
            TxData::DynamicFee(_) => TxType::DynamicFee,
        }
    }

    /// Returns the gas limit.
    pub const fn gas(&self) -> u64 {
        match &self.data {
            TxData::Legacy(tx) => tx.gas_limit,
            TxData::AccessList(tx) => tx.gas_limit,
            TxData::DynamicFee(tx) => tx.gas_limit,
        }
    }

    /// Returns the recipient, `None` for contract creation.
    pub const fn to(&self) -> Option<Address> {
        match &self.data {
            TxData::Legacy(tx) => tx.to,
            TxData::AccessList(tx) => tx.to,
            TxData::DynamicFee(tx) => tx.to,
        }
    }

    /// Returns the sender nonce.
    pub const fn nonce(&self) -> u64 {
        match &self.data {
            TxData::Legacy(tx) => tx.nonce,
            TxData::AccessList(tx) => tx.nonce,
            TxData::DynamicFee(tx) => tx.nonce,
        }
    }

    /// Returns the value transferred.
    pub const fn value(&self) -> U256 {
        match &self.data {
            TxData::Legacy(tx) => tx.value,
            TxData::AccessList(tx) => tx.value,
            TxData::DynamicFee(tx) => tx.value,
        }
    }

    /// Returns the call data.
    pub const fn input(&self) -> &Bytes {
        match &self.data {
            TxData::Legacy(tx) => &tx.input,
            TxData::AccessList(tx) => &tx.input,
            TxData::DynamicFee(tx) => &tx.input,
        }
    }

    /// Returns the chain id, if the payload carries one.
    pub const fn chain_id(&self) -> Option<u64> {
        match &self.data {
            TxData::Legacy(tx) => tx.chain_id,
            TxData::AccessList(tx) => Some(tx.chain_id),
            TxData::DynamicFee(tx) => Some(tx.chain_id),
        }
    }

    /// Returns the access list for typed transactions.
    pub const fn access_list(&self) -> Option<&AccessList> {
        match &self.data {
            TxData::Legacy(_) => None,
            TxData::AccessList(tx) => Some(&tx.access_list),
            TxData::DynamicFee(tx) => Some(&tx.access_list),
        }
    }

    /// Returns the signature `(v, r, s)`.
    pub const fn signature(&self) -> (U256, U256, U256) {
        match &self.data {
            TxData::Legacy(tx) => (tx.v, tx.r, tx.s),
            TxData::AccessList(tx) => (tx.v, tx.r, tx.s),
            TxData::DynamicFee(tx) => (tx.v, tx.r, tx.s),
        }
    }

    /// Returns the fee cap: gas price for legacy and access-list payloads.
    pub const fn gas_fee_cap(&self) -> U256 {
        match &self.data {
            TxData::Legacy(tx) => tx.gas_price,
            TxData::AccessList(tx) => tx.gas_price,
            TxData::DynamicFee(tx) => tx.gas_fee_cap,
        }
    }

    /// Returns the price actually paid per unit of gas.
    ///
    /// Dynamic-fee transactions pay `min(tip + base_fee, fee_cap)` when a base
    /// fee is known and the fee cap otherwise.
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match (&self.data, base_fee) {
            (TxData::DynamicFee(tx), Some(base_fee)) => {
                tx.gas_tip_cap.saturating_add(base_fee).min(tx.gas_fee_cap)
            }
            _ => self.gas_fee_cap(),
        }
    }
}

/// One message of a decoded native transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMessage {
    /// An Ethereum transaction.
    Ethereum(MsgEthereumTx),
    /// Any other native message.
    Other {
        /// Protobuf type URL of the message.
        type_url: String,
    },
}

impl TxMessage {
    /// Returns the Ethereum message, if this is one.
    pub const fn as_ethereum(&self) -> Option<&MsgEthereumTx> {
        match self {
            Self::Ethereum(msg) => Some(msg),
            Self::Other { .. } => None,
        }
    }
}

/// A decoded native transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedTx {
    /// Messages in order.
    pub messages: Vec<TxMessage>,
}

impl DecodedTx {
    /// Returns true when the transaction is non-empty and carries only Ethereum messages.
    pub fn is_ethereum(&self) -> bool {
        !self.messages.is_empty() && self.messages.iter().all(|msg| msg.as_ethereum().is_some())
    }

    /// Returns the Ethereum messages in order, skipping other messages.
    pub fn ethereum_messages(&self) -> impl Iterator<Item = &MsgEthereumTx> {
        self.messages.iter().filter_map(TxMessage::as_ethereum)
    }

    /// Returns the Ethereum message at position `index`, if present.
    pub fn ethereum_message(&self, index: usize) -> Option<&MsgEthereumTx> {
        self.messages.get(index).and_then(TxMessage::as_ethereum)
    }
}

/// Failure to decode raw native transaction bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input was empty.
    #[error("empty transaction bytes")]
    Empty,
    /// The input was not a valid transaction encoding.
    #[error("invalid transaction encoding: {0}")]
    Invalid(String),
}

/// Decodes opaque native transaction bytes into messages.
pub trait TxDecoder: Send + Sync {
    /// Decodes one raw transaction.
    fn decode_tx(&self, raw: &[u8]) -> Result<DecodedTx, DecodeError>;
}

/// JSON transaction codec used by the in-process development node.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTxCodec;

impl JsonTxCodec {
    /// Encodes a transaction the way [`JsonTxCodec::decode_tx`] reads it.
    pub fn encode(tx: &DecodedTx) -> Bytes {
        serde_json::to_vec(tx).map(Bytes::from).unwrap_or_default()
    }
}

impl TxDecoder for JsonTxCodec {
    fn decode_tx(&self, raw: &[u8]) -> Result<DecodedTx, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        serde_json::from_slice(raw).map_err(|err| DecodeError::Invalid(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(tip: u64, cap: u64) -> MsgEthereumTx {
        MsgEthereumTx {
            hash: B256::repeat_byte(1),
            from: Address::repeat_byte(2),
            data: TxData::DynamicFee(DynamicFeeTx {
                chain_id: 9000,
                gas_tip_cap: U256::from(tip),
                gas_fee_cap: U256::from(cap),
                gas_limit: 21_000,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn effective_gas_price_caps_at_fee_cap() {
        let tx = dynamic(2, 10);
        assert_eq!(tx.effective_gas_price(Some(U256::from(5))), U256::from(7));
        assert_eq!(tx.effective_gas_price(Some(U256::from(50))), U256::from(10));
        assert_eq!(tx.effective_gas_price(None), U256::from(10));
    }

    #[test]
    fn legacy_accessors() {
        let tx = MsgEthereumTx {
            hash: B256::ZERO,
            from: Address::ZERO,
            data: TxData::Legacy(LegacyTx {
                nonce: 3,
                gas_price: U256::from(4),
                gas_limit: 50_000,
                ..Default::default()
            }),
        };
        assert_eq!(tx.tx_type().as_u8(), 0);
        assert_eq!(tx.gas(), 50_000);
        assert_eq!(tx.nonce(), 3);
        assert!(tx.to().is_none());
        assert!(tx.access_list().is_none());
        assert_eq!(tx.effective_gas_price(Some(U256::from(100))), U256::from(4));
    }

    #[test]
    fn is_ethereum_requires_only_eth_messages() {
        let eth = TxMessage::Ethereum(dynamic(1, 1));
        let other = TxMessage::Other { type_url: "/cosmos.bank.v1beta1.MsgSend".into() };

        assert!(!DecodedTx::default().is_ethereum());
        assert!(DecodedTx { messages: vec![eth.clone()] }.is_ethereum());
        let mixed = DecodedTx { messages: vec![eth, other] };
        assert!(!mixed.is_ethereum());
        assert_eq!(mixed.ethereum_messages().count(), 1);
        assert!(mixed.ethereum_message(1).is_none());
    }

    #[test]
    fn json_codec_decodes_encoded() {
        let tx = DecodedTx { messages: vec![TxMessage::Ethereum(dynamic(1, 2))] };
        let raw = JsonTxCodec::encode(&tx);
        assert_eq!(JsonTxCodec.decode_tx(&raw).unwrap(), tx);
        assert!(matches!(JsonTxCodec.decode_tx(&[]), Err(DecodeError::Empty)));
        assert!(matches!(JsonTxCodec.decode_tx(b"nope"), Err(DecodeError::Invalid(_))));
    }
}
