//! Request and response types of the block, filter and subscription APIs.

use std::fmt;

use alloy_primitives::{Address, B256, U64, hex};
use evmgate_translate::{LogFilter, RpcLog};
use serde::{Deserialize, Serialize};

/// Block number or tag for RPC queries.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BlockNumberOrTag {
    /// Block number.
    Number(U64),
    /// Block tag.
    Tag(BlockTag),
    /// Default to latest.
    #[default]
    #[serde(skip)]
    Latest,
}

/// Block tags for RPC queries.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    /// Earliest block (genesis).
    Earliest,
    /// Finalized block.
    Finalized,
    /// Safe block.
    Safe,
    /// Latest block.
    #[default]
    Latest,
    /// Pending block.
    Pending,
}

impl BlockNumberOrTag {
    /// Returns true if this is a pending block reference.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Tag(BlockTag::Pending))
    }

    /// Returns true if this is the latest block reference.
    pub const fn is_latest(&self) -> bool {
        matches!(self, Self::Tag(BlockTag::Latest) | Self::Latest)
    }

    /// Returns the explicit height, or `None` for tags that follow the chain head.
    ///
    /// A native node finalizes every committed block, so `safe`, `finalized`
    /// and `pending` all track the latest height.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(number) => Some(number.to::<u64>()),
            Self::Tag(BlockTag::Earliest) => Some(0),
            Self::Tag(_) | Self::Latest => None,
        }
    }

    /// Resolves the reference against the current head.
    pub fn resolve(&self, latest: u64) -> u64 {
        self.as_number().unwrap_or(latest)
    }
}

impl From<u64> for BlockNumberOrTag {
    fn from(number: u64) -> Self {
        Self::Number(U64::from(number))
    }
}

/// A single value or a list of values.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ValueOrArray<T> {
    /// A single value.
    Value(T),
    /// A list of values.
    Array(Vec<T>),
}

impl<T: Clone> ValueOrArray<T> {
    /// Returns the values as a list.
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::Value(value) => vec![value.clone()],
            Self::Array(values) => values.clone(),
        }
    }
}

/// Log filter criteria of `eth_newFilter`, `eth_getLogs` and `logs` subscriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Restricts the query to a single block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    /// First block of the range, latest when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockNumberOrTag>,
    /// Last block of the range, latest when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockNumberOrTag>,
    /// Contract address or addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<ValueOrArray<Address>>,
    /// Topic positions, `null` entries are wildcards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Option<ValueOrArray<B256>>>>,
}

impl FilterCriteria {
    /// Returns the requested addresses, empty for any address.
    pub fn addresses(&self) -> Vec<Address> {
        self.address.as_ref().map(ValueOrArray::to_vec).unwrap_or_default()
    }

    /// Returns the topic sets per position, empty sets being wildcards.
    pub fn topic_sets(&self) -> Vec<Vec<B256>> {
        self.topics
            .iter()
            .flatten()
            .map(|position| position.as_ref().map(ValueOrArray::to_vec).unwrap_or_default())
            .collect()
    }

    /// Explicit starting height, `None` when following the head.
    pub fn from_height(&self) -> Option<u64> {
        self.from_block.as_ref().and_then(BlockNumberOrTag::as_number)
    }

    /// Explicit ending height, `None` when following the head.
    pub fn to_height(&self) -> Option<u64> {
        self.to_block.as_ref().and_then(BlockNumberOrTag::as_number)
    }

    /// Builds the exact matcher, bounded by the explicit heights only.
    pub fn log_filter(&self) -> LogFilter {
        LogFilter {
            from_block: self.from_height(),
            to_block: self.to_height(),
            addresses: self.addresses(),
            topics: self.topic_sets(),
        }
    }
}

/// Kind of a polling filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Logs matching criteria.
    Logs,
    /// Hashes of new blocks.
    Blocks,
    /// Hashes of new Ethereum transactions.
    PendingTransactions,
}

impl FilterKind {
    /// Returns the name used in error messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Logs => "LogsSubscription",
            Self::Blocks => "BlocksSubscription",
            Self::PendingTransactions => "PendingTransactionsSubscription",
        }
    }
}

/// Result of `eth_getFilterChanges`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterChanges {
    /// Block or transaction hashes.
    Hashes(Vec<B256>),
    /// Matched logs.
    Logs(Vec<RpcLog>),
}

impl FilterChanges {
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Hashes(hashes) => hashes.len(),
            Self::Logs(logs) => logs.len(),
        }
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identifier of a filter or WebSocket subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Generates a fresh random id.
    pub fn random() -> Self {
        Self(hex::encode_prefixed(rand::random::<[u8; 16]>()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_tags_resolve_to_head() {
        let latest: BlockNumberOrTag = serde_json::from_str(r#""latest""#).unwrap();
        assert!(latest.is_latest());
        assert_eq!(latest.resolve(42), 42);

        let pending: BlockNumberOrTag = serde_json::from_str(r#""pending""#).unwrap();
        assert!(pending.is_pending());
        assert_eq!(pending.as_number(), None);

        let earliest: BlockNumberOrTag = serde_json::from_str(r#""earliest""#).unwrap();
        assert_eq!(earliest.resolve(42), 0);

        let number: BlockNumberOrTag = serde_json::from_str(r#""0x10""#).unwrap();
        assert_eq!(number.resolve(42), 16);
    }

    #[test]
    fn criteria_accepts_single_and_many_addresses() {
        let single: FilterCriteria = serde_json::from_str(
            r#"{"address": "0x1111111111111111111111111111111111111111"}"#,
        )
        .unwrap();
        assert_eq!(single.addresses(), vec![Address::repeat_byte(0x11)]);

        let many: FilterCriteria = serde_json::from_str(
            r#"{"address": ["0x1111111111111111111111111111111111111111", "0x2222222222222222222222222222222222222222"]}"#,
        )
        .unwrap();
        assert_eq!(many.addresses().len(), 2);
        assert!(FilterCriteria::default().addresses().is_empty());
    }

    #[test]
    fn criteria_topics_with_wildcards() {
        let t1 = B256::repeat_byte(1);
        let t2 = B256::repeat_byte(2);
        let json = format!(r#"{{"fromBlock": "0xa", "toBlock": "latest", "topics": [null, "{t1}", ["{t1}", "{t2}"]]}}"#);
        let criteria: FilterCriteria = serde_json::from_str(&json).unwrap();

        assert_eq!(criteria.topic_sets(), vec![vec![], vec![t1], vec![t1, t2]]);
        assert_eq!(criteria.from_height(), Some(10));
        assert_eq!(criteria.to_height(), None);

        let filter = criteria.log_filter();
        assert_eq!(filter.from_block, Some(10));
        assert_eq!(filter.to_block, None);
        assert_eq!(filter.topics.len(), 3);
    }

    #[test]
    fn block_hash_criteria() {
        let hash = B256::repeat_byte(0xab);
        let criteria: FilterCriteria =
            serde_json::from_str(&format!(r#"{{"blockHash": "{hash}"}}"#)).unwrap();
        assert_eq!(criteria.block_hash, Some(hash));
        assert!(criteria.topics.is_none());
    }

    #[test]
    fn filter_changes_serialize_as_arrays() {
        let hashes = FilterChanges::Hashes(vec![B256::ZERO]);
        let json = serde_json::to_value(&hashes).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 1);

        let empty = FilterChanges::Logs(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(serde_json::to_string(&empty).unwrap(), "[]");
    }

    #[test]
    fn subscription_ids_are_unique_hex() {
        let a = SubscriptionId::random();
        let b = SubscriptionId::random();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("0x"));
        assert_eq!(a.as_str().len(), 34);
        assert_eq!(serde_json::to_string(&a).unwrap(), format!("\"{a}\""));
    }
}
