//! Exact log matching against address and topic criteria.

use alloy_primitives::{Address, B256, Bloom};

use crate::{RpcLog, bloom_filter};

/// Criteria for matching logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Start block (inclusive).
    pub from_block: Option<u64>,
    /// End block (inclusive).
    pub to_block: Option<u64>,
    /// Contract addresses (OR logic), empty matches any.
    pub addresses: Vec<Address>,
    /// Topics per position. OR logic within a position, AND logic across
    /// positions; an empty position is a wildcard.
    pub topics: Vec<Vec<B256>>,
}

impl LogFilter {
    /// Creates a new empty log filter.
    pub const fn new() -> Self {
        Self { from_block: None, to_block: None, addresses: Vec::new(), topics: Vec::new() }
    }

    /// Sets the start block.
    pub const fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    /// Sets the end block.
    pub const fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    /// Sets the address filter.
    pub fn address(mut self, addresses: Vec<Address>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Sets the topic list at `index`, padding earlier positions with wildcards.
    pub fn topic(mut self, index: usize, topics: Vec<B256>) -> Self {
        if self.topics.len() <= index {
            self.topics.resize(index + 1, Vec::new());
        }
        self.topics[index] = topics;
        self
    }

    /// Returns true if `log` satisfies every criterion.
    pub fn matches(&self, log: &RpcLog) -> bool {
        let number = log.block_number.to::<u64>();
        if self.from_block.is_some_and(|from| from > number) {
            return false;
        }
        if self.to_block.is_some_and(|to| to < number) {
            return false;
        }
        if !self.addresses.is_empty() && !self.addresses.contains(&log.address) {
            return false;
        }
        if self.topics.len() > log.topics.len() {
            return false;
        }
        self.topics
            .iter()
            .zip(&log.topics)
            .all(|(wanted, topic)| wanted.is_empty() || wanted.contains(topic))
    }

    /// Returns false if `bloom` proves no log of its block can match.
    pub fn bloom_matches(&self, bloom: &Bloom) -> bool {
        bloom_filter(bloom, &self.addresses, &self.topics)
    }
}

/// Returns the logs that satisfy `filter`, preserving order.
pub fn filter_logs<'a>(logs: impl IntoIterator<Item = &'a RpcLog>, filter: &LogFilter) -> Vec<RpcLog> {
    logs.into_iter().filter(|log| filter.matches(log)).cloned().collect()
}
