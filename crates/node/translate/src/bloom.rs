//! Block bloom extraction and bloom pre-filtering.

use alloy_primitives::{Address, B256, BLOOM_SIZE_BYTES, Bloom, BloomInput, hex};
use evmgate_primitives::{AbciEvent, event_types};

use crate::RpcLog;

/// Returns the block bloom carried by the end-of-block events, if present.
pub fn block_bloom(end_block_events: &[AbciEvent]) -> Option<Bloom> {
    let value = end_block_events
        .iter()
        .filter(|event| event.is(event_types::BLOCK_BLOOM))
        .find_map(|event| event.attribute(event_types::ATTR_BLOOM))?;
    let bytes = hex::decode(value.replace('"', "")).ok()?;
    (bytes.len() == BLOOM_SIZE_BYTES).then(|| Bloom::from_slice(&bytes))
}

/// Builds the bloom of a set of logs.
pub fn logs_bloom<'a>(logs: impl IntoIterator<Item = &'a RpcLog>) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_slice()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_slice()));
        }
    }
    bloom
}

/// Returns false if the bloom proves that no log can match the criteria.
///
/// At least one address must be present when addresses are given, and every
/// non-empty topic position must have at least one present topic.
pub fn bloom_filter(bloom: &Bloom, addresses: &[Address], topics: &[Vec<B256>]) -> bool {
    if !addresses.is_empty()
        && !addresses.iter().any(|addr| bloom.contains_input(BloomInput::Raw(addr.as_slice())))
    {
        return false;
    }

    topics.iter().all(|position| {
        position.is_empty()
            || position.iter().any(|topic| bloom.contains_input(BloomInput::Raw(topic.as_slice())))
    })
}
