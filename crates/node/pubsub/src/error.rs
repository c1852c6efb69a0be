//! Event bus errors.

/// Errors returned by [`crate::EventBus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PubSubError {
    /// A topic with this name is already registered.
    #[error("topic {0} already registered")]
    TopicExists(String),
    /// No topic with this name is registered.
    #[error("topic not found: {0}")]
    TopicNotFound(String),
}
