//! Error types for block and transaction translation.

use thiserror::Error;

/// Errors raised while reconciling native events with Ethereum messages.
///
/// Every variant indicates that the native node emitted events that violate
/// the pending/committed event protocol, so callers treat them as fatal for
/// the transaction being translated.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// A committed Ethereum event was seen without its pending event.
    #[error("EventEthereumTx without EventPendingEthereumTx")]
    CommittedWithoutPending,

    /// A required event attribute is absent.
    #[error("event {event} is missing attribute {key}")]
    MissingAttribute {
        /// Event type.
        event: &'static str,
        /// Attribute key.
        key: &'static str,
    },

    /// An event attribute could not be parsed.
    #[error("invalid {key} attribute: {value}")]
    InvalidAttribute {
        /// Attribute key.
        key: &'static str,
        /// Raw attribute value.
        value: String,
    },

    /// A block and its results disagree on the number of transactions.
    #[error("block {height} has {txs} txs but {results} results")]
    ResultsMismatch {
        /// Block height.
        height: u64,
        /// Number of transactions in the block.
        txs: usize,
        /// Number of execution results.
        results: usize,
    },

    /// A native transaction message at this position is not an Ethereum message.
    #[error("unexpected message type at index {0}")]
    UnexpectedMessage(usize),

    /// The parsed events do not contain the requested Ethereum message.
    #[error("ethereum tx not found in msgs: block {height}, index {index}")]
    MessageNotFound {
        /// Block height.
        height: u64,
        /// Native transaction index.
        index: u32,
    },

    /// No log event exists for the requested Ethereum message.
    #[error("eth tx logs not found for message index {0}")]
    LogsNotFound(usize),

    /// A transaction log attribute is not valid JSON.
    #[error("invalid tx log: {0}")]
    InvalidLog(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_without_pending_display() {
        assert_eq!(
            TranslateError::CommittedWithoutPending.to_string(),
            "EventEthereumTx without EventPendingEthereumTx"
        );
    }

    #[test]
    fn message_not_found_display() {
        let err = TranslateError::MessageNotFound { height: 7, index: 2 };
        assert_eq!(err.to_string(), "ethereum tx not found in msgs: block 7, index 2");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TranslateError>();
    }
}
