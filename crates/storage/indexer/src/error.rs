//! Error types for the indexer.

use thiserror::Error;

/// Errors that can occur during indexing operations.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The block and its results disagree on the number of transactions.
    #[error("block {height} has {txs} txs but {results} results")]
    ResultsMismatch {
        /// Block height.
        height: u64,
        /// Number of transactions.
        txs: usize,
        /// Number of execution results.
        results: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_mismatch_display() {
        let err = IndexerError::ResultsMismatch { height: 5, txs: 2, results: 1 };
        assert_eq!(err.to_string(), "block 5 has 2 txs but 1 results");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IndexerError>();
    }
}
