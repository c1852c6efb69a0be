//! JSON-RPC error types following Ethereum error code conventions.

use evmgate_indexer::IndexerError;
use evmgate_primitives::DecodeError;
use evmgate_pubsub::PubSubError;
use evmgate_translate::TranslateError;
use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;

use crate::ClientError;

/// JSON-RPC error codes following Ethereum conventions.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Resource not found.
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    /// Resource unavailable.
    pub const RESOURCE_UNAVAILABLE: i32 = -32002;
    /// Method not supported.
    pub const METHOD_NOT_SUPPORTED: i32 = -32004;
    /// Request limit exceeded.
    pub const LIMIT_EXCEEDED: i32 = -32005;
}

/// Errors surfaced by the gateway to JSON-RPC and WebSocket clients.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Malformed parameters.
    #[error("{0}")]
    InvalidParams(String),

    /// A request that is well-formed but not acceptable.
    #[error("{0}")]
    InvalidRequest(String),

    /// No live filter has this id.
    #[error("filter {0} not found")]
    FilterNotFound(String),

    /// The filter exists but does not support the operation.
    #[error("filter {id} doesn't have a {expected} type")]
    FilterTypeMismatch {
        /// Filter id.
        id: String,
        /// Type the operation requires.
        expected: &'static str,
    },

    /// A configured resource cap was reached.
    #[error("{0}")]
    LimitExceeded(String),

    /// The block-level index of an Ethereum transaction could not be resolved.
    #[error("can't find index of ethereum tx")]
    TxIndexNotFound,

    /// The operation is not implemented by the gateway.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// The native node failed to answer.
    #[error(transparent)]
    Upstream(#[from] ClientError),

    /// Native events violate the translation invariants.
    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// A native transaction could not be decoded.
    #[error("failed to decode tx: {0}")]
    Decode(#[from] DecodeError),

    /// Event bus bookkeeping failed.
    #[error(transparent)]
    PubSub(#[from] PubSubError),

    /// The local transaction index rejected a block.
    #[error(transparent)]
    Indexer(#[from] IndexerError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// Returns the JSON-RPC error code of this error.
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::InvalidRequest(_) | Self::FilterTypeMismatch { .. } => codes::INVALID_REQUEST,
            Self::FilterNotFound(_) => codes::RESOURCE_NOT_FOUND,
            Self::LimitExceeded(_) => codes::LIMIT_EXCEEDED,
            Self::NotImplemented(_) => codes::METHOD_NOT_SUPPORTED,
            Self::Upstream(_) => codes::RESOURCE_UNAVAILABLE,
            Self::TxIndexNotFound
            | Self::Translate(_)
            | Self::Decode(_)
            | Self::PubSub(_)
            | Self::Indexer(_)
            | Self::Internal(_) => codes::INTERNAL_ERROR,
        }
    }
}

impl From<RpcError> for ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        ErrorObjectOwned::owned(err.code(), err.to_string(), None::<()>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_errors_carry_id() {
        let err = RpcError::FilterNotFound("0xabc".into());
        assert_eq!(err.to_string(), "filter 0xabc not found");
        assert_eq!(err.code(), codes::RESOURCE_NOT_FOUND);

        let err = RpcError::FilterTypeMismatch { id: "0x1".into(), expected: "LogsSubscription" };
        assert_eq!(err.to_string(), "filter 0x1 doesn't have a LogsSubscription type");
        assert_eq!(err.code(), codes::INVALID_REQUEST);
    }

    #[test]
    fn upstream_errors_are_unavailable() {
        let err: RpcError = ClientError::Unavailable("connection refused".into()).into();
        let obj: ErrorObjectOwned = err.into();
        assert_eq!(obj.code(), codes::RESOURCE_UNAVAILABLE);
        assert!(obj.message().contains("connection refused"));
    }

    #[test]
    fn protocol_errors_are_internal() {
        let err: RpcError = TranslateError::CommittedWithoutPending.into();
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
        assert_eq!(RpcError::TxIndexNotFound.to_string(), "can't find index of ethereum tx");
    }

    #[test]
    fn limit_exceeded_code() {
        let obj: ErrorObjectOwned =
            RpcError::LimitExceeded("error creating filter: max limit reached".into()).into();
        assert_eq!(obj.code(), codes::LIMIT_EXCEEDED);
        assert_eq!(obj.message(), "error creating filter: max limit reached");
    }
}
