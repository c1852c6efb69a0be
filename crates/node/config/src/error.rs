//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur when loading or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to parse JSON configuration.
    #[error("failed to parse JSON config: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A listen address is not a valid socket address.
    #[error("invalid {field} address {value:?}")]
    InvalidAddress {
        /// Config field holding the address.
        field: &'static str,
        /// Configured value.
        value: String,
    },

    /// A limit that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

#[cfg(test)]
mod tests {
    use std::io::{Error as IoError, ErrorKind};

    use super::*;

    #[test]
    fn test_read_error_display() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/evmgate/config.toml"),
            source: IoError::new(ErrorKind::NotFound, "file not found"),
        };
        let display = err.to_string();
        assert!(display.contains("failed to read config file"));
        assert!(display.contains("/etc/evmgate/config.toml"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_invalid_address_display() {
        let err = ConfigError::InvalidAddress { field: "json_rpc.address", value: "nope".into() };
        assert_eq!(err.to_string(), "invalid json_rpc.address address \"nope\"");
    }

    #[test]
    fn test_toml_parse_error_from() {
        let result: Result<toml::Value, _> = toml::from_str("invalid = [unclosed");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(config_err.to_string().contains("failed to parse TOML config"));
    }

    #[test]
    fn test_json_parse_error_from() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{invalid}");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(config_err.to_string().contains("failed to parse JSON config"));
    }

    #[test]
    fn test_config_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfigError>();
    }
}
