//! JSON-RPC configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default HTTP JSON-RPC address.
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8545";

/// Default WebSocket address.
pub const DEFAULT_WS_ADDR: &str = "127.0.0.1:8546";

/// Default maximum number of live polling filters.
pub const DEFAULT_FILTER_CAP: usize = 200;

/// Default maximum number of logs returned by one query.
pub const DEFAULT_LOGS_CAP: usize = 10_000;

/// Default maximum block span of one log query.
pub const DEFAULT_BLOCK_RANGE_CAP: u64 = 10_000;

/// Default inactivity timeout of a polling filter.
pub const DEFAULT_FILTER_TIMEOUT_SECS: u64 = 300;

/// Default maximum number of concurrent server connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 100;

/// JSON-RPC server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcConfig {
    /// HTTP JSON-RPC listen address, also the WebSocket proxy target.
    #[serde(default = "default_http_addr")]
    pub address: String,

    /// WebSocket listen address.
    #[serde(default = "default_ws_addr")]
    pub ws_address: String,

    /// Maximum number of live polling filters.
    #[serde(default = "default_filter_cap")]
    pub filter_cap: usize,

    /// Maximum number of logs returned by one query.
    #[serde(default = "default_logs_cap")]
    pub logs_cap: usize,

    /// Maximum block span of one log query.
    #[serde(default = "default_block_range_cap")]
    pub block_range_cap: u64,

    /// Seconds a polling filter may go unpolled before it is removed.
    #[serde(default = "default_filter_timeout_secs")]
    pub filter_timeout_secs: u64,

    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Index blocks locally instead of searching the upstream node.
    #[serde(default)]
    pub enable_indexer: bool,

    /// Allowed CORS origins, any origin when empty.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for JsonRpcConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_HTTP_ADDR.to_string(),
            ws_address: DEFAULT_WS_ADDR.to_string(),
            filter_cap: DEFAULT_FILTER_CAP,
            logs_cap: DEFAULT_LOGS_CAP,
            block_range_cap: DEFAULT_BLOCK_RANGE_CAP,
            filter_timeout_secs: DEFAULT_FILTER_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            enable_indexer: false,
            cors_origins: Vec::new(),
        }
    }
}

impl JsonRpcConfig {
    /// Parses the HTTP listen address.
    pub fn http_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("json_rpc.address", &self.address)
    }

    /// Parses the WebSocket listen address.
    pub fn ws_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("json_rpc.ws_address", &self.ws_address)
    }

    /// Checks that addresses parse and limits are positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http_socket_addr()?;
        self.ws_socket_addr()?;
        if self.filter_cap == 0 {
            return Err(ConfigError::ZeroLimit("json_rpc.filter_cap"));
        }
        if self.logs_cap == 0 {
            return Err(ConfigError::ZeroLimit("json_rpc.logs_cap"));
        }
        if self.block_range_cap == 0 {
            return Err(ConfigError::ZeroLimit("json_rpc.block_range_cap"));
        }
        if self.filter_timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit("json_rpc.filter_timeout_secs"));
        }
        Ok(())
    }
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAddress { field, value: value.to_string() })
}

fn default_http_addr() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

fn default_ws_addr() -> String {
    DEFAULT_WS_ADDR.to_string()
}

const fn default_filter_cap() -> usize {
    DEFAULT_FILTER_CAP
}

const fn default_logs_cap() -> usize {
    DEFAULT_LOGS_CAP
}

const fn default_block_range_cap() -> u64 {
    DEFAULT_BLOCK_RANGE_CAP
}

const fn default_filter_timeout_secs() -> u64 {
    DEFAULT_FILTER_TIMEOUT_SECS
}

const fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_json_rpc_config() {
        let config = JsonRpcConfig::default();
        assert_eq!(config.address, DEFAULT_HTTP_ADDR);
        assert_eq!(config.ws_address, DEFAULT_WS_ADDR);
        assert_eq!(config.filter_cap, 200);
        assert_eq!(config.logs_cap, 10_000);
        assert_eq!(config.block_range_cap, 10_000);
        assert_eq!(config.filter_timeout_secs, 300);
        assert!(!config.enable_indexer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_rpc_config_partial_defaults() {
        let config: JsonRpcConfig =
            serde_json::from_str(r#"{"address": "0.0.0.0:9545", "logs_cap": 5}"#).expect("deserialize");
        assert_eq!(config.address, "0.0.0.0:9545");
        assert_eq!(config.logs_cap, 5);
        assert_eq!(config.ws_address, DEFAULT_WS_ADDR);
        assert_eq!(config.filter_cap, DEFAULT_FILTER_CAP);
    }

    #[test]
    fn test_json_rpc_config_toml_roundtrip() {
        let config = JsonRpcConfig {
            enable_indexer: true,
            cors_origins: vec!["http://localhost:3000".to_string()],
            ..Default::default()
        };
        let serialized = toml::to_string(&config).expect("serialize toml");
        let deserialized: JsonRpcConfig = toml::from_str(&serialized).expect("deserialize toml");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_socket_addrs() {
        let config = JsonRpcConfig::default();
        assert_eq!(config.http_socket_addr().unwrap().port(), 8545);
        assert_eq!(config.ws_socket_addr().unwrap().port(), 8546);

        let bad = JsonRpcConfig { ws_address: "localhost".to_string(), ..Default::default() };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidAddress { field: "json_rpc.ws_address", .. })
        ));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = JsonRpcConfig { filter_cap: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLimit("json_rpc.filter_cap"))));

        let config = JsonRpcConfig { block_range_cap: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLimit("json_rpc.block_range_cap"))));
    }
}
