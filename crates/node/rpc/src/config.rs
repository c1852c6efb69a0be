//! RPC server configuration.

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use evmgate_config::{ConfigError, DEFAULT_MAX_CONNECTIONS, GatewayConfig};

use crate::{BackendConfig, FiltersConfig};

/// Runtime configuration of the JSON-RPC and WebSocket servers.
#[derive(Clone, Debug)]
pub struct RpcServerConfig {
    /// Address of the HTTP JSON-RPC server.
    pub http_addr: SocketAddr,
    /// Address of the WebSocket server.
    pub ws_addr: SocketAddr,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Maximum number of concurrent connections.
    pub max_connections: u32,
    /// Chain identity and scan limits.
    pub backend: BackendConfig,
    /// Filter registry limits.
    pub filters: FiltersConfig,
    /// Whether transactions are looked up in a local index.
    pub enable_indexer: bool,
}

impl RpcServerConfig {
    /// Create a configuration listening on `http_addr` and `ws_addr` with default limits.
    pub fn new(http_addr: SocketAddr, ws_addr: SocketAddr) -> Self {
        Self {
            http_addr,
            ws_addr,
            cors: CorsConfig::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            backend: BackendConfig::default(),
            filters: FiltersConfig::default(),
            enable_indexer: false,
        }
    }

    /// Builds the runtime configuration from a loaded gateway configuration.
    pub fn from_gateway(config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.json_rpc.validate()?;
        let rpc = &config.json_rpc;
        Ok(Self {
            http_addr: rpc.http_socket_addr()?,
            ws_addr: rpc.ws_socket_addr()?,
            cors: CorsConfig { allowed_origins: rpc.cors_origins.clone(), ..CorsConfig::default() },
            max_connections: rpc.max_connections,
            backend: BackendConfig {
                chain_id: config.chain.chain_id,
                logs_cap: rpc.logs_cap,
                block_range_cap: rpc.block_range_cap,
            },
            filters: FiltersConfig {
                filter_cap: rpc.filter_cap,
                filter_timeout: Duration::from_secs(rpc.filter_timeout_secs),
            },
            enable_indexer: rpc.enable_indexer,
        })
    }

    /// Set CORS allowed origins.
    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors.allowed_origins = origins;
        self
    }

    /// Set maximum connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the filter cap.
    #[must_use]
    pub const fn with_filter_cap(mut self, filter_cap: usize) -> Self {
        self.filters.filter_cap = filter_cap;
        self
    }
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self::new(
            SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8545).into(),
            SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8546).into(),
        )
    }
}

/// CORS configuration for the RPC server.
#[derive(Clone, Debug)]
pub struct CorsConfig {
    /// Allowed origins. Empty means no CORS headers are sent.
    /// Use `["*"]` to allow all origins.
    pub allowed_origins: Vec<String>,
    /// Allowed methods.
    pub allowed_methods: Vec<String>,
    /// Allowed headers.
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache (seconds).
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string()],
            max_age: 3600,
        }
    }
}

impl CorsConfig {
    /// Create a permissive CORS config for development.
    pub fn permissive() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["*".to_string()],
            allowed_headers: vec!["*".to_string()],
            max_age: 86400,
        }
    }
}
