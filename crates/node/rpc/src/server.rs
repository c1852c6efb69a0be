//! JSON-RPC and WebSocket server bootstrap.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use evmgate_indexer::EvmTxIndexer;
use evmgate_primitives::NativeEvent;
use jsonrpsee::server::{Server, ServerHandle};
use tokio::{sync::mpsc, task::JoinHandle};
use tower::limit::ConcurrencyLimitLayer;
use tower_04::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};

use crate::{
    Backend, EventSource, EventSubscriber, FiltersApi, IndexerService, NativeClient, WsGateway,
    config::{CorsConfig, RpcServerConfig},
    eth::{EthApiImpl, EthApiServer, NetApiImpl, NetApiServer, Web3ApiImpl, Web3ApiServer},
};

/// Error type for RPC server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind server.
    #[error("failed to bind server: {0}")]
    Bind(std::io::Error),
    /// Failed to register RPC methods.
    #[error("failed to register RPC methods: {0}")]
    RegisterMethod(#[from] jsonrpsee::core::RegisterMethodError),
}

/// Build a CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::new();
    }

    let mut layer = CorsLayer::new();

    if config.allowed_origins.iter().any(|o| o == "*") {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<_> =
            config.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }

    if config.allowed_methods.iter().any(|m| m == "*") {
        layer = layer.allow_methods(Any);
    } else {
        let methods: Vec<_> =
            config.allowed_methods.iter().filter_map(|m| m.parse().ok()).collect();
        layer = layer.allow_methods(methods);
    }

    if config.allowed_headers.iter().any(|h| h == "*") {
        layer = layer.allow_headers(Any);
    } else {
        let headers: Vec<_> =
            config.allowed_headers.iter().filter_map(|h| h.parse().ok()).collect();
        layer = layer.allow_headers(headers);
    }

    layer.max_age(Duration::from_secs(config.max_age))
}

/// Ethereum gateway server: HTTP JSON-RPC plus WebSocket subscriptions.
pub struct RpcServer {
    config: RpcServerConfig,
    client: Arc<dyn NativeClient>,
    source: Arc<dyn EventSource>,
    events: mpsc::Receiver<NativeEvent>,
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer").field("config", &self.config).finish_non_exhaustive()
    }
}

impl RpcServer {
    /// Create a server over a native node and its event stream.
    pub fn new(
        config: RpcServerConfig,
        client: Arc<dyn NativeClient>,
        source: Arc<dyn EventSource>,
        events: mpsc::Receiver<NativeEvent>,
    ) -> Self {
        Self { config, client, source, events }
    }

    /// Start the servers.
    ///
    /// Binds both listeners, spawns the serving tasks and returns once they
    /// accept connections.
    pub async fn start(self) -> Result<RpcServerHandle, ServerError> {
        let Self { config, client, source, events } = self;

        let mut backend = Backend::new(Arc::clone(&client), config.backend);
        let mut indexer_task = None;
        if config.enable_indexer {
            let indexer = Arc::new(EvmTxIndexer::new(client.tx_decoder()));
            indexer_task = Some(IndexerService::new(Arc::clone(&client), Arc::clone(&indexer)).spawn());
            backend = backend.with_indexer(indexer);
        }
        let backend = Arc::new(backend);
        let subscriber = Arc::new(EventSubscriber::new(source, events));
        let filters = Arc::new(FiltersApi::new(Arc::clone(&backend), Arc::clone(&subscriber), config.filters));

        let server = Server::builder()
            .set_http_middleware(ServiceBuilder::new().layer(build_cors_layer(&config.cors)))
            .max_connections(config.max_connections)
            .build(config.http_addr)
            .await
            .map_err(ServerError::Bind)?;
        let http_addr = server.local_addr().map_err(ServerError::Bind)?;

        let mut module = jsonrpsee::RpcModule::new(());
        module.merge(EthApiImpl::new(Arc::clone(&filters)).into_rpc())?;
        module.merge(NetApiImpl::new(config.backend.chain_id).into_rpc())?;
        module.merge(Web3ApiImpl::new().into_rpc())?;

        info!(addr = %http_addr, "Starting JSON-RPC server");
        let rpc = server.start(module);

        let listener = tokio::net::TcpListener::bind(config.ws_addr).await.map_err(ServerError::Bind)?;
        let ws_addr = listener.local_addr().map_err(ServerError::Bind)?;
        let gateway = Arc::new(WsGateway::new(backend, subscriber, http_addr));
        let app = gateway
            .router()
            .layer(build_cors_layer(&config.cors))
            .layer(ConcurrencyLimitLayer::new(config.max_connections as usize));

        info!(addr = %ws_addr, "Starting WebSocket server");
        let ws = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "WebSocket server error");
            }
        });

        Ok(RpcServerHandle { http_addr, ws_addr, rpc, ws, indexer: indexer_task, filters })
    }
}

/// Handle for managing the RPC server lifecycle.
pub struct RpcServerHandle {
    http_addr: SocketAddr,
    ws_addr: SocketAddr,
    rpc: ServerHandle,
    ws: JoinHandle<()>,
    indexer: Option<JoinHandle<()>>,
    filters: Arc<FiltersApi>,
}

impl std::fmt::Debug for RpcServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServerHandle")
            .field("http_addr", &self.http_addr)
            .field("ws_addr", &self.ws_addr)
            .finish_non_exhaustive()
    }
}

impl RpcServerHandle {
    /// Address the JSON-RPC server listens on.
    pub const fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Address the WebSocket server listens on.
    pub const fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    /// The filter registry shared by both servers.
    pub const fn filters(&self) -> &Arc<FiltersApi> {
        &self.filters
    }

    /// Wait for both servers to complete.
    pub async fn stopped(self) {
        let _ = tokio::join!(self.rpc.stopped(), self.ws);
    }

    /// Abort both servers and the indexer service.
    pub fn abort(self) {
        let _ = self.rpc.stop();
        self.ws.abort();
        if let Some(indexer) = self.indexer {
            indexer.abort();
        }
    }
}
