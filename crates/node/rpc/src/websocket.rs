//! WebSocket gateway serving `eth_subscribe` and `eth_unsubscribe`.
//!
//! Subscription requests are handled locally; every other frame is proxied
//! unchanged to the HTTP JSON-RPC server so both transports share one method
//! implementation. Notifications and responses of a connection go through a
//! single write lock.

use std::{collections::HashMap, fmt, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use evmgate_primitives::EventData;
use evmgate_translate::{LogFilter, filter_logs};
use futures::{FutureExt, Sink, SinkExt, Stream, StreamExt, future};
use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::{Mutex, Notify, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use crate::{
    Backend, EventSubscriber, FilterCriteria, RpcError, Subscription, SubscriptionId, SubscriptionKind,
    error::codes,
};

const JSONRPC_VERSION: &str = "2.0";

/// Forwards JSON-RPC frames to the HTTP server over loopback.
#[derive(Debug, Clone)]
struct RpcProxy {
    client: reqwest::Client,
    url: String,
}

impl RpcProxy {
    fn new(rpc_addr: SocketAddr) -> Self {
        let mut addr = rpc_addr;
        if addr.ip().is_unspecified() {
            addr.set_ip(std::net::Ipv4Addr::LOCALHOST.into());
        }
        Self { client: reqwest::Client::new(), url: format!("http://{addr}") }
    }

    async fn forward(&self, body: String) -> Result<String, reqwest::Error> {
        self.client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?
            .text()
            .await
    }
}

/// Ethereum pub/sub over WebSocket.
pub struct WsGateway {
    backend: Arc<Backend>,
    subscriber: Arc<EventSubscriber>,
    proxy: RpcProxy,
}

impl fmt::Debug for WsGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsGateway").field("rpc_url", &self.proxy.url).finish_non_exhaustive()
    }
}

impl WsGateway {
    /// Creates a gateway proxying plain requests to the JSON-RPC server at `rpc_addr`.
    pub fn new(backend: Arc<Backend>, subscriber: Arc<EventSubscriber>, rpc_addr: SocketAddr) -> Self {
        Self { backend, subscriber, proxy: RpcProxy::new(rpc_addr) }
    }

    /// Returns a router upgrading `/` to a WebSocket connection.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().route("/", get(upgrade)).with_state(self)
    }

    /// Serves one upgraded socket until either side closes it.
    pub async fn serve_socket(self: Arc<Self>, socket: WebSocket) {
        let (sink, stream) = socket.split();
        let sink = sink.with(|text: String| future::ok::<_, axum::Error>(Message::Text(text.into())));
        let stream = stream
            .take_while(|msg| future::ready(matches!(msg, Ok(msg) if !matches!(msg, Message::Close(_)))))
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                    _ => None,
                })
            });
        self.serve(sink, Box::pin(stream)).await;
    }

    pub(crate) async fn serve<S, R>(self: Arc<Self>, sink: S, stream: R)
    where
        S: Sink<String> + Send + Unpin + 'static,
        S::Error: fmt::Display,
        R: Stream<Item = String> + Unpin,
    {
        let (ended, ended_rx) = mpsc::unbounded_channel();
        let connection = Connection {
            gateway: self,
            writer: Arc::new(Mutex::new(sink)),
            closed: Arc::new(Notify::new()),
            ended,
            subscriptions: HashMap::new(),
        };
        connection.run(stream, ended_rx).await;
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(gateway): State<Arc<WsGateway>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| gateway.serve_socket(socket))
}

#[derive(Serialize)]
struct Response<'a, T> {
    jsonrpc: &'static str,
    id: &'a Value,
    result: T,
}

#[derive(Serialize)]
struct Notification<'a, T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: NotificationParams<'a, T>,
}

#[derive(Serialize)]
struct NotificationParams<'a, T> {
    subscription: &'a SubscriptionId,
    result: T,
}

#[derive(Serialize)]
struct ErrorResponse {
    jsonrpc: &'static str,
    error: ErrorObject,
    id: Value,
}

#[derive(Serialize)]
struct ErrorObject {
    code: i32,
    message: String,
}

type Writer<S> = Arc<Mutex<S>>;

async fn write<S>(writer: &Writer<S>, frame: String) -> Result<(), String>
where
    S: Sink<String> + Unpin,
    S::Error: fmt::Display,
{
    writer.lock().await.send(frame).await.map_err(|err| err.to_string())
}

struct Connection<S> {
    gateway: Arc<WsGateway>,
    writer: Writer<S>,
    closed: Arc<Notify>,
    /// Ids of forward tasks that stopped on their own.
    ended: mpsc::UnboundedSender<SubscriptionId>,
    subscriptions: HashMap<SubscriptionId, JoinHandle<()>>,
}

impl<S> Connection<S>
where
    S: Sink<String> + Send + Unpin + 'static,
    S::Error: fmt::Display,
{
    async fn run<R: Stream<Item = String> + Unpin>(
        mut self,
        mut stream: R,
        mut ended: mpsc::UnboundedReceiver<SubscriptionId>,
    ) {
        debug!("websocket connection opened");
        loop {
            let frame = tokio::select! {
                biased;
                Some(id) = ended.recv() => {
                    if self.subscriptions.remove(&id).is_some() {
                        debug!(%id, "websocket subscription ended");
                    }
                    continue;
                }
                () = self.closed.notified() => break,
                frame = stream.next() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            if !self.handle(frame).await {
                break;
            }
        }

        let subscriptions = self.subscriptions.len();
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
        let _ = self.writer.lock().await.close().await;
        debug!(subscriptions, "websocket connection closed");
    }

    /// Handles one inbound frame, returning false once the connection must close.
    async fn handle(&mut self, frame: String) -> bool {
        if frame.trim_start().starts_with('[') {
            return self.proxy(frame).await;
        }

        let request: serde_json::Map<String, Value> = match serde_json::from_str(&frame) {
            Ok(request) => request,
            Err(err) => return self.send_error(err.to_string()).await,
        };
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return self.proxy(frame).await;
        };
        let id = match request_id(request.get("id")) {
            Ok(id) => id,
            Err(message) => return self.send_error(message).await,
        };
        let params = request.get("params");

        match method {
            "eth_subscribe" => match self.subscribe(params).await {
                Ok(sub_id) => self.respond(&id, sub_id).await,
                Err(err) => self.send_error(err.to_string()).await,
            },
            "eth_unsubscribe" => {
                let sub_id = params
                    .and_then(Value::as_array)
                    .and_then(|params| params.first())
                    .and_then(Value::as_str);
                match sub_id {
                    Some(sub_id) => {
                        let removed = self.unsubscribe(&sub_id.into());
                        self.respond(&id, removed).await
                    }
                    None => self.send_error("invalid parameters".to_string()).await,
                }
            }
            _ => self.proxy(frame).await,
        }
    }

    async fn subscribe(&mut self, params: Option<&Value>) -> Result<SubscriptionId, RpcError> {
        let params = params
            .and_then(Value::as_array)
            .ok_or_else(|| RpcError::InvalidRequest("invalid parameters".to_string()))?;
        let kind = params
            .first()
            .ok_or_else(|| RpcError::InvalidRequest("empty parameters".to_string()))?
            .as_str()
            .ok_or_else(|| RpcError::InvalidRequest("invalid subscription type".to_string()))?;

        let subscriber = &self.gateway.subscriber;
        let (subscription, filter) = match kind {
            "newHeads" => (subscriber.subscribe_new_heads().await?, LogFilter::new()),
            "newPendingTransactions" => (subscriber.subscribe_pending_txs().await?, LogFilter::new()),
            "logs" => {
                let criteria = log_criteria(params.get(1))?;
                (subscriber.subscribe_logs(&criteria).await?, criteria.log_filter())
            }
            "syncing" => return Err(RpcError::NotImplemented("syncing subscription")),
            other => return Err(RpcError::InvalidRequest(format!("unsupported method {other}"))),
        };

        let id = subscription.id().clone();
        let task = tokio::spawn(forward(
            Arc::clone(&self.gateway.backend),
            subscription,
            filter,
            Arc::clone(&self.writer),
            Arc::clone(&self.closed),
            self.ended.clone(),
        ));
        self.subscriptions.insert(id.clone(), task);
        debug!(%id, kind, "websocket subscription created");
        Ok(id)
    }

    fn unsubscribe(&mut self, id: &SubscriptionId) -> bool {
        match self.subscriptions.remove(id) {
            Some(task) => {
                task.abort();
                debug!(%id, "websocket subscription removed");
                true
            }
            None => false,
        }
    }

    async fn proxy(&self, frame: String) -> bool {
        match self.gateway.proxy.forward(frame).await {
            Ok(response) => self.send(response).await,
            Err(err) => self.send_error(format!("failed to forward request: {err}")).await,
        }
    }

    async fn respond<T: Serialize>(&self, id: &Value, result: T) -> bool {
        match serde_json::to_string(&Response { jsonrpc: JSONRPC_VERSION, id, result }) {
            Ok(frame) => self.send(frame).await,
            Err(err) => self.send_error(err.to_string()).await,
        }
    }

    async fn send_error(&self, message: String) -> bool {
        let response = ErrorResponse {
            jsonrpc: JSONRPC_VERSION,
            error: ErrorObject { code: codes::INVALID_REQUEST, message },
            id: Value::Null,
        };
        match serde_json::to_string(&response) {
            Ok(frame) => self.send(frame).await,
            Err(err) => {
                error!(error = %err, "failed to encode error response");
                true
            }
        }
    }

    async fn send(&self, frame: String) -> bool {
        match write(&self.writer, frame).await {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "failed to write websocket response");
                false
            }
        }
    }
}

/// Accepts numeric ids and strings holding a number.
fn request_id(id: Option<&Value>) -> Result<Value, String> {
    match id {
        Some(Value::Number(number)) => Ok(Value::Number(number.clone())),
        Some(Value::String(id)) if id.parse::<f64>().is_ok() => Ok(Value::String(id.clone())),
        Some(Value::String(id)) => Err(format!("invalid connection ID: {id}")),
        Some(other) => Err(format!("invalid type for connection ID: {}", json_type(other))),
        None => Err("invalid type for connection ID: missing".to_string()),
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn log_criteria(params: Option<&Value>) -> Result<FilterCriteria, RpcError> {
    match params {
        None | Some(Value::Null) => Ok(FilterCriteria::default()),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|err| RpcError::InvalidParams(format!("invalid criteria: {err}"))),
        Some(_) => Err(RpcError::InvalidParams("invalid criteria".to_string())),
    }
}

/// Pushes the events of one subscription to the socket until it closes.
async fn forward<S>(
    backend: Arc<Backend>,
    mut subscription: Subscription,
    filter: LogFilter,
    writer: Writer<S>,
    closed: Arc<Notify>,
    ended: mpsc::UnboundedSender<SubscriptionId>,
) where
    S: Sink<String> + Send + Unpin + 'static,
    S::Error: fmt::Display,
{
    let id = subscription.id().clone();
    while let Some(event) = subscription.recv().await {
        let delivered = match (subscription.kind(), event.data) {
            (SubscriptionKind::NewHeads, EventData::NewBlockHeader(data)) => {
                let header = backend.header_from_event(&data).await;
                notify(&writer, &closed, &id, header).await
            }
            (SubscriptionKind::Logs, EventData::Tx(data)) => match Backend::logs_from_tx_event(&data) {
                Ok(logs) => {
                    let mut delivered = true;
                    for log in filter_logs(&logs, &filter) {
                        if !notify(&writer, &closed, &id, log).await {
                            delivered = false;
                            break;
                        }
                    }
                    delivered
                }
                Err(err) => {
                    error!(%id, height = data.height, error = %err, "failed to parse tx logs");
                    false
                }
            },
            (SubscriptionKind::PendingTransactions, EventData::Tx(data)) => {
                let mut delivered = true;
                for hash in backend.eth_hashes_from_tx_event(&data) {
                    if !notify(&writer, &closed, &id, hash).await {
                        delivered = false;
                        break;
                    }
                }
                delivered
            }
            (kind, _) => {
                debug!(%id, ?kind, "unexpected event type");
                true
            }
        };
        if !delivered {
            break;
        }
    }
    // reported before the subscription drops so the id is released first
    let _ = ended.send(id.clone());
    info!(%id, "websocket subscription stopped");
}

/// Writes one notification, closing the connection if the write fails or panics.
async fn notify<S, T>(writer: &Writer<S>, closed: &Notify, id: &SubscriptionId, result: T) -> bool
where
    S: Sink<String> + Send + Unpin + 'static,
    S::Error: fmt::Display,
    T: Serialize,
{
    let notification = Notification {
        jsonrpc: JSONRPC_VERSION,
        method: "eth_subscription",
        params: NotificationParams { subscription: id, result },
    };
    let frame = match serde_json::to_string(&notification) {
        Ok(frame) => frame,
        Err(err) => {
            error!(%id, error = %err, "failed to encode notification");
            return true;
        }
    };

    match AssertUnwindSafe(write(writer, frame)).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!(%id, error = %err, "failed to write notification, closing connection");
            closed.notify_one();
            false
        }
        Err(_) => {
            error!(%id, "notification write panicked, closing connection");
            closed.notify_one();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
        time::Duration,
    };

    use alloy_primitives::Address;
    use futures::channel::mpsc;
    use serde_json::json;

    use super::*;
    use crate::{
        BackendConfig, EventSource, InMemoryNode, NativeClient,
        subscriber::HEADER_EVENTS_QUERY,
        test_utils::{eth_result, eth_tx, hash, log, wait_until},
    };

    struct Client {
        node: Arc<InMemoryNode>,
        subscriber: Arc<EventSubscriber>,
        gateway: Arc<WsGateway>,
        requests: mpsc::UnboundedSender<String>,
        frames: mpsc::UnboundedReceiver<String>,
    }

    impl Client {
        fn connect() -> Self {
            let (node, events) = InMemoryNode::new();
            let subscriber =
                Arc::new(EventSubscriber::new(Arc::clone(&node) as Arc<dyn EventSource>, events));
            let backend = Arc::new(Backend::new(
                Arc::clone(&node) as Arc<dyn NativeClient>,
                BackendConfig::default(),
            ));
            // nothing listens on the discard port
            let gateway =
                Arc::new(WsGateway::new(backend, Arc::clone(&subscriber), "127.0.0.1:9".parse().unwrap()));

            let (requests, inbound) = mpsc::unbounded();
            let (outbound, frames) = mpsc::unbounded();
            tokio::spawn(Arc::clone(&gateway).serve(outbound, inbound));
            Self { node, subscriber, gateway, requests, frames }
        }

        /// Opens another connection on the same gateway.
        fn reconnect(&self) -> Self {
            let (requests, inbound) = mpsc::unbounded();
            let (outbound, frames) = mpsc::unbounded();
            tokio::spawn(Arc::clone(&self.gateway).serve(outbound, inbound));
            Self {
                node: Arc::clone(&self.node),
                subscriber: Arc::clone(&self.subscriber),
                gateway: Arc::clone(&self.gateway),
                requests,
                frames,
            }
        }

        async fn next(&mut self) -> Value {
            let frame = tokio::time::timeout(Duration::from_secs(5), self.frames.next())
                .await
                .expect("frame in time")
                .expect("connection open");
            serde_json::from_str(&frame).unwrap()
        }

        async fn request(&mut self, request: Value) -> Value {
            self.requests.unbounded_send(request.to_string()).unwrap();
            self.next().await
        }

        async fn subscribe(&mut self, params: Value) -> String {
            let response =
                self.request(json!({"jsonrpc": "2.0", "id": 1, "method": "eth_subscribe", "params": params})).await;
            response["result"].as_str().expect("subscription id").to_string()
        }
    }

    #[tokio::test]
    async fn new_heads_notifications() {
        let mut client = Client::connect();
        let id = client.subscribe(json!(["newHeads"])).await;
        assert!(id.starts_with("0x"));

        let block = client.node.produce_block(Vec::new()).await;
        let notification = client.next().await;
        assert_eq!(notification["method"], "eth_subscription");
        assert_eq!(notification["params"]["subscription"], id);
        assert_eq!(notification["params"]["result"]["hash"], block.hash().to_string());
    }

    #[tokio::test]
    async fn logs_notifications_apply_criteria() {
        let mut client = Client::connect();
        let address = Address::repeat_byte(0xaa);
        let id = client.subscribe(json!(["logs", {"address": address}])).await;

        client
            .node
            .produce_block(vec![
                (eth_tx(&[1]), eth_result(&[1], 0, vec![vec![log(0xbb, 1, 1, 1)]])),
                (eth_tx(&[2]), eth_result(&[2], 1, vec![vec![log(0xaa, 1, 1, 2)]])),
            ])
            .await;

        let notification = client.next().await;
        assert_eq!(notification["params"]["subscription"], id);
        assert_eq!(notification["params"]["result"]["transactionHash"], hash(2).to_string());
    }

    #[tokio::test]
    async fn pending_transaction_notifications() {
        let mut client = Client::connect();
        client.subscribe(json!(["newPendingTransactions"])).await;

        client.node.produce_block(vec![(eth_tx(&[3, 4]), eth_result(&[3, 4], 0, vec![]))]).await;
        assert_eq!(client.next().await["params"]["result"], hash(3).to_string());
        assert_eq!(client.next().await["params"]["result"], hash(4).to_string());
    }

    #[tokio::test]
    async fn unsubscribe_reports_removal_once() {
        let mut client = Client::connect();
        let id = client.subscribe(json!(["newHeads"])).await;

        let unsubscribe = json!({"jsonrpc": "2.0", "id": "7", "method": "eth_unsubscribe", "params": [id]});
        let response = client.request(unsubscribe.clone()).await;
        assert_eq!(response["result"], true);
        assert_eq!(response["id"], "7");
        assert_eq!(client.request(unsubscribe).await["result"], false);

        let node = Arc::clone(&client.node);
        wait_until(|| node.subscribed_queries().is_empty()).await;
    }

    #[tokio::test]
    async fn malformed_requests_get_error_envelopes() {
        let mut client = Client::connect();

        let response = client.request(json!({"jsonrpc": "2.0", "id": "abc", "method": "eth_subscribe"})).await;
        assert_eq!(response["error"]["code"], codes::INVALID_REQUEST);
        assert!(response["id"].is_null());

        let response =
            client.request(json!({"jsonrpc": "2.0", "id": 2, "method": "eth_subscribe", "params": ["syncing"]})).await;
        assert_eq!(response["error"]["message"], "syncing subscription is not implemented");

        let response =
            client.request(json!({"jsonrpc": "2.0", "id": 3, "method": "eth_subscribe", "params": []})).await;
        assert_eq!(response["error"]["message"], "empty parameters");

        let response = client
            .request(json!({"jsonrpc": "2.0", "id": 4, "method": "eth_subscribe", "params": ["logs", {"fromBlock": "0x5", "toBlock": "0x1"}]}))
            .await;
        assert!(response["error"]["message"].as_str().unwrap().starts_with("invalid from and to block combination"));

        client.requests.unbounded_send("{not json".to_string()).unwrap();
        assert_eq!(client.next().await["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_rpc_server_is_reported() {
        let mut client = Client::connect();
        let response = client.request(json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber"})).await;
        assert!(response["error"]["message"].as_str().unwrap().starts_with("failed to forward request"));
    }

    #[tokio::test]
    async fn closing_connection_releases_subscriptions() {
        let mut client = Client::connect();
        client.subscribe(json!(["newHeads"])).await;
        client.subscribe(json!(["logs"])).await;
        assert_eq!(client.node.subscribed_queries().len(), 2);

        let node = Arc::clone(&client.node);
        drop(client);
        wait_until(|| node.subscribed_queries().is_empty()).await;
    }

    #[tokio::test]
    async fn failed_write_closes_connection() {
        let mut client = Client::connect();
        client.subscribe(json!(["newHeads"])).await;

        // the gateway keeps reading but can no longer write
        client.frames.close();
        client.node.produce_block(Vec::new()).await;

        let node = Arc::clone(&client.node);
        wait_until(|| node.subscribed_queries().is_empty()).await;
    }

    #[tokio::test]
    async fn ended_subscription_cannot_be_unsubscribed() {
        let mut client = Client::connect();
        let id = client.subscribe(json!(["newHeads"])).await;

        client.subscriber.close_topic(HEADER_EVENTS_QUERY);
        let node = Arc::clone(&client.node);
        wait_until(|| node.subscribed_queries().is_empty()).await;

        let unsubscribe = json!({"jsonrpc": "2.0", "id": 1, "method": "eth_unsubscribe", "params": [id]});
        assert_eq!(client.request(unsubscribe).await["result"], false);
    }

    /// Delivers responses but panics on any subscription notification.
    struct PanicOnNotification(mpsc::UnboundedSender<String>);

    impl Sink<String> for PanicOnNotification {
        type Error = mpsc::SendError;

        fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Pin::new(&mut self.0).poll_ready(cx)
        }

        fn start_send(mut self: Pin<&mut Self>, frame: String) -> Result<(), Self::Error> {
            assert!(!frame.contains("eth_subscription"), "socket write failed");
            Pin::new(&mut self.0).start_send(frame)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Pin::new(&mut self.0).poll_flush(cx)
        }

        fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Pin::new(&mut self.0).poll_close(cx)
        }
    }

    #[tokio::test]
    async fn panicking_write_closes_only_that_connection() {
        let client = Client::connect();
        let (requests, inbound) = mpsc::unbounded();
        let (outbound, mut frames) = mpsc::unbounded();
        let served = tokio::spawn(Arc::clone(&client.gateway).serve(PanicOnNotification(outbound), inbound));

        let subscribe = json!({"jsonrpc": "2.0", "id": 1, "method": "eth_subscribe", "params": ["newHeads"]});
        requests.unbounded_send(subscribe.to_string()).unwrap();
        let response = tokio::time::timeout(Duration::from_secs(5), frames.next()).await.unwrap().unwrap();
        assert!(response.contains("\"result\":\"0x"));

        client.node.produce_block(Vec::new()).await;
        tokio::time::timeout(Duration::from_secs(5), served)
            .await
            .expect("connection closed in time")
            .expect("panic contained in the write path");
        assert_eq!(frames.next().await, None);
        let node = Arc::clone(&client.node);
        wait_until(|| node.subscribed_queries().is_empty()).await;

        let mut other = client.reconnect();
        other.subscribe(json!(["newHeads"])).await;
        let block = other.node.produce_block(Vec::new()).await;
        assert_eq!(other.next().await["params"]["result"]["hash"], block.hash().to_string());
    }
}
