//! Maps Ethereum subscription kinds onto native event queries.
//!
//! Every distinct query gets exactly one upstream subscription and one bus
//! topic, fed through a relay channel by the dispatcher. Topic installation
//! and removal are serialized through a single control loop.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
    time::Duration,
};

use evmgate_primitives::NativeEvent;
use evmgate_pubsub::{EventBus, Unsubscriber};
use parking_lot::RwLock;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use crate::{ClientError, EventSource, FilterCriteria, RpcError, SubscriptionId};

/// Native query of every executed transaction.
pub const TX_EVENTS_QUERY: &str = "tm.event='Tx'";

/// Native query of transactions handled by the EVM module.
pub const EVM_EVENTS_QUERY: &str = "tm.event='Tx' AND message.module='evm'";

/// Native query of committed block headers.
pub const HEADER_EVENTS_QUERY: &str = "tm.event='NewBlockHeader'";

/// Default buffer size of each subscription channel.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 64;

/// How long the dispatcher waits on a lagging topic before dropping an event.
const RELAY_TIMEOUT: Duration = Duration::from_secs(1);

const RELAY_CAPACITY: usize = 16;

/// Semantic stream a [`Subscription`] delivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// Transactions of the EVM module, filtered downstream by log criteria.
    Logs,
    /// Committed block headers.
    NewHeads,
    /// Every executed transaction.
    PendingTransactions,
}

impl SubscriptionKind {
    /// Returns the native query delivering this stream.
    pub const fn query(&self) -> &'static str {
        match self {
            Self::Logs => EVM_EVENTS_QUERY,
            Self::NewHeads => HEADER_EVENTS_QUERY,
            Self::PendingTransactions => TX_EVENTS_QUERY,
        }
    }
}

/// A registration on the event bus.
///
/// Dropping the subscription unsubscribes it. Unsubscribing through a cloned
/// [`Unsubscriber`] closes the event channel.
pub struct Subscription {
    id: SubscriptionId,
    kind: SubscriptionKind,
    events: mpsc::Receiver<NativeEvent>,
    unsubscriber: Unsubscriber,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("unsubscribed", &self.unsubscriber.is_unsubscribed())
            .finish()
    }
}

impl Subscription {
    /// Returns the subscription id.
    pub const fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Returns the delivered stream.
    pub const fn kind(&self) -> SubscriptionKind {
        self.kind
    }

    /// Returns the native query backing this subscription.
    pub const fn query(&self) -> &'static str {
        self.kind.query()
    }

    /// Receives the next event, `None` once unsubscribed or the topic closed.
    pub async fn recv(&mut self) -> Option<NativeEvent> {
        self.events.recv().await
    }

    /// Returns a handle that unsubscribes from elsewhere.
    pub fn unsubscriber(&self) -> Unsubscriber {
        self.unsubscriber.clone()
    }

    /// Unsubscribes, discarding undelivered events.
    pub fn unsubscribe(mut self) {
        self.events.close();
        while self.events.try_recv().is_ok() {}
        self.unsubscriber.unsubscribe();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscriber.unsubscribe();
    }
}

enum Control {
    Install { id: SubscriptionId, query: &'static str, done: oneshot::Sender<Result<(), ClientError>> },
    Uninstall { id: SubscriptionId, query: &'static str },
}

struct Topics {
    bus: EventBus<NativeEvent>,
    relays: RwLock<HashMap<&'static str, mpsc::Sender<NativeEvent>>>,
}

/// Subscribes to native events on behalf of filters and WebSocket clients.
pub struct EventSubscriber {
    topics: Arc<Topics>,
    control: mpsc::UnboundedSender<Control>,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for EventSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscriber").field("topics", &self.topics.bus.topics()).finish()
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl EventSubscriber {
    /// Starts the control loop and the dispatcher over the native `events` stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(source: Arc<dyn EventSource>, events: mpsc::Receiver<NativeEvent>) -> Self {
        Self::with_capacity(source, events, DEFAULT_SUBSCRIPTION_CAPACITY)
    }

    /// Like [`EventSubscriber::new`] with subscription channels buffering `capacity` events.
    pub fn with_capacity(
        source: Arc<dyn EventSource>,
        events: mpsc::Receiver<NativeEvent>,
        capacity: usize,
    ) -> Self {
        let topics =
            Arc::new(Topics { bus: EventBus::new(capacity), relays: RwLock::new(HashMap::new()) });
        let (control, requests) = mpsc::unbounded_channel();

        let tasks = vec![
            tokio::spawn(control_loop(source, Arc::clone(&topics), requests)),
            tokio::spawn(dispatch(Arc::clone(&topics), events)),
        ];
        Self { topics, control, tasks }
    }

    /// Subscribes to EVM transactions for a logs filter.
    ///
    /// The range must be `latest..latest`, `from..latest` or `from..=to` with
    /// `from <= to`.
    pub async fn subscribe_logs(&self, criteria: &FilterCriteria) -> Result<Subscription, RpcError> {
        match (criteria.from_height(), criteria.to_height()) {
            (_, None) => {}
            (Some(from), Some(to)) if from <= to => {}
            (from, Some(to)) => {
                let from = from.map_or_else(|| "latest".to_string(), |from| from.to_string());
                return Err(RpcError::InvalidRequest(format!(
                    "invalid from and to block combination: from > to ({from} > {to})"
                )));
            }
        }
        self.subscribe(SubscriptionKind::Logs).await
    }

    /// Subscribes to committed block headers.
    pub async fn subscribe_new_heads(&self) -> Result<Subscription, RpcError> {
        self.subscribe(SubscriptionKind::NewHeads).await
    }

    /// Subscribes to executed transactions.
    pub async fn subscribe_pending_txs(&self) -> Result<Subscription, RpcError> {
        self.subscribe(SubscriptionKind::PendingTransactions).await
    }

    /// Returns the installed topics.
    pub fn topics(&self) -> Vec<String> {
        self.topics.bus.topics()
    }

    /// Returns the number of live subscriptions on `query`.
    pub fn subscriber_count(&self, query: &str) -> usize {
        self.topics.bus.subscriber_count(query)
    }

    /// Tears down the topic of `query`, ending its subscriptions.
    #[cfg(test)]
    pub(crate) fn close_topic(&self, query: &str) {
        self.topics.relays.write().remove(query);
        self.topics.bus.remove_topic(query);
    }

    async fn subscribe(&self, kind: SubscriptionKind) -> Result<Subscription, RpcError> {
        let id = SubscriptionId::random();
        let query = kind.query();

        let (done, installed) = oneshot::channel();
        self.control
            .send(Control::Install { id: id.clone(), query, done })
            .map_err(|_| RpcError::Internal("event subscriber stopped".to_string()))?;
        installed.await.map_err(|_| RpcError::Internal("event subscriber stopped".to_string()))??;

        let (events, bus_unsubscriber) = match self.topics.bus.subscribe(query) {
            Ok(subscribed) => subscribed,
            Err(err) => {
                let _ = self.control.send(Control::Uninstall { id, query });
                return Err(err.into());
            }
        };

        let control = self.control.clone();
        let uninstall_id = id.clone();
        let unsubscriber = Unsubscriber::new(move || {
            bus_unsubscriber.unsubscribe();
            let _ = control.send(Control::Uninstall { id: uninstall_id.clone(), query });
        });

        debug!(%id, query, "subscribed");
        Ok(Subscription { id, kind, events, unsubscriber })
    }
}

async fn control_loop(
    source: Arc<dyn EventSource>,
    topics: Arc<Topics>,
    mut requests: mpsc::UnboundedReceiver<Control>,
) {
    let mut index: HashMap<&'static str, HashSet<SubscriptionId>> = HashMap::new();

    while let Some(request) = requests.recv().await {
        match request {
            Control::Install { id, query, done } => {
                if !topics.relays.read().contains_key(query) {
                    if let Err(err) = source.subscribe(query).await {
                        error!(query, error = %err, "failed to subscribe to native events");
                        let _ = done.send(Err(err));
                        continue;
                    }
                    let (relay, rx) = mpsc::channel(RELAY_CAPACITY);
                    if let Err(err) = topics.bus.add_topic(query, rx) {
                        error!(query, error = %err, "failed to add topic");
                    }
                    topics.relays.write().insert(query, relay);
                    info!(query, "subscribed to native events");
                }
                index.entry(query).or_default().insert(id);
                let _ = done.send(Ok(()));
            }
            Control::Uninstall { id, query } => {
                let in_use = index.get_mut(query).is_some_and(|ids| {
                    ids.remove(&id);
                    !ids.is_empty()
                });
                if in_use {
                    continue;
                }
                index.remove(query);

                if let Err(err) = source.unsubscribe(query).await {
                    error!(query, error = %err, "failed to unsubscribe from native events");
                }
                topics.relays.write().remove(query);
                topics.bus.remove_topic(query);
                info!(query, "unsubscribed from native events");
            }
        }
    }
}

async fn dispatch(topics: Arc<Topics>, mut events: mpsc::Receiver<NativeEvent>) {
    while let Some(event) = events.recv().await {
        if event.query.is_empty() {
            continue;
        }
        let relay = topics.relays.read().get(event.query.as_str()).cloned();
        let Some(relay) = relay else {
            debug!(query = %event.query, "channel for subscription not found");
            continue;
        };

        let query = event.query.clone();
        match tokio::time::timeout(RELAY_TIMEOUT, relay.send(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!(%query, "topic closed, dropped event"),
            Err(_) => debug!(topic = %query, "dropped event during lagging subscription"),
        }
    }
    debug!("native event stream closed");
}

#[cfg(test)]
mod tests {
    use evmgate_primitives::EventData;

    use super::*;
    use crate::{BlockNumberOrTag, InMemoryNode, test_utils::wait_until};

    fn subscriber(node: &Arc<InMemoryNode>, events: mpsc::Receiver<NativeEvent>) -> EventSubscriber {
        EventSubscriber::new(Arc::clone(node) as Arc<dyn EventSource>, events)
    }

    async fn recv(sub: &mut Subscription) -> NativeEvent {
        tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("event delivered in time")
            .expect("subscription open")
    }

    #[tokio::test]
    async fn one_upstream_subscription_per_query() {
        let (node, events) = InMemoryNode::new();
        let subscriber = subscriber(&node, events);

        let mut a = subscriber.subscribe_new_heads().await.unwrap();
        let mut b = subscriber.subscribe_new_heads().await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(node.subscribed_queries(), vec![HEADER_EVENTS_QUERY.to_string()]);
        assert_eq!(subscriber.subscriber_count(HEADER_EVENTS_QUERY), 2);

        let block = node.produce_block(Vec::new()).await;
        for sub in [&mut a, &mut b] {
            let EventData::NewBlockHeader(header) = recv(sub).await.data else {
                panic!("expected a header event");
            };
            assert_eq!(header.header.hash, block.hash());
        }
    }

    #[tokio::test]
    async fn upstream_failure_is_returned_to_caller() {
        let (node, events) = InMemoryNode::new();
        let subscriber = subscriber(&node, events);

        node.set_online(false);
        let err = subscriber.subscribe_pending_txs().await.unwrap_err();
        assert!(matches!(err, RpcError::Upstream(ClientError::Unavailable(_))));
        assert!(subscriber.topics().is_empty());

        node.set_online(true);
        assert!(subscriber.subscribe_pending_txs().await.is_ok());
    }

    #[tokio::test]
    async fn last_unsubscribe_removes_topic() {
        let (node, events) = InMemoryNode::new();
        let subscriber = subscriber(&node, events);

        let a = subscriber.subscribe_new_heads().await.unwrap();
        let b = subscriber.subscribe_new_heads().await.unwrap();

        a.unsubscribe();
        wait_until(|| subscriber.subscriber_count(HEADER_EVENTS_QUERY) == 1).await;
        assert_eq!(node.subscribed_queries().len(), 1);

        let handle = b.unsubscriber();
        handle.unsubscribe();
        handle.unsubscribe();
        drop(b);
        wait_until(|| node.subscribed_queries().is_empty()).await;
        wait_until(|| subscriber.topics().is_empty()).await;

        // a fresh subscription reinstalls the topic
        let mut c = subscriber.subscribe_new_heads().await.unwrap();
        node.produce_block(Vec::new()).await;
        assert!(matches!(recv(&mut c).await.data, EventData::NewBlockHeader(_)));
    }

    #[tokio::test]
    async fn unread_subscriber_does_not_stall_others() {
        let (node, events) = InMemoryNode::new();
        let subscriber =
            EventSubscriber::with_capacity(Arc::clone(&node) as Arc<dyn EventSource>, events, 1);

        let mut idle = subscriber.subscribe_new_heads().await.unwrap();
        let mut active = subscriber.subscribe_new_heads().await.unwrap();

        for height in 1..=5 {
            node.produce_block(Vec::new()).await;
            let EventData::NewBlockHeader(header) = recv(&mut active).await.data else {
                panic!("expected a header event");
            };
            assert_eq!(header.header.height, height);
        }

        let EventData::NewBlockHeader(first) = recv(&mut idle).await.data else {
            panic!("expected a header event");
        };
        assert_eq!(first.header.height, 1);
    }

    #[tokio::test]
    async fn logs_range_validation() {
        let (node, events) = InMemoryNode::new();
        let subscriber = subscriber(&node, events);

        let criteria = |from: Option<BlockNumberOrTag>, to: Option<BlockNumberOrTag>| FilterCriteria {
            from_block: from,
            to_block: to,
            ..Default::default()
        };

        assert!(subscriber.subscribe_logs(&criteria(None, None)).await.is_ok());
        assert!(subscriber.subscribe_logs(&criteria(Some(3.into()), None)).await.is_ok());
        assert!(subscriber.subscribe_logs(&criteria(Some(3.into()), Some(5.into()))).await.is_ok());
        assert!(subscriber.subscribe_logs(&criteria(Some(5.into()), Some(5.into()))).await.is_ok());

        let err = subscriber.subscribe_logs(&criteria(Some(5.into()), Some(3.into()))).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid from and to block combination: from > to (5 > 3)");

        let err = subscriber.subscribe_logs(&criteria(None, Some(3.into()))).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)));

        assert_eq!(node.subscribed_queries(), vec![EVM_EVENTS_QUERY.to_string()]);
    }
}
