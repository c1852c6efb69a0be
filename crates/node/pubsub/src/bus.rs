//! Topic multiplexer with one upstream source and many subscribers per topic.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};

use crate::PubSubError;

/// Default buffer size of each subscriber channel.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1;

struct Topic<T> {
    /// Id of the `add_topic` call that installed this topic.
    generation: u64,
    /// Subscriber channels keyed by subscriber id.
    subscribers: HashMap<u64, mpsc::Sender<T>>,
}

struct Inner<T> {
    /// The only lock of the bus; topics and their subscribers change together.
    topics: RwLock<HashMap<String, Topic<T>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl<T> Inner<T> {
    /// Removes the topic if it is still the given generation.
    fn close_topic(&self, name: &str, generation: u64) {
        let mut topics = self.topics.write();
        if topics.get(name).is_some_and(|topic| topic.generation == generation) {
            topics.remove(name);
        }
    }

    fn remove_subscriber(&self, name: &str, id: u64) {
        if let Some(topic) = self.topics.write().get_mut(name) {
            topic.subscribers.remove(&id);
        }
    }
}

/// In-process event bus.
///
/// Every topic is fed by a single [`mpsc::Receiver`] and forwarded by one
/// dedicated task to all current subscribers with a non-blocking send. A
/// subscriber that is not ready misses the message.
pub struct EventBus<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.inner.topics.read().len())
            .field("capacity", &self.inner.capacity)
            .finish_non_exhaustive()
    }
}

impl<T> Default for EventBus<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl<T> EventBus<T>
where
    T: Clone + Send + 'static,
{
    /// Creates an empty bus whose subscriber channels buffer `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Registers `name`, fed by `source`, and spawns its forwarding task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add_topic(
        &self,
        name: impl Into<String>,
        source: mpsc::Receiver<T>,
    ) -> Result<(), PubSubError> {
        let name = name.into();
        let generation = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut topics = self.inner.topics.write();
            if topics.contains_key(&name) {
                return Err(PubSubError::TopicExists(name));
            }
            topics.insert(name.clone(), Topic { generation, subscribers: HashMap::new() });
        }
        debug!(topic = %name, "added topic");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(forward(inner, name, generation, source));
        Ok(())
    }

    /// Deletes a topic's bookkeeping and closes its subscriber channels.
    pub fn remove_topic(&self, name: &str) {
        if self.inner.topics.write().remove(name).is_some() {
            debug!(topic = %name, "removed topic");
        }
    }

    /// Returns a snapshot of active topic names.
    pub fn topics(&self) -> Vec<String> {
        self.inner.topics.read().keys().cloned().collect()
    }

    /// Returns true if `name` is an active topic.
    pub fn has_topic(&self, name: &str) -> bool {
        self.inner.topics.read().contains_key(name)
    }

    /// Returns the number of subscribers of `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner.topics.read().get(name).map_or(0, |topic| topic.subscribers.len())
    }

    /// Subscribes to `name`, returning a private delivery channel and its unsubscriber.
    pub fn subscribe(&self, name: &str) -> Result<(mpsc::Receiver<T>, Unsubscriber), PubSubError> {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut topics = self.inner.topics.write();
            let Some(topic) = topics.get_mut(name) else {
                return Err(PubSubError::TopicNotFound(name.to_string()));
            };
            topic.subscribers.insert(id, sender);
        }
        trace!(topic = %name, id, "subscribed");

        let inner = Arc::clone(&self.inner);
        let topic = name.to_string();
        let unsubscribe = Unsubscriber::new(move || inner.remove_subscriber(&topic, id));
        Ok((receiver, unsubscribe))
    }
}

async fn forward<T>(inner: Arc<Inner<T>>, name: String, generation: u64, mut source: mpsc::Receiver<T>)
where
    T: Clone + Send + 'static,
{
    while let Some(message) = source.recv().await {
        let topics = inner.topics.read();
        let Some(topic) = topics.get(&name).filter(|topic| topic.generation == generation) else {
            break;
        };
        for (id, sender) in &topic.subscribers {
            match sender.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    trace!(topic = %name, id, "subscriber not ready, dropped message");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
    inner.close_topic(&name, generation);
    debug!(topic = %name, "topic source closed");
}

/// Handle that removes one subscriber from its topic.
///
/// Calling [`Unsubscriber::unsubscribe`] more than once is a no-op.
#[derive(Clone)]
pub struct Unsubscriber {
    done: Arc<AtomicBool>,
    action: Arc<dyn Fn() + Send + Sync>,
}

impl Unsubscriber {
    /// Wraps an unsubscribe action so that it runs at most once.
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self { done: Arc::new(AtomicBool::new(false)), action: Arc::new(action) }
    }

    /// Removes the subscriber. Subsequent calls do nothing.
    pub fn unsubscribe(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            (self.action)();
        }
    }

    /// Returns true once [`Unsubscriber::unsubscribe`] has run.
    pub fn is_unsubscribed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Unsubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscriber").field("done", &self.is_unsubscribed()).finish()
    }
}
