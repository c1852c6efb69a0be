//! Polling filters of `eth_newFilter`, `eth_newBlockFilter` and
//! `eth_newPendingTransactionFilter`.
//!
//! Each filter owns an event subscription drained by an accumulation task
//! into the filter's buffer. Polls drain the buffer and push back the
//! inactivity deadline; a reaper removes filters whose deadline passed. A
//! filter whose subscription ends is removed by its own task.

use std::{
    collections::HashMap,
    fmt, mem,
    sync::{Arc, Weak},
    time::{Duration, Instant},
};

use alloy_primitives::B256;
use evmgate_config::{DEFAULT_FILTER_CAP, DEFAULT_FILTER_TIMEOUT_SECS};
use evmgate_primitives::EventData;
use evmgate_translate::{LogFilter, RpcLog, filter_logs};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    Backend, EventSubscriber, FilterChanges, FilterCriteria, FilterKind, RpcError, Subscription,
    SubscriptionId,
};

/// Limits of the filter registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiltersConfig {
    /// Maximum number of live filters.
    pub filter_cap: usize,
    /// Inactivity after which a filter is reaped, also the reaper interval.
    pub filter_timeout: Duration,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            filter_cap: DEFAULT_FILTER_CAP,
            filter_timeout: Duration::from_secs(DEFAULT_FILTER_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug)]
struct Changes {
    hashes: Vec<B256>,
    logs: Vec<RpcLog>,
    deadline: Instant,
}

struct Filter {
    kind: FilterKind,
    criteria: FilterCriteria,
    changes: Arc<Mutex<Changes>>,
    task: JoinHandle<()>,
}

impl Drop for Filter {
    fn drop(&mut self) {
        // dropping the task drops its subscription
        self.task.abort();
    }
}

struct Registry {
    backend: Arc<Backend>,
    subscriber: Arc<EventSubscriber>,
    config: FiltersConfig,
    filters: RwLock<HashMap<SubscriptionId, Arc<Filter>>>,
}

impl Registry {
    fn get(&self, id: &SubscriptionId) -> Result<Arc<Filter>, RpcError> {
        self.filters.read().get(id).cloned().ok_or_else(|| RpcError::FilterNotFound(id.to_string()))
    }

    /// Removes every filter whose deadline is before `now`.
    fn remove_expired(&self, now: Instant) -> usize {
        let snapshot: Vec<_> =
            self.filters.read().iter().map(|(id, filter)| (id.clone(), Arc::clone(filter))).collect();
        let expired: Vec<_> = snapshot
            .into_iter()
            .filter(|(_, filter)| filter.changes.lock().deadline <= now)
            .map(|(id, _)| id)
            .collect();

        let mut filters = self.filters.write();
        let removed = expired.iter().filter(|id| filters.remove(*id).is_some()).count();
        for id in &expired {
            debug!(%id, "filter expired");
        }
        removed
    }
}

/// Registry of polling filters.
pub struct FiltersApi {
    registry: Arc<Registry>,
    reaper: JoinHandle<()>,
}

impl fmt::Debug for FiltersApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiltersApi")
            .field("config", &self.registry.config)
            .field("filters", &self.registry.filters.read().len())
            .finish()
    }
}

impl Drop for FiltersApi {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}

impl FiltersApi {
    /// Creates the registry and starts its reaper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(backend: Arc<Backend>, subscriber: Arc<EventSubscriber>, config: FiltersConfig) -> Self {
        let registry = Arc::new(Registry {
            backend,
            subscriber,
            config,
            filters: RwLock::new(HashMap::new()),
        });
        let reaper = tokio::spawn(reap(Arc::downgrade(&registry), config.filter_timeout));
        Self { registry, reaper }
    }

    /// Returns the backend answering historical queries.
    pub fn backend(&self) -> &Arc<Backend> {
        &self.registry.backend
    }

    /// Returns the number of live filters.
    pub fn len(&self) -> usize {
        self.registry.filters.read().len()
    }

    /// Returns true if no filter is installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Installs a filter collecting logs matching `criteria`.
    pub async fn new_filter(&self, criteria: FilterCriteria) -> Result<SubscriptionId, RpcError> {
        self.check_cap()?;
        let subscription = self.registry.subscriber.subscribe_logs(&criteria).await?;
        self.install(FilterKind::Logs, criteria, subscription)
    }

    /// Installs a filter collecting hashes of new blocks.
    pub async fn new_block_filter(&self) -> Result<SubscriptionId, RpcError> {
        self.check_cap()?;
        let subscription = self.registry.subscriber.subscribe_new_heads().await?;
        self.install(FilterKind::Blocks, FilterCriteria::default(), subscription)
    }

    /// Installs a filter collecting hashes of new Ethereum transactions.
    pub async fn new_pending_transaction_filter(&self) -> Result<SubscriptionId, RpcError> {
        self.check_cap()?;
        let subscription = self.registry.subscriber.subscribe_pending_txs().await?;
        self.install(FilterKind::PendingTransactions, FilterCriteria::default(), subscription)
    }

    /// Drains the changes collected since the last poll.
    pub fn get_filter_changes(&self, id: &SubscriptionId) -> Result<FilterChanges, RpcError> {
        let filter = self.registry.get(id)?;
        let mut changes = filter.changes.lock();
        changes.deadline = Instant::now() + self.registry.config.filter_timeout;

        Ok(match filter.kind {
            FilterKind::Blocks | FilterKind::PendingTransactions => {
                FilterChanges::Hashes(mem::take(&mut changes.hashes))
            }
            FilterKind::Logs => FilterChanges::Logs(mem::take(&mut changes.logs)),
        })
    }

    /// Runs the historical scan of a logs filter's criteria.
    pub async fn get_filter_logs(&self, id: &SubscriptionId) -> Result<Vec<RpcLog>, RpcError> {
        let filter = self.registry.get(id)?;
        if filter.kind != FilterKind::Logs {
            return Err(RpcError::FilterTypeMismatch {
                id: id.to_string(),
                expected: FilterKind::Logs.as_str(),
            });
        }
        self.registry.backend.get_logs(&filter.criteria).await
    }

    /// Removes a filter, returning false if it was not installed.
    pub fn uninstall_filter(&self, id: &SubscriptionId) -> bool {
        let removed = self.registry.filters.write().remove(id).is_some();
        if removed {
            debug!(%id, "filter uninstalled");
        }
        removed
    }

    /// One-shot historical log scan.
    pub async fn get_logs(&self, criteria: &FilterCriteria) -> Result<Vec<RpcLog>, RpcError> {
        self.registry.backend.get_logs(criteria).await
    }

    fn check_cap(&self) -> Result<(), RpcError> {
        if self.len() >= self.registry.config.filter_cap {
            return Err(RpcError::LimitExceeded("error creating filter: max limit reached".to_string()));
        }
        Ok(())
    }

    fn install(
        &self,
        kind: FilterKind,
        criteria: FilterCriteria,
        subscription: Subscription,
    ) -> Result<SubscriptionId, RpcError> {
        let id = subscription.id().clone();
        let changes = Arc::new(Mutex::new(Changes {
            hashes: Vec::new(),
            logs: Vec::new(),
            deadline: Instant::now() + self.registry.config.filter_timeout,
        }));

        let mut filters = self.registry.filters.write();
        if filters.len() >= self.registry.config.filter_cap {
            return Err(RpcError::LimitExceeded("error creating filter: max limit reached".to_string()));
        }

        let task = tokio::spawn(accumulate(
            Arc::downgrade(&self.registry),
            kind,
            criteria.log_filter(),
            subscription,
            Arc::clone(&changes),
        ));
        filters.insert(id.clone(), Arc::new(Filter { kind, criteria, changes, task }));
        debug!(%id, kind = kind.as_str(), "filter installed");
        Ok(id)
    }
}

async fn accumulate(
    registry: Weak<Registry>,
    kind: FilterKind,
    filter: LogFilter,
    mut subscription: Subscription,
    changes: Arc<Mutex<Changes>>,
) {
    drain(&registry, kind, &filter, &mut subscription, &changes).await;

    if let Some(registry) = registry.upgrade()
        && registry.filters.write().remove(subscription.id()).is_some()
    {
        debug!(id = %subscription.id(), "removed filter with ended subscription");
    }
}

async fn drain(
    registry: &Weak<Registry>,
    kind: FilterKind,
    filter: &LogFilter,
    subscription: &mut Subscription,
    changes: &Mutex<Changes>,
) {
    while let Some(event) = subscription.recv().await {
        match (kind, event.data) {
            (FilterKind::Blocks, EventData::NewBlockHeader(data)) => {
                changes.lock().hashes.push(data.header.hash);
            }
            (FilterKind::PendingTransactions, EventData::Tx(data)) => {
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                let hashes = registry.backend.eth_hashes_from_tx_event(&data);
                changes.lock().hashes.extend(hashes);
            }
            (FilterKind::Logs, EventData::Tx(data)) => match Backend::logs_from_tx_event(&data) {
                Ok(logs) => {
                    let matched = filter_logs(&logs, filter);
                    changes.lock().logs.extend(matched);
                }
                Err(err) => {
                    error!(id = %subscription.id(), height = data.height, error = %err, "failed to parse tx logs");
                    return;
                }
            },
            (kind, _) => debug!(id = %subscription.id(), kind = kind.as_str(), "unexpected event type"),
        }
    }
    debug!(id = %subscription.id(), "filter subscription closed");
}

async fn reap(registry: Weak<Registry>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(registry) = registry.upgrade() else {
            break;
        };
        let removed = registry.remove_expired(Instant::now());
        if removed > 0 {
            info!(removed, "reaped inactive filters");
        }
    }
}
