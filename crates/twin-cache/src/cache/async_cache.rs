//! Single-flight async cache over Moka.

use std::fmt;
use std::future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as InFlightSlot;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::ops::compute::{CompResult, Op};
use tracing::{debug, warn};
use twin_core::Entry;

use crate::cache::expiry::EntryExpiry;
use crate::cache::loader::CacheLoader;
use crate::config::CacheConfig;
use crate::error::{CacheError, LoadError};
use crate::metrics::CacheMetrics;

type LoadResult<V> = Result<Entry<V>, CacheError>;
type SharedLoad<V> = Shared<BoxFuture<'static, LoadResult<V>>>;

/// A load currently running for one key.
///
/// The ticket identifies the load: its result is stored only while the
/// ticket is still registered. `put` and `invalidate` unregister it.
struct InFlight<V> {
    ticket: u64,
    load: SharedLoad<V>,
}

struct Inner<K, V> {
    name: String,
    store: Cache<K, Entry<V>>,
    in_flight: DashMap<K, InFlight<V>>,
    loader: Arc<dyn CacheLoader<K, V>>,
    load_timeout: Duration,
    next_ticket: AtomicU64,
    metrics: CacheMetrics,
}

/// Async key-value cache with single-flight loading.
///
/// On a miss the [`CacheLoader`] runs once per key no matter how many
/// callers ask concurrently; every caller receives the same outcome. Loads
/// run as detached tasks, so a caller that gives up does not cancel the load
/// for the others. Failed loads are reported to all waiters and never stored.
///
/// Slot lifetimes follow the [`Entry`] state: permanent entries never expire,
/// existent and nonexistent entries fall back to the configured lifetimes
/// unless they carry their own deadline.
///
/// `put` and `invalidate` take effect over any load in flight for the same
/// key: the load's result still reaches its waiters but is not stored.
///
/// # Examples
///
/// ```no_run
/// use twin_cache::cache::{AsyncCache, loader_fn};
/// use twin_cache::{CacheConfig, LoadError};
/// use twin_core::Entry;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), twin_cache::CacheError> {
/// let cache: AsyncCache<String, usize> = AsyncCache::new(
///     "lengths",
///     &CacheConfig::default(),
///     loader_fn(|key: String| async move { Ok::<_, LoadError>(Entry::existent(key.len(), None)) }),
/// );
///
/// let entry = cache.get(&"thing".to_string()).await?;
/// assert_eq!(entry.value(), Some(&5));
/// # Ok(())
/// # }
/// ```
pub struct AsyncCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for AsyncCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Hash + Eq, V> fmt::Debug for AsyncCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCache")
            .field("name", &self.inner.name)
            .field("entries", &self.inner.store.entry_count())
            .field("in_flight", &self.inner.in_flight.len())
            .finish()
    }
}

impl<K, V> AsyncCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache named `name` (used in logs and metric labels).
    pub fn new<L>(name: impl Into<String>, config: &CacheConfig, loader: L) -> Self
    where
        L: CacheLoader<K, V> + 'static,
    {
        Self::with_loader(name, config, Arc::new(loader))
    }

    /// Creates a cache over a shared loader.
    pub fn with_loader(
        name: impl Into<String>,
        config: &CacheConfig,
        loader: Arc<dyn CacheLoader<K, V>>,
    ) -> Self {
        let name = name.into();
        let metrics = CacheMetrics::new(&name);

        let eviction_metrics = metrics.clone();
        let store = Cache::builder()
            .name(&name)
            .max_capacity(config.maximum_size())
            .expire_after(EntryExpiry::new(config))
            .eviction_listener(move |_key, _value, cause| {
                let reason = match cause {
                    RemovalCause::Expired => "ttl",
                    RemovalCause::Size => "capacity",
                    RemovalCause::Explicit => "manual",
                    RemovalCause::Replaced => "replaced",
                };
                eviction_metrics.record_eviction(reason);
            })
            .build();

        Self {
            inner: Arc::new(Inner {
                name,
                store,
                in_flight: DashMap::new(),
                loader,
                load_timeout: config.load_timeout(),
                next_ticket: AtomicU64::new(0),
                metrics,
            }),
        }
    }

    /// Returns the entry for `key`, loading it on a miss.
    ///
    /// Concurrent misses on the same key share one load.
    pub async fn get(&self, key: &K) -> Result<Entry<V>, CacheError> {
        let start = Instant::now();

        loop {
            if let Some(entry) = self.inner.store.get(key).await {
                self.inner.metrics.record_hit();
                self.inner
                    .metrics
                    .record_operation_duration("get_hit", start.elapsed());
                return Ok(entry);
            }

            // None: a load stored its result after the lookup above
            let Some(load) = self.join_or_start_load(key) else {
                continue;
            };

            self.inner.metrics.record_miss();
            let result = load.await;
            self.inner
                .metrics
                .record_operation_duration("get_miss", start.elapsed());
            return result;
        }
    }

    /// Returns the stored entry for `key` without loading.
    pub async fn get_if_present(&self, key: &K) -> Option<Entry<V>> {
        self.inner.store.get(key).await
    }

    /// Stores `entry` under `key`, superseding any load in flight for it.
    pub async fn put(&self, key: K, entry: Entry<V>) {
        let in_flight = &self.inner.in_flight;
        self.inner
            .store
            .entry_by_ref(&key)
            .and_compute_with(|_| {
                in_flight.remove(&key);
                future::ready(Op::Put(entry))
            })
            .await;

        debug!(cache = %self.inner.name, key = %key, "Cache entry stored");
        self.update_entry_gauge();
    }

    /// Replaces the entry for `key` only if one is stored and `predicate`
    /// accepts it. The check and the write are atomic for the key.
    ///
    /// Returns true if the entry was replaced.
    pub async fn replace_if<P>(&self, key: &K, entry: Entry<V>, predicate: P) -> bool
    where
        P: FnOnce(&Entry<V>) -> bool + Send,
    {
        let outcome = self
            .inner
            .store
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let accepted = current.as_ref().is_some_and(|c| predicate(c.value()));
                future::ready(if accepted { Op::Put(entry) } else { Op::Nop })
            })
            .await;

        matches!(outcome, CompResult::ReplacedWith(_))
    }

    /// Removes the entry for `key`. A load in flight for it completes for its
    /// waiters but its result is discarded.
    pub async fn invalidate(&self, key: &K) {
        let in_flight = &self.inner.in_flight;
        self.inner
            .store
            .entry_by_ref(key)
            .and_compute_with(|_| {
                in_flight.remove(key);
                future::ready(Op::Remove)
            })
            .await;

        debug!(cache = %self.inner.name, key = %key, "Cache entry invalidated");
        self.update_entry_gauge();
    }

    /// Removes every entry and discards the results of all loads in flight.
    pub fn invalidate_all(&self) {
        self.inner.in_flight.clear();
        self.inner.store.invalidate_all();
        self.update_entry_gauge();
    }

    /// Snapshot of the stored keys.
    pub fn keys(&self) -> Vec<K> {
        self.inner.store.iter().map(|(key, _)| (*key).clone()).collect()
    }

    /// Snapshot of the keys with a load currently running.
    pub(crate) fn keys_in_flight(&self) -> Vec<K> {
        self.inner.in_flight.iter().map(|load| load.key().clone()).collect()
    }

    /// Approximate number of stored entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.store.entry_count()
    }

    /// Number of keys with a load currently running.
    pub fn loads_in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Runs pending maintenance (expirations, evictions, counters).
    pub async fn run_pending_tasks(&self) {
        self.inner.store.run_pending_tasks().await;
        self.update_entry_gauge();
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.inner.metrics
    }

    /// Joins the load in flight for `key` or starts one.
    ///
    /// A finished load stores its entry before unregistering its ticket, so a
    /// vacant slot with a stored entry means that load completed after the
    /// caller's miss. Returns `None` in that case.
    fn join_or_start_load(&self, key: &K) -> Option<SharedLoad<V>> {
        match self.inner.in_flight.entry(key.clone()) {
            InFlightSlot::Occupied(slot) => {
                debug!(cache = %self.inner.name, key = %key, "Joining in-flight load");
                Some(slot.get().load.clone())
            },
            InFlightSlot::Vacant(_) if self.inner.store.contains_key(key) => None,
            InFlightSlot::Vacant(slot) => {
                let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
                debug!(cache = %self.inner.name, key = %key, ticket, "Starting load");
                let load = Inner::spawn_load(&self.inner, key.clone(), ticket);
                slot.insert(InFlight {
                    ticket,
                    load: load.clone(),
                });
                Some(load)
            },
        }
    }

    fn update_entry_gauge(&self) {
        self.inner
            .metrics
            .update_entry_count(self.inner.store.entry_count());
    }
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone + fmt::Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn spawn_load(self: &Arc<Self>, key: K, ticket: u64) -> SharedLoad<V> {
        self.metrics.record_load();

        let label = key.to_string();
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = inner.run_loader(&key).await;
            inner.complete_load(key, ticket, &result).await;
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(CacheError::aborted(label, e.to_string())))
        }
        .boxed()
        .shared()
    }

    async fn run_loader(&self, key: &K) -> LoadResult<V> {
        let load = AssertUnwindSafe(self.loader.load(key)).catch_unwind();

        match tokio::time::timeout(self.load_timeout, load).await {
            Ok(Ok(Ok(entry))) => Ok(entry),
            Ok(Ok(Err(e))) => Err(self.load_failed(key, e)),
            Ok(Err(_)) => {
                warn!(cache = %self.name, key = %key, "Loader panicked");
                self.metrics.record_load_failure("panic");
                Err(CacheError::aborted(key, "loader panicked"))
            },
            Err(_) => {
                warn!(
                    cache = %self.name,
                    key = %key,
                    timeout = ?self.load_timeout,
                    "Load timed out"
                );
                self.metrics.record_load_failure("timeout");
                Err(CacheError::timeout(key, self.load_timeout))
            },
        }
    }

    fn load_failed(&self, key: &K, error: LoadError) -> CacheError {
        warn!(
            cache = %self.name,
            key = %key,
            error = %error,
            transient = error.is_transient(),
            "Load failed"
        );
        self.metrics.record_load_failure("error");
        CacheError::load(key, error)
    }

    /// Stores a successful result if the load was not superseded, then
    /// unregisters the ticket.
    async fn complete_load(&self, key: K, ticket: u64, result: &LoadResult<V>) {
        if let Ok(entry) = result {
            let entry = entry.clone();
            let in_flight = &self.in_flight;
            let outcome = self
                .store
                .entry_by_ref(&key)
                .and_compute_with(|_| {
                    let current = in_flight.get(&key).is_some_and(|load| load.ticket == ticket);
                    future::ready(if current { Op::Put(entry) } else { Op::Nop })
                })
                .await;

            if matches!(outcome, CompResult::Unchanged(_) | CompResult::StillNone(_)) {
                debug!(cache = %self.name, key = %key, ticket, "Discarding superseded load result");
            }
        }

        self.in_flight.remove_if(&key, |_, load| load.ticket == ticket);
        self.metrics.update_entry_count(self.store.entry_count());
    }
}
