// ── Query client ──
//
// Owns the entry table. Entries are keyed by payload type and query key,
// stored type-erased, and downcast on access.

use std::any::TypeId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::entry::{EntryConfig, ErasedEntry, Producer, QueryEntry};
use super::error::FetchError;
use super::key::QueryKey;
use super::observer::Query;
use super::options::{QueryDefaults, QueryOptions};
use super::state::Emptiness;

pub(crate) type EntryKey = (TypeId, QueryKey);

/// Keyed async request cache.
///
/// Cheap to clone; clones share one entry table. Must be used from within
/// a tokio runtime, since fetches run as spawned tasks.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    entries: DashMap<EntryKey, Arc<dyn ErasedEntry>>,
    defaults: QueryDefaults,
    clock: Arc<dyn Clock>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        Self::with_defaults(QueryDefaults::default())
    }

    pub fn with_defaults(defaults: QueryDefaults) -> Self {
        Self::with_clock(defaults, Arc::new(SystemClock))
    }

    /// Build a client on an explicit time source.
    pub fn with_clock(defaults: QueryDefaults, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                entries: DashMap::new(),
                defaults,
                clock,
            }),
        }
    }

    pub fn defaults(&self) -> &QueryDefaults {
        &self.inner.defaults
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Default options for `T`, tuned by this client's [`QueryDefaults`].
    pub fn options<T: Emptiness + 'static>(&self) -> QueryOptions<T> {
        QueryOptions::from_defaults(&self.inner.defaults)
    }

    // ── Observing ────────────────────────────────────────────────────

    /// Observe `key`, fetching through `producer` when needed.
    ///
    /// A fetch starts only if the query is enabled, no fetch for the key is
    /// in flight, and the cached data is missing or stale. The producer and
    /// options replace those of any earlier `wrap` of the same key.
    pub fn wrap<T, F, Fut>(
        &self,
        key: impl Into<QueryKey>,
        producer: F,
        options: QueryOptions<T>,
    ) -> Query<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let key = key.into();
        let producer: Producer<T> = Arc::new(move || producer().boxed());

        let entry = self.entry_or_insert(
            &key,
            EntryConfig {
                producer: Arc::clone(&producer),
                options: options.clone(),
            },
        );
        entry.configure(producer, options.clone());
        entry.attach();

        if options.enabled {
            let _ = entry.fetch_if_needed(options.stale_time);
        }

        Query::new(self.clone(), entry, options)
    }

    // ── Direct access ────────────────────────────────────────────────

    /// Cached data for `key`, if any has been loaded.
    pub fn get_query_data<T: Send + Sync + 'static>(
        &self,
        key: impl Into<QueryKey>,
    ) -> Option<Arc<T>> {
        self.entry::<T>(&key.into())
            .and_then(|entry| entry.snapshot().data)
    }

    /// Write `data` for `key` as though a fetch had just succeeded.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: impl Into<QueryKey>, data: T) {
        let key = key.into();
        let entry = match self.entry::<T>(&key) {
            Some(entry) => entry,
            None => self.entry_or_insert(&key, self.placeholder_config(&key)),
        };
        entry.set_data(data);
        debug!(key = %key, "query data set directly");
    }

    /// Mark every entry under `key` stale. Returns how many were marked.
    pub fn invalidate(&self, key: impl Into<QueryKey>) -> usize {
        let key = key.into();
        self.invalidate_where(|candidate| *candidate == key)
    }

    /// Mark every entry whose key starts with `prefix` stale.
    pub fn invalidate_prefix(&self, prefix: impl Into<QueryKey>) -> usize {
        let prefix = prefix.into();
        self.invalidate_where(|candidate| candidate.starts_with(&prefix))
    }

    /// Drop every entry under `key`, observed or not.
    pub fn remove(&self, key: impl Into<QueryKey>) -> usize {
        let key = key.into();
        let before = self.inner.entries.len();
        self.inner.entries.retain(|(_, candidate), _| *candidate != key);
        before - self.inner.entries.len()
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    /// Drop unobserved, idle entries whose GC window has elapsed.
    pub fn gc(&self) -> usize {
        let now = self.inner.clock.now();
        let before = self.inner.entries.len();
        self.inner
            .entries
            .retain(|_, entry| !entry.is_collectable(now));
        let removed = before - self.inner.entries.len();
        if removed > 0 {
            debug!(removed, "garbage-collected query entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Distinct keys currently cached, sorted.
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .inner
            .entries
            .iter()
            .map(|item| item.key().1.clone())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Number of live observers on `key` for payload type `T`.
    pub fn observer_count<T: Send + Sync + 'static>(&self, key: impl Into<QueryKey>) -> usize {
        let key = (TypeId::of::<T>(), key.into());
        self.inner
            .entries
            .get(&key)
            .map_or(0, |entry| entry.observer_count())
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Sweep one entry after its GC window, if a runtime is available.
    pub(crate) fn schedule_gc(&self, key: EntryKey, gc_time: Duration) {
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let inner = Arc::downgrade(&self.inner);
        let wait = self.inner.clock.sleep(gc_time);

        handle.spawn(async move {
            wait.await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let now = inner.clock.now();
            if inner
                .entries
                .remove_if(&key, |_, entry| entry.is_collectable(now))
                .is_some()
            {
                debug!(key = %key.1, "garbage-collected unobserved query");
            }
        });
    }

    fn entry<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<QueryEntry<T>>> {
        let erased = Arc::clone(
            self.inner
                .entries
                .get(&(TypeId::of::<T>(), key.clone()))?
                .value(),
        );
        erased.into_any().downcast::<QueryEntry<T>>().ok()
    }

    fn entry_or_insert<T: Send + Sync + 'static>(
        &self,
        key: &QueryKey,
        config: EntryConfig<T>,
    ) -> Arc<QueryEntry<T>> {
        let clock = Arc::clone(&self.inner.clock);
        match self.inner.entries.entry((TypeId::of::<T>(), key.clone())) {
            Entry::Occupied(mut occupied) => {
                match Arc::clone(occupied.get()).into_any().downcast::<QueryEntry<T>>() {
                    Ok(existing) => existing,
                    Err(_) => {
                        let fresh = Arc::new(QueryEntry::new(key.clone(), clock, config));
                        occupied.insert(Arc::clone(&fresh) as Arc<dyn ErasedEntry>);
                        fresh
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(QueryEntry::new(key.clone(), clock, config));
                vacant.insert(Arc::clone(&fresh) as Arc<dyn ErasedEntry>);
                fresh
            }
        }
    }

    /// Config for entries created by `set_query_data` before any `wrap`.
    fn placeholder_config<T: Send + Sync + 'static>(&self, key: &QueryKey) -> EntryConfig<T> {
        let message = format!("no producer registered for query {key}");
        EntryConfig {
            producer: Arc::new(move || {
                let err = FetchError::new(message.clone());
                async move { Err::<T, FetchError>(err) }.boxed()
            }),
            options: QueryOptions::with_empty_checker(|_| false)
                .apply_defaults(&self.inner.defaults)
                .enabled(false),
        }
    }

    fn invalidate_where(&self, matches: impl Fn(&QueryKey) -> bool) -> usize {
        let targets: Vec<Arc<dyn ErasedEntry>> = self
            .inner
            .entries
            .iter()
            .filter(|item| matches(&item.key().1))
            .map(|item| Arc::clone(item.value()))
            .collect();

        let count = targets.len();
        for entry in targets {
            debug!(key = %entry.key(), "invalidating query");
            entry.invalidate_erased();
        }
        count
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.inner.entries.len())
            .field("defaults", &self.inner.defaults)
            .finish_non_exhaustive()
    }
}
