// ── Cache entry ──
//
// One entry per (payload type, key). Owns the watch channel observers
// subscribe to, the in-flight slot that coalesces concurrent fetches, and
// the retry loop. Each fetch carries its own retry budget. Every fetch is tagged with a sequence number at issuance;
// a result older than the newest applied one is dropped on the floor.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::clock::Clock;
use super::error::FetchError;
use super::key::QueryKey;
use super::options::QueryOptions;
use super::state::{QuerySnapshot, QueryStatus, is_expired};

/// Completion handle for a fetch. Cloneable; every clone resolves once the
/// fetch has settled and its result has been applied (or discarded).
pub type FetchHandle = Shared<BoxFuture<'static, ()>>;

pub(crate) type Producer<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

/// Producer and options from the most recent `wrap()` of this entry.
pub(crate) struct EntryConfig<T> {
    pub producer: Producer<T>,
    pub options: QueryOptions<T>,
}

struct InFlight {
    seq: u64,
    done: FetchHandle,
}

pub(crate) struct QueryEntry<T: Send + Sync + 'static> {
    key: QueryKey,
    clock: Arc<dyn Clock>,
    config: ArcSwap<EntryConfig<T>>,
    snapshot: watch::Sender<QuerySnapshot<T>>,
    in_flight: Mutex<Option<InFlight>>,
    /// Last issued sequence number (fetches and direct writes).
    next_seq: AtomicU64,
    /// Sequence number of the newest fetch; only it may clear `is_fetching`.
    latest_fetch: AtomicU64,
    observers: AtomicUsize,
    detached_at: Mutex<Option<DateTime<Utc>>>,
}

impl<T: Send + Sync + 'static> QueryEntry<T> {
    pub(crate) fn new(key: QueryKey, clock: Arc<dyn Clock>, config: EntryConfig<T>) -> Self {
        let (snapshot, _) = watch::channel(QuerySnapshot::default());
        let created = clock.now();

        Self {
            key,
            clock,
            config: ArcSwap::from_pointee(config),
            snapshot,
            in_flight: Mutex::new(None),
            next_seq: AtomicU64::new(0),
            latest_fetch: AtomicU64::new(0),
            observers: AtomicUsize::new(0),
            detached_at: Mutex::new(Some(created)),
        }
    }

    pub(crate) fn key(&self) -> &QueryKey {
        &self.key
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<QuerySnapshot<T>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn snapshot(&self) -> QuerySnapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Replace the producer and options with those of the latest caller.
    pub(crate) fn configure(&self, producer: Producer<T>, options: QueryOptions<T>) {
        self.config.store(Arc::new(EntryConfig { producer, options }));
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.config.rcu(|current| EntryConfig {
            producer: Arc::clone(&current.producer),
            options: current.options.clone().enabled(enabled),
        });
    }

    // ── Observers ────────────────────────────────────────────────────

    pub(crate) fn attach(&self) {
        self.observers.fetch_add(1, Ordering::SeqCst);
        *lock(&self.detached_at) = None;
    }

    /// Drop one observer. Returns how many remain.
    pub(crate) fn detach(&self) -> usize {
        let remaining = self
            .observers
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        if remaining == 0 {
            *lock(&self.detached_at) = Some(self.clock.now());
        }
        remaining
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// Join the in-flight fetch, or start one if none is running.
    pub(crate) fn fetch(self: &Arc<Self>) -> FetchHandle {
        let mut slot = lock(&self.in_flight);
        match slot.as_ref() {
            Some(running) => running.done.clone(),
            None => self.start(&mut slot),
        }
    }

    /// Start a fetch only if the entry is enabled, idle, and its data is
    /// missing or stale. Joins the in-flight fetch if there is one.
    pub(crate) fn fetch_if_needed(self: &Arc<Self>, stale_time: Duration) -> Option<FetchHandle> {
        let mut slot = lock(&self.in_flight);
        if let Some(running) = slot.as_ref() {
            return Some(running.done.clone());
        }
        if !self.config.load().options.enabled {
            return None;
        }

        let now = self.clock.now();
        let needed = {
            let snap = self.snapshot.borrow();
            snap.data.is_none()
                || snap.invalidated
                || is_expired(snap.last_updated, stale_time, now)
        };
        needed.then(|| self.start(&mut slot))
    }

    /// Issue a new fetch that supersedes any in-flight one.
    pub(crate) fn refetch(self: &Arc<Self>) -> FetchHandle {
        let mut slot = lock(&self.in_flight);
        self.start(&mut slot)
    }

    /// Manual retry. Joins the in-flight fetch, or starts one with a full
    /// retry budget.
    pub(crate) fn retry(self: &Arc<Self>) -> FetchHandle {
        debug!(key = %self.key, "manual retry");
        self.fetch()
    }

    /// Mark stale. Observed, enabled entries refetch immediately.
    pub(crate) fn invalidate(self: &Arc<Self>) -> Option<FetchHandle> {
        self.snapshot.send_modify(|s| s.invalidated = true);
        let observed = self.observers.load(Ordering::SeqCst) > 0;
        (observed && self.config.load().options.enabled).then(|| self.refetch())
    }

    /// Write `data` directly, as if a fetch had just succeeded.
    pub(crate) fn set_data(&self, data: T) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.clock.now();
        let data = Arc::new(data);
        self.snapshot.send_modify(|s| {
            s.status = QueryStatus::Success;
            s.data = Some(data);
            s.error = None;
            s.last_updated = Some(now);
            s.invalidated = false;
            s.failure_count = 0;
            s.applied_seq = seq;
        });
    }

    // ── Internals ────────────────────────────────────────────────────

    fn start(self: &Arc<Self>, slot: &mut Option<InFlight>) -> FetchHandle {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest_fetch.store(seq, Ordering::SeqCst);
        self.snapshot.send_modify(|s| s.is_fetching = true);
        debug!(key = %self.key, seq, "starting fetch");

        let entry = Arc::clone(self);
        let task = tokio::spawn(async move { entry.run(seq).await });

        let key = self.key.clone();
        let done: FetchHandle = async move {
            if let Err(e) = task.await {
                warn!(key = %key, error = %e, "fetch task aborted");
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            seq,
            done: done.clone(),
        });
        done
    }

    async fn run(self: Arc<Self>, seq: u64) {
        let outcome = AssertUnwindSafe(self.execute())
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(FetchError::new("query producer panicked")));
        self.settle(seq, outcome);
    }

    /// Invoke the producer, retrying per the current policy. The retry
    /// budget belongs to this fetch alone.
    async fn execute(&self) -> Result<T, FetchError> {
        let mut attempts_made = 0u32;
        loop {
            let config = self.config.load_full();
            let err = match (config.producer)().await {
                Ok(data) => return Ok(data),
                Err(err) => err,
            };

            if !config.options.retry.should_retry(&err, attempts_made) {
                debug!(
                    key = %self.key,
                    class = %err.class(),
                    attempts_made,
                    error = %err,
                    "fetch failed, not retrying"
                );
                return Err(err);
            }

            let attempt = attempts_made + 1;
            let delay = config.options.retry.delay_for(attempts_made);
            self.snapshot.send_modify(|s| s.failure_count += 1);
            config.options.notify_retry(&self.key, attempt);
            debug!(
                key = %self.key,
                attempt,
                delay_ms = delay.as_millis(),
                error = %err,
                "scheduling retry"
            );

            self.clock.sleep(delay).await;
            attempts_made += 1;
        }
    }

    /// Apply a finished fetch unless a newer result already landed.
    fn settle(&self, seq: u64, outcome: Result<T, FetchError>) {
        {
            let mut slot = lock(&self.in_flight);
            if slot.as_ref().is_some_and(|running| running.seq == seq) {
                *slot = None;
            }
        }

        let now = self.clock.now();
        let outcome = outcome.map(Arc::new);
        let mut applied = false;

        self.snapshot.send_if_modified(|s| {
            let is_latest = self.latest_fetch.load(Ordering::SeqCst) == seq;
            if is_latest {
                s.is_fetching = false;
            }
            if seq < s.applied_seq {
                return is_latest;
            }

            applied = true;
            s.applied_seq = seq;
            match &outcome {
                Ok(data) => {
                    s.status = QueryStatus::Success;
                    s.data = Some(Arc::clone(data));
                    s.error = None;
                    s.last_updated = Some(now);
                    s.invalidated = false;
                    s.failure_count = 0;
                }
                Err(err) => {
                    s.status = QueryStatus::Error;
                    s.error = Some(err.clone());
                    s.failure_count += 1;
                }
            }
            true
        });

        if !applied {
            debug!(key = %self.key, seq, "discarding superseded fetch result");
            return;
        }

        let config = self.config.load();
        match &outcome {
            Ok(data) => {
                debug!(key = %self.key, seq, "fetch succeeded");
                config.options.notify_success(&self.key, data);
            }
            Err(err) => {
                warn!(key = %self.key, seq, error = %err, "fetch failed");
                config.options.notify_error(&self.key, err);
            }
        }
    }
}

// ── Type-erased view for the client's entry table ───────────────────

pub(crate) trait ErasedEntry: Send + Sync {
    fn key(&self) -> &QueryKey;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn invalidate_erased(self: Arc<Self>);

    fn observer_count(&self) -> usize;

    /// Unobserved, idle, and detached for at least the GC window.
    fn is_collectable(&self, now: DateTime<Utc>) -> bool;
}

impl<T: Send + Sync + 'static> ErasedEntry for QueryEntry<T> {
    fn key(&self) -> &QueryKey {
        &self.key
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn invalidate_erased(self: Arc<Self>) {
        let _ = self.invalidate();
    }

    fn observer_count(&self) -> usize {
        self.observers.load(Ordering::SeqCst)
    }

    fn is_collectable(&self, now: DateTime<Utc>) -> bool {
        if self.observer_count() > 0 || lock(&self.in_flight).is_some() {
            return false;
        }
        let gc_time = self.config.load().options.gc_time;
        lock(&self.detached_at).is_some_and(|since| {
            chrono::Duration::from_std(gc_time)
                .is_ok_and(|window| now.signed_duration_since(since) >= window)
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
