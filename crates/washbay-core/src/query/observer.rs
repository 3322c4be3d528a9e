use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use super::client::QueryClient;
use super::entry::QueryEntry;
use super::error::FetchError;
use super::key::QueryKey;
use super::options::QueryOptions;
use super::state::{DataState, QuerySnapshot};

/// A live observer of one cache entry, vended by
/// [`QueryClient::wrap()`].
///
/// Derives [`DataState`] on demand from the entry's latest snapshot.
/// Dropping the handle detaches the observer; once an entry has no
/// observers it becomes eligible for garbage collection after its
/// `gc_time`.
pub struct Query<T: Send + Sync + 'static> {
    client: QueryClient,
    entry: Arc<QueryEntry<T>>,
    options: QueryOptions<T>,
    rx: watch::Receiver<QuerySnapshot<T>>,
}

impl<T: Send + Sync + 'static> Query<T> {
    pub(crate) fn new(
        client: QueryClient,
        entry: Arc<QueryEntry<T>>,
        options: QueryOptions<T>,
    ) -> Self {
        let rx = entry.subscribe();
        Self {
            client,
            entry,
            options,
            rx,
        }
    }

    pub fn key(&self) -> &QueryKey {
        self.entry.key()
    }

    pub fn options(&self) -> &QueryOptions<T> {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Current state, derived now.
    pub fn state(&self) -> DataState<T> {
        let now = self.client.clock().now();
        DataState::derive(&self.rx.borrow(), &self.options, now)
    }

    /// Raw snapshot of the underlying entry.
    pub fn snapshot(&self) -> QuerySnapshot<T> {
        self.rx.borrow().clone()
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.rx.borrow().data.clone()
    }

    /// Wait for the next state transition.
    pub async fn changed(&mut self) -> Option<DataState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until no fetch is in flight, then return the state.
    pub async fn settled(&self) -> DataState<T> {
        let mut rx = self.rx.clone();
        // The sender lives in the entry, which this handle keeps alive.
        let _ = rx.wait_for(|snapshot| !snapshot.is_fetching).await;
        self.state()
    }

    /// Join the in-flight fetch, or start one.
    pub async fn fetch(&self) -> DataState<T> {
        self.entry.fetch().await;
        self.state()
    }

    /// Manual retry. Joins any fetch already in flight; otherwise starts a
    /// fetch with a fresh automatic retry budget.
    pub async fn retry(&self) -> DataState<T> {
        self.entry.retry().await;
        self.state()
    }

    /// Start a fresh fetch that supersedes whatever is in flight.
    pub async fn refetch(&self) -> DataState<T> {
        self.entry.refetch().await;
        self.state()
    }

    /// Toggle the disabling flag. Enabling fetches if the data is missing
    /// or stale.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.options.enabled = enabled;
        self.entry.set_enabled(enabled);
        if enabled {
            let _ = self.entry.fetch_if_needed(self.options.stale_time);
        }
    }

    /// Observe a different key with the same options. Results still
    /// arriving for the old key no longer reach this handle.
    pub fn set_key<F, Fut>(&mut self, key: impl Into<QueryKey>, producer: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        *self = self.client.wrap(key, producer, self.options.clone());
    }
}

impl<T: Send + Sync + 'static> Drop for Query<T> {
    fn drop(&mut self) {
        if self.entry.detach() == 0 {
            self.client.schedule_gc(
                (TypeId::of::<T>(), self.entry.key().clone()),
                self.options.gc_time,
            );
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.rx.borrow();
        f.debug_struct("Query")
            .field("key", self.entry.key())
            .field("status", &snapshot.status)
            .field("is_fetching", &snapshot.is_fetching)
            .field("enabled", &self.options.enabled)
            .finish_non_exhaustive()
    }
}
