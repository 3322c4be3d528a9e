// ── Query state ──
//
// `QuerySnapshot` is what a cache entry publishes; `DataState` is what a
// consumer renders. The flags on `DataState` are always derived from a
// snapshot, never stored.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use super::error::FetchError;
use super::options::QueryOptions;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// No fetch has settled yet.
    #[default]
    Pending,
    /// The most recently applied fetch succeeded.
    Success,
    /// The most recently applied fetch failed after exhausting retries.
    Error,
}

/// Raw per-entry state, broadcast to observers on every transition.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
    pub status: QueryStatus,
    /// Last successful payload. Survives later failures.
    pub data: Option<Arc<T>>,
    /// Last failure. Cleared by the next success.
    pub error: Option<FetchError>,
    /// Set only on success.
    pub last_updated: Option<DateTime<Utc>>,
    pub is_fetching: bool,
    /// Explicitly marked stale through invalidation.
    pub invalidated: bool,
    /// Failed attempts since the last success.
    pub failure_count: u32,
    /// Sequence number of the most recently applied result.
    pub applied_seq: u64,
}

impl<T> Default for QuerySnapshot<T> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            last_updated: None,
            is_fetching: false,
            invalidated: false,
            failure_count: 0,
            applied_seq: 0,
        }
    }
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            last_updated: self.last_updated,
            is_fetching: self.is_fetching,
            invalidated: self.invalidated,
            failure_count: self.failure_count,
            applied_seq: self.applied_seq,
        }
    }
}

/// Uniform view of an async load, ready for rendering.
#[derive(Debug, Serialize)]
pub struct DataState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<FetchError>,
    pub is_loading: bool,
    pub is_error: bool,
    pub is_fetching: bool,
    pub is_empty: bool,
    pub is_stale: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Clone for DataState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            is_error: self.is_error,
            is_fetching: self.is_fetching,
            is_empty: self.is_empty,
            is_stale: self.is_stale,
            last_updated: self.last_updated,
        }
    }
}

impl<T> DataState<T> {
    /// Derive the consumer view of `snapshot` as of `now`.
    pub fn derive(
        snapshot: &QuerySnapshot<T>,
        options: &QueryOptions<T>,
        now: DateTime<Utc>,
    ) -> Self {
        let is_fetching = snapshot.is_fetching;
        let is_loading = snapshot.status == QueryStatus::Pending && is_fetching;
        let is_error = snapshot.status == QueryStatus::Error;

        let is_empty = !is_loading
            && !is_error
            && snapshot
                .data
                .as_deref()
                .is_none_or(|data| options.is_empty(data));

        let is_stale =
            snapshot.invalidated || is_expired(snapshot.last_updated, options.stale_time, now);

        Self {
            data: snapshot.data.clone(),
            error: snapshot.error.clone(),
            is_loading,
            is_error,
            is_fetching,
            is_empty,
            is_stale,
            last_updated: snapshot.last_updated,
        }
    }

    /// Age of the data as of `now`, or `None` if never loaded.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_updated.map(|t| now - t)
    }
}

/// `true` when `last_updated` is set and older than `window` as of `now`.
pub(crate) fn is_expired(
    last_updated: Option<DateTime<Utc>>,
    window: Duration,
    now: DateTime<Utc>,
) -> bool {
    last_updated.is_some_and(|updated| {
        chrono::Duration::from_std(window)
            .is_ok_and(|window| now.signed_duration_since(updated) > window)
    })
}

// ── Emptiness ────────────────────────────────────────────────────────

/// Default emptiness predicate for query payloads.
///
/// Collections and strings are empty at zero length, `Option` when `None`
/// or when its content is empty, `bool` when `false`, numbers at zero.
pub trait Emptiness {
    fn is_empty_value(&self) -> bool;
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for [T] {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for VecDeque<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> Emptiness for HashMap<K, V, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Emptiness for BTreeMap<K, V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T, S> Emptiness for HashSet<T, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for BTreeSet<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for String {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for str {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for bool {
    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl<T: Emptiness> Emptiness for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.as_ref().is_none_or(Emptiness::is_empty_value)
    }
}

impl<T: Emptiness + ?Sized> Emptiness for Arc<T> {
    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<T: Emptiness + ?Sized> Emptiness for Box<T> {
    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

macro_rules! zero_is_empty {
    ($($ty:ty),*) => {
        $(impl Emptiness for $ty {
            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        })*
    };
}

zero_is_empty!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-14T09:00:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    }

    fn loaded<T>(data: T, updated: DateTime<Utc>) -> QuerySnapshot<T> {
        QuerySnapshot {
            status: QueryStatus::Success,
            data: Some(Arc::new(data)),
            last_updated: Some(updated),
            applied_seq: 1,
            ..QuerySnapshot::default()
        }
    }

    #[test]
    fn empty_list_is_empty() {
        let opts = QueryOptions::<Vec<u32>>::default();
        let state = DataState::derive(&loaded(Vec::new(), now()), &opts, now());
        assert!(state.is_empty);
        assert!(!state.is_loading);
    }

    #[test]
    fn non_empty_list_is_not_empty() {
        let opts = QueryOptions::<Vec<u32>>::default();
        let state = DataState::derive(&loaded(vec![1], now()), &opts, now());
        assert!(!state.is_empty);
    }

    #[test]
    fn loading_is_never_empty() {
        let opts = QueryOptions::<Vec<u32>>::default();
        let snap = QuerySnapshot {
            is_fetching: true,
            data: Some(Arc::new(Vec::new())),
            ..QuerySnapshot::default()
        };
        let state = DataState::derive(&snap, &opts, now());
        assert!(state.is_loading);
        assert!(!state.is_empty);
    }

    #[test]
    fn errored_is_never_empty() {
        let opts = QueryOptions::<Vec<u32>>::default();
        let snap = QuerySnapshot {
            status: QueryStatus::Error,
            error: Some(FetchError::new("down")),
            ..QuerySnapshot::default()
        };
        let state = DataState::derive(&snap, &opts, now());
        assert!(state.is_error);
        assert!(!state.is_empty);
    }

    #[test]
    fn idle_without_data_is_empty() {
        let opts = QueryOptions::<Vec<u32>>::default();
        let state = DataState::derive(&QuerySnapshot::default(), &opts, now());
        assert!(state.is_empty);
        assert!(!state.is_loading);
        assert!(!state.is_stale);
    }

    #[test]
    fn custom_empty_checker_overrides_default() {
        let opts = QueryOptions::<Vec<u32>>::default().empty_when(|v| v.iter().all(|n| *n == 0));
        let state = DataState::derive(&loaded(vec![0, 0], now()), &opts, now());
        assert!(state.is_empty);
    }

    #[test]
    fn data_older_than_window_is_stale() {
        let opts = QueryOptions::<Vec<u32>>::default().stale_time(Duration::from_millis(300_000));
        let updated = now() - chrono::Duration::milliseconds(400_000);
        let state = DataState::derive(&loaded(vec![1], updated), &opts, now());
        assert!(state.is_stale);
    }

    #[test]
    fn fresh_data_is_not_stale() {
        let opts = QueryOptions::<Vec<u32>>::default().stale_time(Duration::from_millis(300_000));
        let state = DataState::derive(&loaded(vec![1], now()), &opts, now());
        assert!(!state.is_stale);
    }

    #[test]
    fn invalidation_alone_marks_stale() {
        let opts = QueryOptions::<Vec<u32>>::default();
        let mut snap = loaded(vec![1], now());
        snap.invalidated = true;
        let state = DataState::derive(&snap, &opts, now());
        assert!(state.is_stale);
        // Staleness never hides data.
        assert_eq!(state.data.as_deref(), Some(&vec![1]));
    }

    #[test]
    fn error_and_data_coexist() {
        let opts = QueryOptions::<Vec<u32>>::default();
        let mut snap = loaded(vec![7], now());
        snap.status = QueryStatus::Error;
        snap.error = Some(FetchError::new("refresh failed"));
        let state = DataState::derive(&snap, &opts, now());
        assert!(state.is_error);
        assert!(state.data.is_some());
    }

    #[test]
    fn emptiness_defaults() {
        assert!(Option::<Vec<u8>>::None.is_empty_value());
        assert!(Some(Vec::<u8>::new()).is_empty_value());
        assert!(!Some(vec![1u8]).is_empty_value());
        assert!(String::new().is_empty_value());
        assert!(false.is_empty_value());
        assert!(!true.is_empty_value());
        assert!(0u64.is_empty_value());
        assert!(!3i32.is_empty_value());
    }
}
