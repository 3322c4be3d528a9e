// ── Test support ──
//
// Deterministic time for exercising retry and staleness without waiting.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::query::Clock;

/// A [`Clock`] that never waits.
///
/// Every `sleep` is recorded and resolves immediately. Time moves only
/// through [`advance()`](Self::advance), so staleness checks see exactly
/// the instant the test set up.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                now: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(step) = chrono::Duration::from_std(by) {
            state.now += step;
        }
    }

    /// Every delay requested so far, in request order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sleeps
            .clone()
    }

    /// Requested delays, in milliseconds.
    pub fn sleeps_ms(&self) -> Vec<u128> {
        self.sleeps().iter().map(Duration::as_millis).collect()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).now
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sleeps
            .push(duration);
        futures_util::future::ready(()).boxed()
    }
}
