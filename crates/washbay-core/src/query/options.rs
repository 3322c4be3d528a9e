// ── Query options ──
//
// Per-query configuration with explicit defaults. Builder methods consume
// and return `self`, so call sites read as a chain off `default()`.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::error::FetchError;
use super::key::QueryKey;
use super::retry::RetryPolicy;
use super::state::Emptiness;

type EmptyChecker<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;
type RetryCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Process-wide defaults a [`QueryClient`](super::QueryClient) hands to
/// every query it builds options for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDefaults {
    pub retry_attempts: u32,
    pub retry_delay_base: Duration,
    pub stale_time: Duration,
    pub gc_time: Duration,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay_base: Duration::from_millis(1000),
            stale_time: Duration::from_millis(300_000),
            gc_time: Duration::from_millis(300_000),
        }
    }
}

/// Options recognized by [`QueryClient::wrap()`](super::QueryClient::wrap).
pub struct QueryOptions<T> {
    pub retry: RetryPolicy,
    /// Freshness window. Older data reports `is_stale`.
    pub stale_time: Duration,
    /// How long an unobserved entry survives before garbage collection.
    pub gc_time: Duration,
    /// Disabled queries never fetch on their own.
    pub enabled: bool,
    empty_checker: EmptyChecker<T>,
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
    on_retry: Option<RetryCallback>,
}

impl<T: Emptiness + 'static> Default for QueryOptions<T> {
    fn default() -> Self {
        Self::with_empty_checker(T::is_empty_value)
    }
}

impl<T: Emptiness + 'static> QueryOptions<T> {
    /// Default options tuned by process-wide `defaults`.
    pub fn from_defaults(defaults: &QueryDefaults) -> Self {
        Self::default().apply_defaults(defaults)
    }
}

impl<T> QueryOptions<T> {
    /// Default options for payloads without a natural notion of emptiness.
    pub fn with_empty_checker(checker: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        let defaults = QueryDefaults::default();
        Self {
            retry: RetryPolicy {
                attempts: defaults.retry_attempts,
                base_delay: defaults.retry_delay_base,
                ..RetryPolicy::default()
            },
            stale_time: defaults.stale_time,
            gc_time: defaults.gc_time,
            enabled: true,
            empty_checker: Arc::new(checker),
            on_success: None,
            on_error: None,
            on_retry: None,
        }
    }

    pub fn apply_defaults(mut self, defaults: &QueryDefaults) -> Self {
        self.retry.attempts = defaults.retry_attempts;
        self.retry.base_delay = defaults.retry_delay_base;
        self.stale_time = defaults.stale_time;
        self.gc_time = defaults.gc_time;
        self
    }

    // ── Builder ──────────────────────────────────────────────────────

    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry.attempts = attempts;
        self
    }

    pub fn retry_delay_base(mut self, base: Duration) -> Self {
        self.retry.base_delay = base;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn stale_time(mut self, window: Duration) -> Self {
        self.stale_time = window;
        self
    }

    pub fn gc_time(mut self, window: Duration) -> Self {
        self.gc_time = window;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn empty_when(mut self, checker: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.empty_checker = Arc::new(checker);
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&FetchError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Called with the 1-based retry number before each retry delay starts.
    pub fn on_retry(mut self, callback: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    // ── Crate-internal hooks ─────────────────────────────────────────

    pub(crate) fn is_empty(&self, data: &T) -> bool {
        (self.empty_checker)(data)
    }

    pub(crate) fn notify_success(&self, key: &QueryKey, data: &T) {
        if let Some(cb) = &self.on_success {
            guarded(key, "on_success", || cb(data));
        }
    }

    pub(crate) fn notify_error(&self, key: &QueryKey, err: &FetchError) {
        if let Some(cb) = &self.on_error {
            guarded(key, "on_error", || cb(err));
        }
    }

    pub(crate) fn notify_retry(&self, key: &QueryKey, attempt: u32) {
        if let Some(cb) = &self.on_retry {
            guarded(key, "on_retry", || cb(attempt));
        }
    }
}

/// Run a user callback; a panic inside it is logged and swallowed.
fn guarded(key: &QueryKey, event: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(key = %key, event, "query callback panicked; state unaffected");
    }
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            retry: self.retry,
            stale_time: self.stale_time,
            gc_time: self.gc_time,
            enabled: self.enabled,
            empty_checker: Arc::clone(&self.empty_checker),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("retry", &self.retry)
            .field("stale_time", &self.stale_time)
            .field("gc_time", &self.gc_time)
            .field("enabled", &self.enabled)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish_non_exhaustive()
    }
}
