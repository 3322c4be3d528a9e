use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

/// Time source for staleness checks and retry scheduling.
///
/// The query layer never calls `Utc::now()` or `tokio::time::sleep`
/// directly, so tests can substitute [`ManualClock`](crate::testing::ManualClock)
/// and assert the exact delays that were scheduled.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Wall clock backed by `chrono` and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}
