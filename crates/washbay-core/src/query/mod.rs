// ── Query layer ──
//
// Keyed async request cache with coalescing, retry/backoff, staleness
// tracking, and issuance-ordered result application.

mod client;
mod clock;
mod entry;
mod error;
mod key;
mod observer;
mod options;
mod retry;
mod state;

pub use client::QueryClient;
pub use clock::{Clock, SystemClock};
pub use error::{ErrorClass, FetchError};
pub use entry::FetchHandle;
pub use key::QueryKey;
pub use observer::Query;
pub use options::{QueryDefaults, QueryOptions};
pub use retry::RetryPolicy;
pub use state::{DataState, Emptiness, QuerySnapshot, QueryStatus};
