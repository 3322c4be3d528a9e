//! Async data layer between the washbay mock backend and UI consumers (CLI).
//!
//! This crate owns the query cache, the domain model, and the mock data
//! source for the car-wash dashboard:
//!
//! - **[`QueryClient`]**: Keyed request cache. Coalesces concurrent fetches
//!   of the same key into one producer invocation, tags every fetch with a
//!   per-key sequence number so late results never overwrite newer ones,
//!   and publishes snapshots through `tokio::sync::watch` channels.
//!
//! - **[`Query<T>`]**: Observer handle vended by [`QueryClient::wrap()`].
//!   Derives a [`DataState<T>`] (loading / error / empty / stale / data) on
//!   demand and exposes [`retry()`](Query::retry) and
//!   [`refetch()`](Query::refetch).
//!
//! - **[`RetryPolicy`]**: Exponential backoff with fail-fast classification:
//!   client (4xx) and validation errors are never retried.
//!
//! - **[`MockRepository`]**: Seeded in-memory services, locations and
//!   appointments with simulated latency and failure injection.
//!
//! - **[`DashboardQueries`]**: Stable query keys and producers for every
//!   dashboard view, plus the booking mutations that invalidate them.
//!
//! - **Domain model** ([`model`]): One canonical schema per entity.

pub mod error;
pub mod icons;
pub mod model;
pub mod queries;
pub mod query;
pub mod repository;
pub mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use icons::{Icon, IconRegistry};
pub use queries::DashboardQueries;
pub use query::{
    Clock, DataState, Emptiness, ErrorClass, FetchError, FetchHandle, Query, QueryClient,
    QueryDefaults, QueryKey, QueryOptions, QuerySnapshot, QueryStatus, RetryPolicy, SystemClock,
};
pub use repository::{AppointmentFilter, FailureKind, MockRepository, Repository};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Appointment, AppointmentStatus, BookingRequest, DashboardMetrics, Location, LocationWashCount,
    Service, ServiceCategory,
};
