// ── Domain model ──
//
// One canonical schema per entity. Producers, the mock repository and
// every consumer agree on these shapes; there is no per-view variant.

pub mod appointment;
pub mod dashboard;
pub mod service;

// ── Re-exports ──────────────────────────────────────────────────────

pub use appointment::{Appointment, AppointmentStatus, BookingRequest};
pub use dashboard::{DashboardMetrics, LocationWashCount};
pub use service::{Location, Service, ServiceCategory};
