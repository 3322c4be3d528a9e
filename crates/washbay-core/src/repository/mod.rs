// ── Data access ──
//
// The async producers the query layer consumes. `Repository` is the seam a
// real backend client would implement; `MockRepository` serves seeded data
// from memory.

mod mock;
mod seed;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{
    Appointment, AppointmentStatus, BookingRequest, DashboardMetrics, Location, Service,
};

pub use mock::{FailureKind, MockRepository};

/// Narrowing for [`Repository::list_appointments`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub location_id: Option<String>,
}

impl AppointmentFilter {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            location_id: None,
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status.is_none_or(|s| appointment.status == s)
            && self
                .location_id
                .as_deref()
                .is_none_or(|id| appointment.location_id == id)
    }
}

/// Async data source for the dashboard.
pub trait Repository: Send + Sync + 'static {
    fn list_services(&self) -> impl Future<Output = Result<Vec<Service>, CoreError>> + Send;

    fn get_service(&self, id: &str) -> impl Future<Output = Result<Service, CoreError>> + Send;

    fn list_locations(&self) -> impl Future<Output = Result<Vec<Location>, CoreError>> + Send;

    fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> impl Future<Output = Result<Vec<Appointment>, CoreError>> + Send;

    fn get_appointment(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Appointment, CoreError>> + Send;

    fn book_appointment(
        &self,
        request: BookingRequest,
    ) -> impl Future<Output = Result<Appointment, CoreError>> + Send;

    fn cancel_appointment(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Appointment, CoreError>> + Send;

    fn dashboard_metrics(&self) -> impl Future<Output = Result<DashboardMetrics, CoreError>> + Send;
}
