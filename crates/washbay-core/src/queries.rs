// ── Dashboard query bindings ──
//
// Stable keys and producers for every dashboard view, plus the booking
// mutations that invalidate them. Views call these instead of building
// keys by hand, so invalidation always hits what the views observe.

use std::sync::Arc;

use tracing::debug;

use crate::error::CoreError;
use crate::model::{Appointment, BookingRequest, DashboardMetrics, Location, Service};
use crate::query::{FetchError, Query, QueryClient, QueryKey};
use crate::repository::{AppointmentFilter, Repository};

pub const SERVICES: &str = "services";
pub const LOCATIONS: &str = "locations";
pub const APPOINTMENTS: &str = "appointments";
pub const DASHBOARD: &str = "dashboard";

pub struct DashboardQueries<R> {
    client: QueryClient,
    repo: Arc<R>,
}

impl<R> Clone for DashboardQueries<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: Repository> DashboardQueries<R> {
    pub fn new(client: QueryClient, repo: Arc<R>) -> Self {
        Self { client, repo }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    // ── Keys ─────────────────────────────────────────────────────────

    pub fn services_key() -> QueryKey {
        QueryKey::from(SERVICES)
    }

    pub fn service_key(id: &str) -> QueryKey {
        Self::services_key().child(id)
    }

    pub fn locations_key() -> QueryKey {
        QueryKey::from(LOCATIONS)
    }

    /// `["appointments", <status>]`, or `["appointments", "all"]`.
    pub fn appointments_key(filter: &AppointmentFilter) -> QueryKey {
        let mut key = QueryKey::from(APPOINTMENTS)
            .child(filter.status.map_or_else(|| "all".to_owned(), |s| s.to_string()));
        if let Some(location) = &filter.location_id {
            key = key.child(location.as_str());
        }
        key
    }

    pub fn metrics_key() -> QueryKey {
        QueryKey::from([DASHBOARD, "metrics"])
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn services(&self) -> Query<Vec<Service>> {
        let repo = Arc::clone(&self.repo);
        self.client.wrap(
            Self::services_key(),
            move || {
                let repo = Arc::clone(&repo);
                async move { repo.list_services().await.map_err(FetchError::from) }
            },
            self.client.options(),
        )
    }

    pub fn service(&self, id: &str) -> Query<Service> {
        let repo = Arc::clone(&self.repo);
        let id = id.to_owned();
        self.client.wrap(
            Self::service_key(&id),
            move || {
                let repo = Arc::clone(&repo);
                let id = id.clone();
                async move { repo.get_service(&id).await.map_err(FetchError::from) }
            },
            self.client.options(),
        )
    }

    pub fn locations(&self) -> Query<Vec<Location>> {
        let repo = Arc::clone(&self.repo);
        self.client.wrap(
            Self::locations_key(),
            move || {
                let repo = Arc::clone(&repo);
                async move { repo.list_locations().await.map_err(FetchError::from) }
            },
            self.client.options(),
        )
    }

    pub fn appointments(&self, filter: AppointmentFilter) -> Query<Vec<Appointment>> {
        let repo = Arc::clone(&self.repo);
        self.client.wrap(
            Self::appointments_key(&filter),
            move || {
                let repo = Arc::clone(&repo);
                let filter = filter.clone();
                async move {
                    repo.list_appointments(&filter)
                        .await
                        .map_err(FetchError::from)
                }
            },
            self.client.options(),
        )
    }

    pub fn metrics(&self) -> Query<DashboardMetrics> {
        let repo = Arc::clone(&self.repo);
        self.client.wrap(
            Self::metrics_key(),
            move || {
                let repo = Arc::clone(&repo);
                async move { repo.dashboard_metrics().await.map_err(FetchError::from) }
            },
            self.client.options(),
        )
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Book an appointment, then invalidate every view it can change.
    pub async fn book(&self, request: BookingRequest) -> Result<Appointment, CoreError> {
        let appointment = self.repo.book_appointment(request).await?;
        self.invalidate_bookings();
        Ok(appointment)
    }

    /// Cancel an appointment, then invalidate every view it can change.
    pub async fn cancel(&self, id: &str) -> Result<Appointment, CoreError> {
        let appointment = self.repo.cancel_appointment(id).await?;
        self.invalidate_bookings();
        Ok(appointment)
    }

    fn invalidate_bookings(&self) {
        let appointments = self.client.invalidate_prefix(APPOINTMENTS);
        let dashboard = self.client.invalidate_prefix(DASHBOARD);
        debug!(appointments, dashboard, "invalidated booking-dependent queries");
    }
}
