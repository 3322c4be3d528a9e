// ── Mock backend ──
//
// Seeded in-memory tables behind the `Repository` trait, with simulated
// latency and injectable failures so the query layer's retry and error
// paths can be exercised end to end.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info};
use uuid::Uuid;

use super::{AppointmentFilter, Repository, seed};
use crate::error::CoreError;
use crate::model::{
    Appointment, AppointmentStatus, BookingRequest, DashboardMetrics, Location, LocationWashCount,
    Service,
};
use crate::query::{Clock, SystemClock};

/// Failure injected by [`MockRepository::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum FailureKind {
    /// 503. Retried by the query layer.
    Unavailable,
    /// 504. Retried by the query layer.
    Timeout,
    /// 500. Retried by the query layer.
    Internal,
    /// 422. Never retried.
    Validation,
}

impl FailureKind {
    fn into_error(self, operation: &str) -> CoreError {
        match self {
            Self::Unavailable => CoreError::Unavailable {
                message: format!("{operation}: simulated outage"),
            },
            Self::Timeout => CoreError::Timeout { timeout_ms: 5000 },
            Self::Internal => CoreError::Internal(format!("{operation}: simulated fault")),
            Self::Validation => CoreError::validation(format!("{operation}: simulated rejection")),
        }
    }
}

/// In-memory [`Repository`] over seeded data.
pub struct MockRepository {
    services: DashMap<String, Service>,
    locations: DashMap<String, Location>,
    appointments: DashMap<String, Appointment>,
    ratings: Vec<u8>,
    latency: Duration,
    failures: Mutex<VecDeque<FailureKind>>,
    /// Held from the bay-capacity check through the insert.
    booking: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRepository {
    /// Full seed: catalog, locations and appointments around now.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Full seed, timed against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let repo = Self::catalog_only(clock).with_ratings(&seed::RATINGS);
        let now = repo.clock.now();
        let locations: Vec<Location> = repo.locations.iter().map(|l| l.value().clone()).collect();
        for appointment in seed::appointments(now, &locations) {
            repo.appointments
                .insert(appointment.id.clone(), appointment);
        }
        repo
    }

    /// Services and locations only; no appointments, no ratings.
    pub fn catalog_only(clock: Arc<dyn Clock>) -> Self {
        let services = seed::services()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let locations = seed::locations()
            .into_iter()
            .map(|l| (l.id.clone(), l))
            .collect();

        Self {
            services,
            locations,
            appointments: DashMap::new(),
            ratings: Vec::new(),
            latency: Duration::ZERO,
            failures: Mutex::new(VecDeque::new()),
            booking: Mutex::new(()),
            clock,
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_ratings(mut self, ratings: &[u8]) -> Self {
        self.ratings = ratings.to_vec();
        self
    }

    /// Make the next `count` calls fail with `kind`.
    pub fn fail_next(&self, count: u32, kind: FailureKind) {
        let mut queue = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        queue.extend((0..count).map(|_| kind));
        debug!(count, %kind, "queued injected failures");
    }

    /// Injected failures not yet consumed.
    pub fn pending_failures(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Simulate the round trip: wait out the latency, then consume one
    /// injected failure if any are queued.
    async fn round_trip(&self, operation: &str) -> Result<(), CoreError> {
        if !self.latency.is_zero() {
            self.clock.sleep(self.latency).await;
        }
        let injected = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match injected {
            Some(kind) => {
                debug!(operation, %kind, "injecting failure");
                Err(kind.into_error(operation))
            }
            None => Ok(()),
        }
    }

    fn service(&self, id: &str) -> Option<Service> {
        self.services.get(id).map(|s| s.value().clone())
    }

    fn validate(&self, request: &BookingRequest) -> Result<(Service, Location), CoreError> {
        if request.customer_name.trim().is_empty() {
            return Err(CoreError::validation("customer name is required"));
        }
        if request.vehicle.trim().is_empty() {
            return Err(CoreError::validation("vehicle is required"));
        }
        let service = self
            .service(&request.service_id)
            .ok_or_else(|| CoreError::validation(format!("invalid service: {}", request.service_id)))?;
        let location = self
            .locations
            .get(&request.location_id)
            .map(|l| l.value().clone())
            .ok_or_else(|| {
                CoreError::validation(format!("invalid location: {}", request.location_id))
            })?;
        if request.scheduled_at < self.clock.now() {
            return Err(CoreError::validation("cannot book an appointment in the past"));
        }
        Ok((service, location))
    }

    /// Active appointments at `location` whose service window overlaps
    /// `[start, start + minutes)`.
    fn overlapping(&self, location_id: &str, start: DateTime<Utc>, minutes: u32) -> u32 {
        let end = start + chrono::Duration::minutes(i64::from(minutes));
        let overlapping = self
            .appointments
            .iter()
            .filter(|a| a.location_id == location_id && a.status.occupies_bay())
            .filter(|a| {
                let length = self
                    .service(&a.service_id)
                    .map_or(0, |s| s.duration_minutes);
                let other_end = a.scheduled_at + chrono::Duration::minutes(i64::from(length));
                a.scheduled_at < end && start < other_end
            })
            .count();
        u32::try_from(overlapping).unwrap_or(u32::MAX)
    }
}

impl Repository for MockRepository {
    async fn list_services(&self) -> Result<Vec<Service>, CoreError> {
        self.round_trip("list_services").await?;
        let mut services: Vec<Service> = self.services.iter().map(|s| s.value().clone()).collect();
        services.sort_by_key(|s| s.price_cents);
        Ok(services)
    }

    async fn get_service(&self, id: &str) -> Result<Service, CoreError> {
        self.round_trip("get_service").await?;
        self.service(id)
            .ok_or_else(|| CoreError::not_found("service", id))
    }

    async fn list_locations(&self) -> Result<Vec<Location>, CoreError> {
        self.round_trip("list_locations").await?;
        let mut locations: Vec<Location> =
            self.locations.iter().map(|l| l.value().clone()).collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, CoreError> {
        self.round_trip("list_appointments").await?;
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| filter.matches(a.value()))
            .map(|a| a.value().clone())
            .collect();
        appointments.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(appointments)
    }

    async fn get_appointment(&self, id: &str) -> Result<Appointment, CoreError> {
        self.round_trip("get_appointment").await?;
        self.appointments
            .get(id)
            .map(|a| a.value().clone())
            .ok_or_else(|| CoreError::not_found("appointment", id))
    }

    async fn book_appointment(&self, request: BookingRequest) -> Result<Appointment, CoreError> {
        self.round_trip("book_appointment").await?;
        let (service, location) = self.validate(&request)?;

        let _slot = self.booking.lock().unwrap_or_else(PoisonError::into_inner);
        if self.overlapping(&location.id, request.scheduled_at, service.duration_minutes)
            >= location.bays
        {
            return Err(CoreError::Conflict {
                message: format!(
                    "all {} bays at {} are booked at {}",
                    location.bays,
                    location.name,
                    request.scheduled_at.format("%Y-%m-%d %H:%M UTC")
                ),
            });
        }

        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        let appointment = Appointment {
            id: format!("apt-{id}"),
            customer_name: request.customer_name.trim().to_owned(),
            vehicle: request.vehicle.trim().to_owned(),
            service_id: service.id,
            location_id: location.id,
            location_name: location.name,
            scheduled_at: request.scheduled_at,
            status: AppointmentStatus::Scheduled,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
        };
        self.appointments
            .insert(appointment.id.clone(), appointment.clone());
        info!(id = %appointment.id, location = %appointment.location_name, "appointment booked");
        Ok(appointment)
    }

    async fn cancel_appointment(&self, id: &str) -> Result<Appointment, CoreError> {
        self.round_trip("cancel_appointment").await?;
        let mut entry = self
            .appointments
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("appointment", id))?;

        match entry.status {
            AppointmentStatus::Completed => Err(CoreError::validation(
                "completed appointments cannot be cancelled",
            )),
            AppointmentStatus::Cancelled => Ok(entry.clone()),
            AppointmentStatus::Scheduled | AppointmentStatus::InProgress => {
                entry.status = AppointmentStatus::Cancelled;
                info!(id, "appointment cancelled");
                Ok(entry.clone())
            }
        }
    }

    async fn dashboard_metrics(&self) -> Result<DashboardMetrics, CoreError> {
        self.round_trip("dashboard_metrics").await?;

        let mut locations: Vec<Location> =
            self.locations.iter().map(|l| l.value().clone()).collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));

        let mut total_washes = 0u32;
        let mut revenue_cents = 0u64;
        let mut active = HashSet::new();
        let mut by_location: Vec<LocationWashCount> = locations
            .iter()
            .map(|l| LocationWashCount {
                location_name: l.name.clone(),
                count: 0,
            })
            .collect();

        for item in &self.appointments {
            let appointment = item.value();
            if appointment.status.occupies_bay() {
                active.insert(appointment.customer_name.clone());
            }
            if !appointment.status.is_wash() {
                continue;
            }
            total_washes += 1;
            revenue_cents += self
                .service(&appointment.service_id)
                .map_or(0, |s| u64::from(s.price_cents));
            if let Some(slot) = by_location
                .iter_mut()
                .find(|l| l.location_name == appointment.location_name)
            {
                slot.count += 1;
            }
        }

        Ok(DashboardMetrics {
            total_washes,
            revenue_cents,
            active_customers: u32::try_from(active.len()).unwrap_or(u32::MAX),
            average_rating: mean_rating(&self.ratings),
            washes_by_location: by_location,
            generated_at: self.clock.now(),
        })
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn mean_rating(ratings: &[u8]) -> f32 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().copied().map(u32::from).sum();
    sum as f32 / ratings.len() as f32
}
