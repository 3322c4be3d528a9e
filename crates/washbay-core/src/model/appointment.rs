// ── Appointments ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::query::Emptiness;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Holds a bay at its scheduled slot.
    pub fn occupies_bay(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }

    /// Counts toward wash totals and revenue.
    pub fn is_wash(self) -> bool {
        matches!(self, Self::InProgress | Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub customer_name: String,
    pub vehicle: String,
    pub service_id: String,
    pub location_id: String,
    /// Denormalized for display.
    pub location_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Emptiness for Appointment {
    fn is_empty_value(&self) -> bool {
        false
    }
}

/// Input for booking a new appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub customer_name: String,
    pub vehicle: String,
    pub service_id: String,
    pub location_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}
