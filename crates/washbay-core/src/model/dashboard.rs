// ── Dashboard metrics ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::Emptiness;

/// Washes per location. The count field is `count`, everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationWashCount {
    pub location_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_washes: u32,
    pub revenue_cents: u64,
    /// Distinct customers with a scheduled or in-progress appointment.
    pub active_customers: u32,
    /// Mean review score, 0.0 to 5.0.
    pub average_rating: f32,
    pub washes_by_location: Vec<LocationWashCount>,
    pub generated_at: DateTime<Utc>,
}

impl DashboardMetrics {
    pub fn revenue_display(&self) -> String {
        format!("${}.{:02}", self.revenue_cents / 100, self.revenue_cents % 100)
    }
}

/// Nothing to chart yet.
impl Emptiness for DashboardMetrics {
    fn is_empty_value(&self) -> bool {
        self.total_washes == 0 && self.washes_by_location.iter().all(|l| l.count == 0)
    }
}
