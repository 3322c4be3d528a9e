// ── Service catalog and locations ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::query::Emptiness;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ServiceCategory {
    Exterior,
    Interior,
    FullService,
    Detailing,
    Addon,
}

/// A wash package or add-on offered at every location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    /// Price in cents.
    pub price_cents: u32,
    pub duration_minutes: u32,
    /// Icon registry key, e.g. `"droplet"`.
    pub icon: String,
    /// Highlighted on the landing page.
    pub popular: bool,
}

impl Service {
    /// Price formatted as dollars, e.g. `"$24.99"`.
    pub fn price_display(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub address: String,
    /// Wash bays; caps concurrent appointments per slot.
    pub bays: u32,
}

impl Emptiness for Service {
    fn is_empty_value(&self) -> bool {
        false
    }
}

impl Emptiness for Location {
    fn is_empty_value(&self) -> bool {
        false
    }
}
