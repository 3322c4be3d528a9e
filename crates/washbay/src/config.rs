//! CLI configuration -- thin wrapper around `washbay_config` shared types.
//!
//! Re-exports the shared types and builds the query layer for the active
//! profile, respecting `GlobalOpts` overrides (--latency-ms, --fail-first).

use std::sync::Arc;

use tracing::debug;

use washbay_core::{Clock, DashboardQueries, MockRepository, QueryClient, SystemClock};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use washbay_config::{
    Config, FileSettingsStore, SettingsProvider, config_path, load_config,
    load_config_or_default, save_config, settings_path,
};

/// Dashboard queries over the mock backend.
pub type Dashboard = DashboardQueries<MockRepository>;

// ── CLI-specific helpers ────────────────────────────────────────────

/// Build the repository and query client for the active profile.
///
/// CLI flag overrides take priority over profile values.
pub fn build_dashboard(config: &Config, global: &GlobalOpts) -> Result<Dashboard, CliError> {
    let resolved = config.resolve(global.profile.as_deref())?;
    let mut mock = resolved.mock;
    if let Some(latency_ms) = global.latency_ms {
        mock.latency_ms = latency_ms;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repo = if mock.seed_appointments {
        MockRepository::with_clock(Arc::clone(&clock))
    } else {
        MockRepository::catalog_only(Arc::clone(&clock))
    }
    .with_latency(mock.latency());

    if global.fail_first > 0 {
        repo.fail_next(global.fail_first, global.fail_kind);
    }

    let defaults = resolved.query.to_defaults();
    debug!(
        profile = %resolved.name,
        retry_attempts = defaults.retry_attempts,
        latency_ms = mock.latency_ms,
        "building query client"
    );

    let client = QueryClient::with_clock(defaults, clock);
    Ok(DashboardQueries::new(client, Arc::new(repo)))
}

/// Settings provider over the on-disk store.
pub fn settings_provider() -> Result<SettingsProvider, CliError> {
    Ok(SettingsProvider::load(Arc::new(
        FileSettingsStore::default_location(),
    ))?)
}
