//! Shared configuration for washbay tools.
//!
//! TOML profiles layered over process-wide defaults, environment
//! overrides, and translation to `washbay_core::QueryDefaults`. The
//! persisted UI settings live in [`settings`].

pub mod settings;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use washbay_core::QueryDefaults;

pub use settings::{
    Density, FileSettingsStore, Layout, MemorySettingsStore, Settings, SettingsProvider,
    SettingsStore, Theme,
};

/// Prefix for environment overrides. `__` separates nested keys, so
/// `WASHBAY_QUERY__RETRY_ATTEMPTS=5` sets `query.retry_attempts`.
pub const ENV_PREFIX: &str = "WASHBAY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    /// Output defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Query cache tuning shared by every profile.
    #[serde(default)]
    pub query: QuerySection,

    /// Mock backend behavior.
    #[serde(default)]
    pub mock: MockSection,

    /// Named profiles overriding `query` and `mock`.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            query: QuerySection::default(),
            mock: MockSection::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuerySection {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_base_ms")]
    pub retry_delay_base_ms: u64,

    #[serde(default = "default_window_ms")]
    pub stale_time_ms: u64,

    #[serde(default = "default_window_ms")]
    pub gc_time_ms: u64,
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_base_ms: default_retry_delay_base_ms(),
            stale_time_ms: default_window_ms(),
            gc_time_ms: default_window_ms(),
        }
    }
}

impl QuerySection {
    pub fn to_defaults(&self) -> QueryDefaults {
        QueryDefaults {
            retry_attempts: self.retry_attempts,
            retry_delay_base: Duration::from_millis(self.retry_delay_base_ms),
            stale_time: Duration::from_millis(self.stale_time_ms),
            gc_time: Duration::from_millis(self.gc_time_ms),
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_base_ms() -> u64 {
    1000
}
fn default_window_ms() -> u64 {
    300_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MockSection {
    /// Simulated round-trip latency per repository call.
    #[serde(default)]
    pub latency_ms: u64,

    /// Start with the sample appointment history. Off gives an empty dashboard.
    #[serde(default = "default_seed_appointments")]
    pub seed_appointments: bool,
}

impl Default for MockSection {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            seed_appointments: default_seed_appointments(),
        }
    }
}

impl MockSection {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

fn default_seed_appointments() -> bool {
    true
}

/// A named profile. Unset fields inherit the top-level sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub query: QueryOverrides,

    #[serde(default)]
    pub mock: MockOverrides,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_base_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MockOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_appointments: Option<bool>,
}

/// Effective settings for one profile after overlaying it on the base sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub name: String,
    pub query: QuerySection,
    pub mock: MockSection,
}

impl Config {
    /// Query defaults from the base `[query]` section.
    pub fn query_defaults(&self) -> QueryDefaults {
        self.query.to_defaults()
    }

    /// Name of the profile used when none is requested.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    /// Sorted profile names, for listings and error messages.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }

    /// Overlay a profile on the base sections.
    ///
    /// An explicitly requested profile must exist. The default profile may
    /// be absent, in which case the base sections apply unchanged.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ResolvedProfile, ConfigError> {
        let name = requested.unwrap_or_else(|| self.default_profile_name());
        let mut query = self.query;
        let mut mock = self.mock;

        match self.profiles.get(name) {
            Some(profile) => {
                let q = &profile.query;
                query.retry_attempts = q.retry_attempts.unwrap_or(query.retry_attempts);
                query.retry_delay_base_ms =
                    q.retry_delay_base_ms.unwrap_or(query.retry_delay_base_ms);
                query.stale_time_ms = q.stale_time_ms.unwrap_or(query.stale_time_ms);
                query.gc_time_ms = q.gc_time_ms.unwrap_or(query.gc_time_ms);

                let m = &profile.mock;
                mock.latency_ms = m.latency_ms.unwrap_or(mock.latency_ms);
                mock.seed_appointments = m.seed_appointments.unwrap_or(mock.seed_appointments);
            }
            None if requested.is_some() => {
                let available = self.profile_names();
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_owned(),
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available.join(", ")
                    },
                });
            }
            None => {}
        }

        Ok(ResolvedProfile {
            name: name.to_owned(),
            query,
            mock,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Platform config directory for washbay.
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("com", "washbay", "washbay")
        .map_or_else(dirs_fallback, |dirs| dirs.config_dir().to_path_buf())
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where [`FileSettingsStore::default_location()`] keeps UI settings.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("washbay");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
