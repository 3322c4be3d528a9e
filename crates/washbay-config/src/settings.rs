// ── UI settings ──
//
// Theme, layout and density preferences behind a storage trait. The
// provider holds the current value in an `ArcSwap` and only publishes a
// change after the store accepted it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::debug;

use crate::ConfigError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Layout {
    #[default]
    Vertical,
    Horizontal,
    Collapsed,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Density {
    #[default]
    Comfortable,
    Compact,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub density: Density,
}

impl Settings {
    /// Names accepted by [`set()`](Self::set).
    pub const KEYS: [&'static str; 3] = ["theme", "layout", "density"];

    /// Set one preference from its textual name and value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "theme" => self.theme = parse_choice::<Theme>(key, value)?,
            "layout" => self.layout = parse_choice::<Layout>(key, value)?,
            "density" => self.density = parse_choice::<Density>(key, value)?,
            other => {
                return Err(ConfigError::Validation {
                    field: other.into(),
                    reason: format!(
                        "unknown setting '{other}'. Valid keys: {}",
                        Self::KEYS.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }
}

fn parse_choice<E>(key: &str, value: &str) -> Result<E, ConfigError>
where
    E: std::str::FromStr + IntoEnumIterator + std::fmt::Display,
{
    value.parse::<E>().map_err(|_| ConfigError::Validation {
        field: key.into(),
        reason: format!(
            "expected one of {}, got '{value}'",
            E::iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
        ),
    })
}

// ── Storage ─────────────────────────────────────────────────────────

/// Where settings persist between sessions.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, ConfigError>;
    fn save(&self, settings: &Settings) -> Result<(), ConfigError>;
}

/// TOML file store. A missing file loads the defaults.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.toml` next to the config file.
    pub fn default_location() -> Self {
        Self::new(crate::settings_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(settings)?)?;
        Ok(())
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    settings: Settings,
    saves: usize,
}

impl MemorySettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                settings: initial,
                saves: 0,
            }),
        }
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).saves
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).settings)
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.settings = *settings;
        state.saves += 1;
        Ok(())
    }
}

// ── Provider ────────────────────────────────────────────────────────

/// Current settings, shared by everything that renders.
pub struct SettingsProvider {
    current: ArcSwap<Settings>,
    store: Arc<dyn SettingsStore>,
}

impl SettingsProvider {
    /// Load the initial value from `store`.
    pub fn load(store: Arc<dyn SettingsStore>) -> Result<Self, ConfigError> {
        let initial = store.load()?;
        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            store,
        })
    }

    pub fn get(&self) -> Settings {
        **self.current.load()
    }

    /// Replace the settings. The new value is published only if the store
    /// saved it.
    pub fn set(&self, settings: Settings) -> Result<(), ConfigError> {
        self.store.save(&settings)?;
        self.current.store(Arc::new(settings));
        Ok(())
    }

    /// Edit a copy of the current settings and write it through.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) -> Result<Settings, ConfigError> {
        let mut next = self.get();
        edit(&mut next);
        self.set(next)?;
        Ok(next)
    }

    /// Set one preference by name, as `settings set <key> <value>` does.
    pub fn set_value(&self, key: &str, value: &str) -> Result<Settings, ConfigError> {
        let mut next = self.get();
        next.set(key, value)?;
        self.set(next)?;
        Ok(next)
    }
}

impl std::fmt::Debug for SettingsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsProvider")
            .field("current", &self.get())
            .finish_non_exhaustive()
    }
}
