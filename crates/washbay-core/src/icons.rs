// ── Icon registry ──
//
// Maps the string icon keys carried by services and marketing content to
// renderable glyphs. Unknown keys resolve to a fallback icon instead of
// failing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

/// Key of the icon returned for unknown lookups.
pub const FALLBACK_KEY: &str = "circle";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub key: String,
    /// Terminal-safe glyph.
    pub glyph: String,
    pub label: String,
}

impl Icon {
    pub fn new(key: &str, glyph: &str, label: &str) -> Self {
        Self {
            key: key.to_owned(),
            glyph: glyph.to_owned(),
            label: label.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IconRegistry {
    icons: BTreeMap<String, Icon>,
    fallback: Icon,
}

impl Default for IconRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IconRegistry {
    /// Registry with no icons beyond the fallback.
    pub fn empty() -> Self {
        Self {
            icons: BTreeMap::new(),
            fallback: Icon::new(FALLBACK_KEY, "●", "Icon"),
        }
    }

    /// The built-in set.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (key, glyph, label) in [
            ("droplet", "💧", "Wash"),
            ("sparkles", "✨", "Shine"),
            ("car", "🚗", "Vehicle"),
            ("shield", "🛡", "Protection"),
            ("clock", "⏱", "Duration"),
            ("star", "★", "Rating"),
            ("wind", "💨", "Dry"),
            ("brush", "🖌", "Detail"),
            ("calendar", "📅", "Appointment"),
            ("map-pin", "📍", "Location"),
        ] {
            registry.register(Icon::new(key, glyph, label));
        }
        registry
    }

    /// Add or replace an icon. Keys are stored lowercase.
    pub fn register(&mut self, icon: Icon) {
        let key = icon.key.to_ascii_lowercase();
        self.icons.insert(key.clone(), Icon { key, ..icon });
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&Icon> {
        self.icons.get(&key.to_ascii_lowercase())
    }

    /// Lookup that falls back to the `circle` icon for unknown keys.
    pub fn resolve(&self, key: &str) -> &Icon {
        self.get(key).unwrap_or_else(|| {
            debug!(key, "unknown icon key, using fallback");
            &self.fallback
        })
    }

    pub fn fallback(&self) -> &Icon {
        &self.fallback
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Icon> {
        self.icons.values()
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
