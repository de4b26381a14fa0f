//! User preferences for the calendar page.
//!
//! Settings live in a JSON file that the settings page edits. Unknown keys
//! already in the file are preserved, but updates only touch the known keys
//! listed in [`SETTINGS_KEYS`].

use crate::errors::{CalendarError, Result};
use crate::palette::{Palette, Theme};
use crate::window::WeekStart;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// Keys accepted by [`Settings::merge`].
pub const SETTINGS_KEYS: [&str; 11] = [
    "theme",
    "show_weekends",
    "first_day",
    "zoom",
    "hide_past_weeks",
    "week_count",
    "equal_row_height",
    "wrap_event_titles",
    "color_event_text",
    "calendar_ids",
    "calendar_colors",
];

/// Keys dropped when loading older settings files.
pub const LEGACY_KEYS: [&str; 1] = ["max_rows"];

/// Calendar page preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_true")]
    pub show_weekends: bool,

    /// 0 starts weeks on Sunday, 1 on Monday.
    #[serde(default)]
    pub first_day: u8,

    /// Page zoom in percent.
    #[serde(default = "default_zoom")]
    pub zoom: u32,

    #[serde(default = "default_true")]
    pub hide_past_weeks: bool,

    #[serde(default = "default_week_count")]
    pub week_count: u32,

    #[serde(default = "default_true")]
    pub equal_row_height: bool,

    #[serde(default = "default_true")]
    pub wrap_event_titles: bool,

    #[serde(default = "default_true")]
    pub color_event_text: bool,

    /// Comma-separated calendar ids.
    #[serde(default)]
    pub calendar_ids: String,

    /// Calendar id to palette key (spectra6) or hex colour (standard).
    #[serde(default, deserialize_with = "deserialize_colors")]
    pub calendar_colors: BTreeMap<String, String>,

    /// Keys this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_theme() -> String {
    "spectra6".to_string()
}

fn default_true() -> bool {
    true
}

fn default_zoom() -> u32 {
    150
}

fn default_week_count() -> u32 {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            show_weekends: true,
            first_day: 0,
            zoom: default_zoom(),
            hide_past_weeks: true,
            week_count: default_week_count(),
            equal_row_height: true,
            wrap_event_titles: true,
            color_event_text: true,
            calendar_ids: String::new(),
            calendar_colors: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

/// Accept the colour map either as an object or as a JSON string holding one.
/// Anything unparseable becomes an empty map.
fn deserialize_colors<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(colors_from_value(value))
}

fn colors_from_value(value: Value) -> BTreeMap<String, String> {
    let value = match value {
        Value::String(text) => match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring unparseable calendar_colors string: {}", e);
                return BTreeMap::new();
            }
        },
        other => other,
    };
    match serde_json::from_value(value) {
        Ok(map) => map,
        Err(e) => {
            warn!("Ignoring invalid calendar_colors: {}", e);
            BTreeMap::new()
        }
    }
}

impl Settings {
    /// Parse a settings document, dropping legacy keys.
    ///
    /// Returns the settings and whether a migration removed anything.
    pub fn from_json(text: &str) -> Result<(Self, bool)> {
        let mut settings: Self = serde_json::from_str(text)?;
        let migrated = settings.migrate();
        Ok((settings, migrated))
    }

    /// Remove legacy keys. Returns true if any were present.
    pub fn migrate(&mut self) -> bool {
        let mut migrated = false;
        for key in LEGACY_KEYS {
            if self.extra.remove(key).is_some() {
                info!("Migrated settings: removed legacy key '{}'", key);
                migrated = true;
            }
        }
        migrated
    }

    /// Apply the known keys of a JSON object, ignoring all others.
    ///
    /// # Errors
    ///
    /// Fails with [`CalendarError::InvalidSetting`] if the update is not an
    /// object or a known key has the wrong type. `self` is left unchanged on
    /// error.
    pub fn merge(&mut self, update: &Value) -> Result<()> {
        let update = update.as_object().ok_or_else(|| CalendarError::InvalidSetting {
            key: "<root>".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for key in SETTINGS_KEYS {
            if let Some(value) = update.get(key) {
                let value = if key == "calendar_colors" {
                    serde_json::to_value(colors_from_value(value.clone()))?
                } else {
                    value.clone()
                };
                current.insert(key.to_string(), value);
            }
        }

        let merged: Self =
            serde_json::from_value(Value::Object(current)).map_err(|e| {
                CalendarError::InvalidSetting {
                    key: SETTINGS_KEYS
                        .iter()
                        .find(|k| update.contains_key(**k))
                        .map(|k| k.to_string())
                        .unwrap_or_default(),
                    reason: e.to_string(),
                }
            })?;
        *self = merged;
        Ok(())
    }

    /// Calendar ids from the comma-separated setting, trimmed, blanks removed.
    pub fn calendar_id_list(&self) -> Vec<String> {
        parse_calendar_ids(&self.calendar_ids)
    }

    pub fn week_start(&self) -> WeekStart {
        WeekStart::from_first_day(self.first_day)
    }

    /// Colour resolver for the current theme and overrides.
    pub fn palette(&self) -> Palette {
        let overrides: HashMap<String, String> = self
            .calendar_colors
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Palette::new(Theme::parse(&self.theme), overrides)
    }
}

/// Split a comma-separated id list.
pub fn parse_calendar_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
