//! Calendar colour assignment.

use crate::event::CalendarEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Named colours of the Spectra 6 panel, in fallback order.
pub const SPECTRA_PALETTE: [(&str, &str); 4] = [
    ("vivid-red", "#e60000"),
    ("vivid-yellow", "#ffd600"),
    ("vivid-blue", "#0057e7"),
    ("vivid-black", "#000000"),
];

/// Fallback colours for the standard theme.
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#1E90FF", "#e60000", "#ffd600", "#28a745", "#6f42c1", "#000000",
];

/// Colour theme of the calendar page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Six-colour e-paper: overrides name a vivid palette entry
    #[default]
    Spectra6,
    /// Any other theme: overrides are hex colours
    Standard,
}

impl Theme {
    /// Parse the `theme` setting. Anything but `spectra6` is standard.
    pub fn parse(theme: &str) -> Self {
        if theme.trim().eq_ignore_ascii_case("spectra6") {
            Self::Spectra6
        } else {
            Self::Standard
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spectra6 => write!(f, "spectra6"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

/// Resolves the colour of each calendar.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    theme: Theme,
    overrides: HashMap<String, String>,
}

impl Palette {
    pub fn new(theme: Theme, overrides: HashMap<String, String>) -> Self {
        Self { theme, overrides }
    }

    /// Colour for `calendar_id`: a valid override, else a stable palette pick.
    pub fn color_for(&self, calendar_id: &str) -> String {
        if let Some(color) = self
            .overrides
            .get(calendar_id)
            .and_then(|key| self.resolve_override(key))
        {
            return color;
        }

        match self.theme {
            Theme::Spectra6 => {
                SPECTRA_PALETTE[stable_index(calendar_id, SPECTRA_PALETTE.len())].1.to_string()
            }
            Theme::Standard => {
                DEFAULT_PALETTE[stable_index(calendar_id, DEFAULT_PALETTE.len())].to_string()
            }
        }
    }

    fn resolve_override(&self, key: &str) -> Option<String> {
        match self.theme {
            Theme::Spectra6 => SPECTRA_PALETTE
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, hex)| hex.to_string()),
            Theme::Standard => is_hex_color(key).then(|| key.to_string()),
        }
    }

    /// Colour every event by its calendar.
    pub fn apply(&self, events: &mut [CalendarEvent]) {
        for event in events {
            let color = self.color_for(&event.calendar_id);
            event.set_color(color);
        }
    }
}

/// `#rgb` or `#rrggbb`.
fn is_hex_color(value: &str) -> bool {
    value.starts_with('#')
        && matches!(value.len(), 4 | 7)
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Index into a palette of `len` entries derived from the calendar id,
/// identical across runs.
fn stable_index(calendar_id: &str, len: usize) -> usize {
    let digest = blake3::hash(calendar_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % len as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("spectra6"), Theme::Spectra6);
        assert_eq!(Theme::parse("Spectra6"), Theme::Spectra6);
        assert_eq!(Theme::parse("standard"), Theme::Standard);
        assert_eq!(Theme::parse("dark"), Theme::Standard);
    }

    #[test]
    fn test_spectra_override() {
        let overrides = HashMap::from([("work".to_string(), "vivid-blue".to_string())]);
        let palette = Palette::new(Theme::Spectra6, overrides);
        assert_eq!(palette.color_for("work"), "#0057e7");
    }

    #[test]
    fn test_hex_override_ignored_in_spectra() {
        let overrides = HashMap::from([("work".to_string(), "#123456".to_string())]);
        let palette = Palette::new(Theme::Spectra6, overrides);
        let color = palette.color_for("work");
        assert!(SPECTRA_PALETTE.iter().any(|(_, hex)| *hex == color));
    }

    #[test]
    fn test_standard_override() {
        let overrides = HashMap::from([
            ("a".to_string(), "#abc".to_string()),
            ("b".to_string(), "vivid-red".to_string()),
            ("c".to_string(), "#zzzzzz".to_string()),
        ]);
        let palette = Palette::new(Theme::Standard, overrides);
        assert_eq!(palette.color_for("a"), "#abc");
        assert!(DEFAULT_PALETTE.contains(&palette.color_for("b").as_str()));
        assert!(DEFAULT_PALETTE.contains(&palette.color_for("c").as_str()));
    }

    #[test]
    fn test_fallback_is_stable() {
        let palette = Palette::default();
        assert_eq!(palette.color_for("family"), palette.color_for("family"));
        assert_eq!(stable_index("family", 6), stable_index("family", 6));
        assert!(stable_index("family", 4) < 4);
    }

    #[test]
    fn test_apply_sets_both_colors() {
        let mut events = vec![crate::event::RawEvent {
            summary: Some("x".into()),
            start: crate::event::RawTime {
                date: Some("2024-05-20".into()),
                date_time: None,
            },
            end: crate::event::RawTime {
                date: Some("2024-05-21".into()),
                date_time: None,
            },
            ..Default::default()
        }
        .into_event("family")
        .unwrap()];

        Palette::default().apply(&mut events);
        assert!(events[0].background_color.is_some());
        assert_eq!(events[0].background_color, events[0].border_color);
    }
}
