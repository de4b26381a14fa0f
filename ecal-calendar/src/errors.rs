//! Error types for calendar data.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading events or settings.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The settings name no calendar to read from.
    #[error("No calendars configured. Please add calendar IDs to settings.")]
    NoCalendars,

    /// A file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON content did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The event backend failed.
    #[error("Error fetching events: {0}")]
    Source(String),

    /// A settings update carried an invalid value.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl CalendarError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the caller can fix this by editing settings.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoCalendars | Self::InvalidSetting { .. })
    }
}

/// Result alias for calendar operations.
pub type Result<T> = std::result::Result<T, CalendarError>;
