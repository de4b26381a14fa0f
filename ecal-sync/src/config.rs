//! Configuration types for the sync service.

use crate::errors::SyncError;
use crate::sync_loop::TickPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Poll interval of watch mode.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(10);

/// Publish interval of scheduled mode.
pub const SCHEDULED_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

/// Complete sync service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Calendar server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Receiver upload settings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Timing settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Calendar server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL serving `/hash`, `/image` and `/api/status`.
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Timeout for hash and status requests in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Report loop state to the server's status endpoint.
    #[serde(default = "default_true")]
    pub report_status: bool,
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            timeout_ms: default_timeout_ms(),
            report_status: true,
        }
    }
}

/// Receiver upload endpoint and form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Full URL of the receiver's upload route.
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
    /// `rotation_mode` form field.
    #[serde(default = "default_rotation_mode")]
    pub rotation_mode: String,
    /// `zoom_to_fit` form field.
    #[serde(default)]
    pub zoom_to_fit: bool,
    /// `auto_rotate` form field (EXIF compensation on the receiver).
    #[serde(default)]
    pub auto_rotate: bool,
    /// `auto_zoom` form field; omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_zoom: Option<bool>,
    /// Upload timeout in milliseconds.
    #[serde(default = "default_upload_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_upload_endpoint() -> String {
    "http://raspberrypi.local:8000/upload".to_string()
}

fn default_rotation_mode() -> String {
    "landscape".to_string()
}

fn default_upload_timeout_ms() -> u64 {
    30_000
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_upload_endpoint(),
            rotation_mode: default_rotation_mode(),
            zoom_to_fit: false,
            auto_rotate: false,
            auto_zoom: None,
            timeout_ms: default_upload_timeout_ms(),
        }
    }
}

/// How often the loop runs and when it publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Poll often, publish when the image hash changes
    #[default]
    Watch,
    /// Publish unconditionally on a long interval
    Scheduled,
}

impl SyncMode {
    pub fn default_interval(&self) -> Duration {
        match self {
            Self::Watch => WATCH_INTERVAL,
            Self::Scheduled => SCHEDULED_INTERVAL,
        }
    }

    pub fn tick_policy(&self) -> TickPolicy {
        match self {
            Self::Watch => TickPolicy::OnChange,
            Self::Scheduled => TickPolicy::Always,
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watch => write!(f, "watch"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "watch" | "dev" => Ok(Self::Watch),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(SyncError::Config(format!("Unknown sync mode: {}", other))),
        }
    }
}

/// Timing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub mode: SyncMode,
    /// Override of the mode's interval, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

impl SyncConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder {
            config: Self::default(),
        }
    }

    /// Builder seeded with this configuration.
    #[must_use]
    pub fn into_builder(self) -> SyncConfigBuilder {
        SyncConfigBuilder { config: self }
    }

    /// Load from a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, SyncError> {
        toml::from_str(text).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if a URL is not http(s), the server
    /// timeout is outside 2-10 s or the interval is zero.
    pub fn validate(&self) -> Result<(), SyncError> {
        let urls = [
            ("server.url", &self.server.url),
            ("upload.endpoint", &self.upload.endpoint),
        ];
        for (name, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SyncError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if !(2_000..=10_000).contains(&self.server.timeout_ms) {
            return Err(SyncError::Config(format!(
                "server.timeout_ms must be between 2000 and 10000, got {}",
                self.server.timeout_ms
            )));
        }

        if self.schedule.interval_secs == Some(0) {
            return Err(SyncError::Config(
                "schedule.interval_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Timeout for hash and status requests.
    pub fn server_timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    /// Timeout for image fetch and upload.
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload.timeout_ms)
    }

    /// Effective loop interval.
    pub fn interval(&self) -> Duration {
        self.schedule
            .interval_secs
            .map_or_else(|| self.schedule.mode.default_interval(), Duration::from_secs)
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    #[must_use]
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.url = url.into();
        self
    }

    #[must_use]
    pub fn upload_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.upload.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn rotation_mode(mut self, mode: impl Into<String>) -> Self {
        self.config.upload.rotation_mode = mode.into();
        self
    }

    #[must_use]
    pub fn zoom_to_fit(mut self, zoom: bool) -> Self {
        self.config.upload.zoom_to_fit = zoom;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: SyncMode) -> Self {
        self.config.schedule.mode = mode;
        self
    }

    #[must_use]
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.config.schedule.interval_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn report_status(mut self, report: bool) -> Self {
        self.config.server.report_status = report;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<SyncConfig, SyncError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
