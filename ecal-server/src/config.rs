//! Server configuration.

use crate::errors::ServerError;
use ecal_image::WhitespaceConfig;
use ecal_sync::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub sync: SyncProcessConfig,
    #[serde(default)]
    pub logs: LogConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Event and settings files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// JSON settings edited by the settings page.
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
    /// Calendar export read by the event source.
    #[serde(default = "default_events_path")]
    pub events_path: PathBuf,
    #[serde(default = "default_max_per_calendar")]
    pub max_per_calendar: usize,
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("settings.json")
}

fn default_events_path() -> PathBuf {
    PathBuf::from("events.json")
}

fn default_max_per_calendar() -> usize {
    ecal_calendar::source::DEFAULT_MAX_PER_CALENDAR
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            events_path: default_events_path(),
            max_per_calendar: default_max_per_calendar(),
        }
    }
}

/// How `/image` is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Calendar page the headless browser captures.
    #[serde(default = "default_page_url")]
    pub page_url: String,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub whitespace: WhitespaceConfig,
}

fn default_page_url() -> String {
    "http://localhost:8080/".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
            capture: CaptureConfig::default(),
            whitespace: WhitespaceConfig::default(),
        }
    }
}

/// The sync service started by `/api/sync/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProcessConfig {
    #[serde(default = "default_sync_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_sync_program() -> String {
    "ecal-sync".to_string()
}

impl Default for SyncProcessConfig {
    fn default() -> Self {
        Self {
            program: default_sync_program(),
            args: Vec::new(),
        }
    }
}

/// In-memory log buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Lines kept for `/api/logs`.
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

fn default_log_capacity() -> usize {
    500
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ServerError> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.http.host, self.http.port)
            .parse()
            .map_err(|e| {
                ServerError::Config(format!(
                    "Invalid listen address {}:{}: {}",
                    self.http.host, self.http.port, e
                ))
            })
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        self.bind_addr()?;
        self.render.capture.validate()?;
        if !(self.render.page_url.starts_with("http://")
            || self.render.page_url.starts_with("https://"))
        {
            return Err(ServerError::Config(format!(
                "render.page_url must be an http(s) URL, got '{}'",
                self.render.page_url
            )));
        }
        if self.logs.capacity == 0 {
            return Err(ServerError::Config(
                "logs.capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
