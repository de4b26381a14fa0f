//! Device service configuration.

use crate::errors::{DisplayError, Result};
use crate::panel::{CommandPanel, FilePanel, Panel};
use ecal_common::FrameSize;
use ecal_image::{ExifCompensation, FitOptions, FitPolicy, RotationMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which service the device runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Accept uploads on `/upload`.
    #[default]
    ImageReceiver,
    /// Poll the calendar server and paint its image directly.
    CalendarSync,
}

impl FromStr for ServiceMode {
    type Err = DisplayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "image_receiver" | "receiver" => Ok(Self::ImageReceiver),
            "calendar_sync" | "sync" => Ok(Self::CalendarSync),
            other => Err(DisplayError::Config(format!("Unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageReceiver => write!(f, "image_receiver"),
            Self::CalendarSync => write!(f, "calendar_sync"),
        }
    }
}

/// Complete device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub mode: ServiceMode,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub fit: FitConfig,
    #[serde(default)]
    pub calendar_sync: CalendarSyncConfig,
}

/// Receiver listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Panel backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    /// External driver program.
    #[default]
    Command,
    /// PNG file on disk.
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub kind: PanelKind,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Driver program for [`PanelKind::Command`]; receives the PNG path last.
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Output file for [`PanelKind::File`].
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Driver timeout in milliseconds. A full refresh of a colour panel is slow.
    #[serde(default = "default_panel_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    1600
}

fn default_program() -> String {
    "epd-show".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("frame.png")
}

fn default_panel_timeout_ms() -> u64 {
    120_000
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            kind: PanelKind::default(),
            width: default_width(),
            height: default_height(),
            program: default_program(),
            args: Vec::new(),
            output: default_output(),
            timeout_ms: default_panel_timeout_ms(),
        }
    }
}

impl PanelConfig {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Build the configured panel.
    pub fn build(&self) -> Box<dyn Panel> {
        match self.kind {
            PanelKind::Command => Box::new(CommandPanel::new(
                self.size(),
                &self.program,
                self.args.clone(),
                self.timeout(),
            )),
            PanelKind::File => Box::new(FilePanel::new(self.size(), &self.output)),
        }
    }
}

/// Placement defaults, used when an upload leaves a field out and for
/// calendar-sync frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    #[serde(default = "default_rotation_mode")]
    pub rotation_mode: String,
    #[serde(default)]
    pub zoom_to_fit: bool,
    #[serde(default)]
    pub auto_zoom: Option<bool>,
    /// EXIF table applied to uploads sent with `auto_rotate`.
    #[serde(default)]
    pub exif_table: ExifCompensation,
}

fn default_rotation_mode() -> String {
    "landscape".to_string()
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            rotation_mode: default_rotation_mode(),
            zoom_to_fit: false,
            auto_zoom: None,
            exif_table: ExifCompensation::default(),
        }
    }
}

impl FitConfig {
    pub fn options(&self) -> FitOptions {
        FitOptions {
            policy: FitPolicy::from_zoom_to_fit(self.zoom_to_fit),
            rotation_mode: RotationMode::parse(&self.rotation_mode),
            auto_zoom: self.auto_zoom,
        }
    }
}

/// Calendar-sync mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSyncConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Hash and status request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Image download timeout in milliseconds.
    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub report_status: bool,
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_interval_secs() -> u64 {
    5
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_image_timeout_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

impl Default for CalendarSyncConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            interval_secs: default_interval_secs(),
            timeout_ms: default_timeout_ms(),
            image_timeout_ms: default_image_timeout_ms(),
            report_status: true,
        }
    }
}

impl CalendarSyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }
}

impl DisplayConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DisplayError::Config(e.to_string()))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.http.host, self.http.port)
            .parse()
            .map_err(|e| DisplayError::Config(format!("Invalid listen address: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.panel.width == 0 || self.panel.height == 0 {
            return Err(DisplayError::Config("Panel size cannot be zero".to_string()));
        }
        if self.panel.kind == PanelKind::Command && self.panel.program.is_empty() {
            return Err(DisplayError::Config("Panel program cannot be empty".to_string()));
        }
        if self.calendar_sync.interval_secs == 0 {
            return Err(DisplayError::Config("Sync interval cannot be zero".to_string()));
        }
        if !(2_000..=10_000).contains(&self.calendar_sync.timeout_ms) {
            return Err(DisplayError::Config(
                "Sync timeout must be between 2000 and 10000 ms".to_string(),
            ));
        }
        if self.mode == ServiceMode::CalendarSync
            && !self.calendar_sync.server_url.starts_with("http")
        {
            return Err(DisplayError::Config(format!(
                "Invalid server URL '{}'",
                self.calendar_sync.server_url
            )));
        }
        self.bind_addr()?;
        Ok(())
    }
}
