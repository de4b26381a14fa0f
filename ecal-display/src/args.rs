//! Command-line arguments for the device service.
//!
//! This module is only available when the `cli` feature is enabled.

use crate::config::{DisplayConfig, PanelKind, ServiceMode};
use crate::errors::{DisplayError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Device service command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "ecal-display", author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE", env = "ECAL_DISPLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Service mode (image_receiver, calendar_sync)
    #[arg(short = 'm', long, value_name = "MODE")]
    pub mode: Option<ServiceMode>,

    /// Receiver port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Calendar server base URL for calendar_sync mode
    #[arg(short = 's', long, value_name = "URL", env = "ECAL_SERVER_URL")]
    pub server_url: Option<String>,

    /// Write frames to this PNG file instead of running the panel driver
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Show one image file on the panel and exit
    #[arg(long, value_name = "FILE")]
    pub show: Option<PathBuf>,

    /// With --show: fill the panel, cropping the overflow
    #[arg(long, requires = "show")]
    pub zoom_to_fit: bool,

    /// Verbose logging level (repeat for more verbosity: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Parse command-line arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse arguments from an iterator.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }
}

impl DisplayConfig {
    /// Load the config file, if any, then apply explicit arguments.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = if let Some(path) = &args.config {
            let text = std::fs::read_to_string(path).map_err(|e| {
                DisplayError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&text)?
        } else {
            Self::default()
        };

        if let Some(mode) = args.mode {
            config.mode = mode;
        }
        if let Some(port) = args.port {
            config.http.port = port;
        }
        if let Some(url) = &args.server_url {
            config.calendar_sync.server_url = url.clone();
        }
        if let Some(output) = &args.output {
            config.panel.kind = PanelKind::File;
            config.panel.output = output.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_arguments() {
        let args = Args::try_parse_from(["ecal-display"]).unwrap();
        let config = DisplayConfig::from_args(&args).unwrap();
        assert_eq!(config.mode, ServiceMode::ImageReceiver);
        assert_eq!(config.http.port, 8000);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "ecal-display",
            "--mode",
            "calendar_sync",
            "--port",
            "9000",
            "--server-url",
            "http://calendar.local:5000",
            "--output",
            "/tmp/frame.png",
        ])
        .unwrap();
        let config = DisplayConfig::from_args(&args).unwrap();
        assert_eq!(config.mode, ServiceMode::CalendarSync);
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.calendar_sync.server_url, "http://calendar.local:5000");
        assert_eq!(config.panel.kind, PanelKind::File);
    }

    #[test]
    fn test_config_file_then_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("display.toml");
        std::fs::write(&path, "mode = \"calendar_sync\"\n[http]\nport = 8100\n").unwrap();

        let args = Args::try_parse_from([
            "ecal-display",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "8200",
        ])
        .unwrap();
        let config = DisplayConfig::from_args(&args).unwrap();
        assert_eq!(config.mode, ServiceMode::CalendarSync);
        assert_eq!(config.http.port, 8200);
    }

    #[test]
    fn test_zoom_requires_show() {
        assert!(Args::try_parse_from(["ecal-display", "--zoom-to-fit"]).is_err());
        let args =
            Args::try_parse_from(["ecal-display", "--show", "photo.jpg", "--zoom-to-fit"]).unwrap();
        assert!(args.zoom_to_fit);
    }
}
