//! Command-line argument parsing for the sync service.
//!
//! This module is only available when the `cli` feature is enabled.
//!
//! ```no_run
//! use ecal_sync::args::Args;
//! use ecal_sync::SyncConfig;
//!
//! let args = Args::parse();
//! let config = SyncConfig::from_args(&args)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::{SyncConfig, SyncMode};
use crate::errors::SyncError;
use clap::Parser;

/// Sync service command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "ecal-sync", author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE", env = "ECAL_SYNC_CONFIG")]
    pub config: Option<String>,

    /// Calendar server base URL
    #[arg(short = 's', long, value_name = "URL", env = "ECAL_SERVER_URL")]
    pub server_url: Option<String>,

    /// Receiver upload URL
    #[arg(short = 'u', long, value_name = "URL", env = "ECAL_UPLOAD_URL")]
    pub upload_url: Option<String>,

    /// Sync mode
    ///
    /// watch: poll every 10 s, upload when the image hash changes
    /// scheduled: upload every 12 h unconditionally
    #[arg(short = 'm', long, value_name = "MODE")]
    pub mode: Option<SyncMode>,

    /// Loop interval in seconds (overrides the mode's default)
    #[arg(short = 'i', long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Rotation mode sent with each upload (landscape, portrait, auto)
    #[arg(long, value_name = "MODE")]
    pub rotation_mode: Option<String>,

    /// Ask the receiver to fit without cropping
    #[arg(long)]
    pub zoom_to_fit: bool,

    /// Do not report loop state to the server
    #[arg(long)]
    pub no_status: bool,

    /// Publish once and exit
    #[arg(long)]
    pub once: bool,

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
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }
}

impl SyncConfig {
    /// Create a configuration from command-line arguments.
    ///
    /// The config file, if any, is loaded first and explicit arguments
    /// override it.
    pub fn from_args(args: &Args) -> Result<Self, SyncError> {
        let config = if let Some(path) = &args.config {
            let text = std::fs::read_to_string(path).map_err(|e| {
                SyncError::Config(format!("Failed to read config file '{}': {}", path, e))
            })?;
            Self::from_toml(&text).map_err(|e| {
                SyncError::Config(format!("Failed to parse config file '{}': {}", path, e))
            })?
        } else {
            Self::default()
        };

        let mut builder = config.into_builder();

        if let Some(url) = &args.server_url {
            builder = builder.server_url(url);
        }
        if let Some(url) = &args.upload_url {
            builder = builder.upload_endpoint(url);
        }
        if let Some(mode) = args.mode {
            builder = builder.mode(mode);
        }
        if let Some(secs) = args.interval {
            builder = builder.interval_secs(secs);
        }
        if let Some(rotation) = &args.rotation_mode {
            builder = builder.rotation_mode(rotation);
        }
        if args.zoom_to_fit {
            builder = builder.zoom_to_fit(true);
        }
        if args.no_status {
            builder = builder.report_status(false);
        }

        builder.build()
    }
}
