//! Command-line arguments for the server binary.

use crate::config::ServerConfig;
use crate::errors::ServerError;
use clap::Parser;
use std::path::PathBuf;

/// Calendar web server.
#[derive(Parser, Debug, Clone)]
#[command(name = "ecal-server", author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE", env = "ECAL_SERVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Settings file
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Calendar export read for events
    #[arg(short = 'e', long, value_name = "FILE")]
    pub events: Option<PathBuf>,

    /// Calendar page captured for /image
    #[arg(long, value_name = "URL")]
    pub page_url: Option<String>,

    /// Verbose logging level (repeat for more verbosity: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }
}

impl ServerConfig {
    /// Config file first, then explicit arguments.
    pub fn from_args(args: &Args) -> Result<Self, ServerError> {
        let mut config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ServerError::Config(format!(
                        "Failed to read config file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        if let Some(host) = &args.host {
            config.http.host = host.clone();
        }
        if let Some(port) = args.port {
            config.http.port = port;
        }
        if let Some(path) = &args.settings {
            config.calendar.settings_path = path.clone();
        }
        if let Some(path) = &args.events {
            config.calendar.events_path = path.clone();
        }
        if let Some(url) = &args.page_url {
            config.render.page_url = url.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
