//! Change-driven publication of the calendar image.
//!
//! This crate holds the moving parts between the calendar server and the
//! e-paper receiver:
//!
//! - **Sync loop**: a tokio task that polls a fingerprint and publishes when
//!   it changes, on a manual trigger, or every tick in scheduled mode
//! - **Capture**: headless-browser screenshots trimmed to the target size
//! - **HTTP clients**: hash/image/status calls to the server and multipart
//!   uploads to the receiver
//! - **Processes**: timeout-bounded external commands and long-running
//!   children
//!
//! # Quick Start
//!
//! ```no_run
//! use ecal_sync::{CalendarClient, HttpHashSource, ImageRelay, SyncConfig, SyncLoop, Uploader};
//!
//! # async fn run() -> Result<(), ecal_sync::SyncError> {
//! let config = SyncConfig::builder()
//!     .server_url("http://localhost:5000")
//!     .upload_endpoint("http://raspberrypi.local:8000/upload")
//!     .build()?;
//!
//! let client = CalendarClient::from_config(&config)?;
//! let relay = ImageRelay::new(client.clone(), Uploader::new(config.upload.clone())?);
//!
//! let task = SyncLoop::builder(HttpHashSource::new(client), relay)
//!     .interval(config.interval())
//!     .policy(config.schedule.mode.tick_policy())
//!     .spawn();
//!
//! task.handle().trigger()?;
//! let stats = task.shutdown().await?;
//! println!("published {} times", stats.published);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Nothing inside a tick is fatal to the loop. Fetch and publish failures
//! are logged, reported to the status sink, and retried on the next tick.
//! [`SyncError::is_retryable`] tells callers outside the loop which
//! failures are worth retrying.

#![forbid(unsafe_code)]

pub mod capture;
pub mod client;
pub mod config;
pub mod errors;
pub mod process;
pub mod sync_loop;

// Optional CLI support
#[cfg(feature = "cli")]
pub mod args;

pub use capture::{BrowserCapture, CaptureConfig};
pub use client::{CalendarClient, HashPayload, HttpHashSource, HttpStatusSink, ImageRelay, Uploader};
pub use config::{SyncConfig, SyncConfigBuilder, SyncMode};
pub use errors::SyncError;
pub use process::{ManagedProcess, ProcessOutcome, ProcessRunner};
pub use sync_loop::{
    ChangeSource, NullStatus, Observation, Publisher, StatusSink, SyncCommand, SyncHandle,
    SyncLoop, SyncLoopBuilder, SyncState, SyncStats, SyncStatus, SyncTask, TickOutcome, TickPolicy,
};
