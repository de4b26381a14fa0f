//! Error types for the sync pipeline.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while polling, capturing or publishing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP transport error (connect, DNS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The peer answered with a non-success status.
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// An operation exceeded its time budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// An external process could not be started or failed.
    #[error("Process error: {0}")]
    Process(String),

    /// The headless browser did not produce a usable screenshot.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Image decoding, geometry or encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] ecal_image::ImageError),

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The loop or its handle has been shut down.
    #[error("Sync loop closed")]
    Closed,
}

impl SyncError {
    /// Returns true if the next tick may succeed where this one failed.
    ///
    /// Network trouble, server-side failures and flaky captures are
    /// retryable. Client-side rejections and configuration problems are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_)
            | Self::Timeout(_)
            | Self::Io(_)
            | Self::Capture(_)
            | Self::Process(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Image(_) | Self::Config(_) | Self::Closed => false,
        }
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}
