//! Error types for the device service.

use ecal_common::FrameSize;
use ecal_image::ImageError;
use ecal_sync::SyncError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    /// A buffer handed to the panel does not match its resolution.
    #[error("Frame is {actual} but the panel is {expected}")]
    SizeMismatch { expected: FrameSize, actual: FrameSize },

    /// The panel driver failed.
    #[error("Panel driver failed: {0}")]
    Driver(String),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking image task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for DisplayError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl From<DisplayError> for SyncError {
    fn from(e: DisplayError) -> Self {
        match e {
            DisplayError::Sync(inner) => inner,
            DisplayError::Image(inner) => SyncError::Image(inner),
            DisplayError::Io(inner) => SyncError::Io(inner),
            other => SyncError::Process(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DisplayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_display() {
        let err = DisplayError::SizeMismatch {
            expected: FrameSize::new(1200, 1600),
            actual: FrameSize::new(1600, 1200),
        };
        assert_eq!(err.to_string(), "Frame is 1600x1200 but the panel is 1200x1600");
    }

    #[test]
    fn test_driver_failure_is_retryable_in_sync_loop() {
        let err: SyncError = DisplayError::Driver("busy".to_string()).into();
        assert!(err.is_retryable());
    }
}
