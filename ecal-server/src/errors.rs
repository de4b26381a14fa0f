//! Error types for the calendar server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ecal_calendar::CalendarError;
use ecal_image::ImageError;
use ecal_sync::SyncError;
use serde_json::json;
use std::io;
use thiserror::Error;

/// Errors surfaced by the server state and handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Calendar source, settings or configuration problem.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Capture or process failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Image processing failure.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Request body rejected.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background task failed to complete.
    #[error("Task failed: {0}")]
    Task(String),
}

impl ServerError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Calendar(CalendarError::InvalidSetting { .. }) => StatusCode::BAD_REQUEST,
            Self::Sync(SyncError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
