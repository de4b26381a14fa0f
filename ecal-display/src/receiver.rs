//! Upload receiver: `POST /upload` paints an image on the panel.
//!
//! The multipart form carries a `file` part plus optional text fields:
//!
//! | Field | Default | |
//! |-------|---------|-|
//! | `auto_rotate` | `true` | apply the EXIF orientation table |
//! | `rotation_mode` | config | `landscape`, `portrait` or `auto` |
//! | `zoom_to_fit` | config | fill and crop instead of letterboxing |
//! | `auto_zoom` | per mode | switch to fill after a rotation |
//! | `test_rotation` | unset | diagnostic angle: 0, 90, 180 or 270 |

use crate::config::FitConfig;
use crate::controller::DisplayController;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use ecal_image::{
    compensate, decode_with_orientation, ExifCompensation, FitOptions, FitPolicy, RotationMode,
};
use image::DynamicImage;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared receiver state.
pub struct ReceiverState {
    pub controller: DisplayController,
    pub defaults: FitConfig,
}

impl ReceiverState {
    pub fn new(controller: DisplayController, defaults: FitConfig) -> Self {
        Self { controller, defaults }
    }
}

/// Receiver routes over `state`, accepting bodies up to `max_upload_bytes`.
pub fn router(state: Arc<ReceiverState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn index() -> &'static str {
    "ecal-display image receiver is running"
}

/// A failed upload: `{error, details?}` with a status code.
#[derive(Debug)]
struct UploadError {
    status: StatusCode,
    error: &'static str,
    details: Option<String>,
}

impl UploadError {
    fn bad_request(error: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
            details: None,
        }
    }

    fn with_details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let body = match &self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Parse a form flag. Anything but a recognised "true" spelling is false.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Bytes)>,
    auto_rotate: Option<bool>,
    rotation_mode: Option<String>,
    zoom_to_fit: Option<bool>,
    auto_zoom: Option<bool>,
    test_rotation: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, UploadError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::bad_request("Malformed upload").with_details(e))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::bad_request("Malformed upload").with_details(e))?;
                form.file = Some((filename, bytes));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| UploadError::bad_request("Malformed upload").with_details(e))?;
            match name.as_str() {
                "auto_rotate" => form.auto_rotate = Some(parse_flag(&value)),
                "rotation_mode" => form.rotation_mode = Some(value),
                "zoom_to_fit" => form.zoom_to_fit = Some(parse_flag(&value)),
                "auto_zoom" => form.auto_zoom = Some(parse_flag(&value)),
                "test_rotation" if !value.trim().is_empty() => form.test_rotation = Some(value),
                _ => {}
            }
        }
        Ok(form)
    }

    /// Placement options, falling back to `defaults` per field.
    fn options(&self, defaults: &FitConfig) -> Result<FitOptions, UploadError> {
        let rotation_mode = match &self.test_rotation {
            Some(angle) => {
                let degrees = angle.trim().parse::<u32>().map_err(|e| {
                    UploadError::bad_request("Invalid test_rotation").with_details(e)
                })?;
                RotationMode::test_override(degrees).map_err(|e| {
                    UploadError::bad_request("Invalid test_rotation").with_details(e)
                })?
            }
            None => RotationMode::parse(
                self.rotation_mode
                    .as_deref()
                    .unwrap_or(&defaults.rotation_mode),
            ),
        };
        Ok(FitOptions {
            policy: FitPolicy::from_zoom_to_fit(self.zoom_to_fit.unwrap_or(defaults.zoom_to_fit)),
            rotation_mode,
            auto_zoom: self.auto_zoom.or(defaults.auto_zoom),
        })
    }
}

async fn decode_upload(
    bytes: Bytes,
    auto_rotate: bool,
    table: ExifCompensation,
) -> Result<DynamicImage, UploadError> {
    let decoded = tokio::task::spawn_blocking(move || {
        decode_with_orientation(&bytes).map(|oriented| {
            if auto_rotate {
                compensate(oriented, table)
            } else {
                oriented.image
            }
        })
    })
    .await
    .map_err(|e| UploadError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        error: "Image processing failed",
        details: Some(e.to_string()),
    })?;
    decoded.map_err(|e| UploadError::bad_request("Invalid image").with_details(e))
}

async fn upload(
    State(state): State<Arc<ReceiverState>>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, UploadError> {
    let mut form = UploadForm::read(multipart).await.inspect_err(|e| {
        warn!("Rejected upload: {}", e.error);
    })?;

    let Some((filename, bytes)) = form.file.take() else {
        warn!("Upload without a file part");
        return Err(UploadError::bad_request("No file part in the request"));
    };
    if filename.is_empty() {
        warn!("Upload with an empty filename");
        return Err(UploadError::bad_request("No selected file"));
    }

    let options = form.options(&state.defaults)?;
    let auto_rotate = form.auto_rotate.unwrap_or(true);
    info!(
        "Received {} ({} bytes): mode {}, {:?}, auto_rotate {}",
        filename,
        bytes.len(),
        options.rotation_mode,
        options.policy,
        auto_rotate
    );

    let image = decode_upload(bytes, auto_rotate, state.defaults.exif_table)
        .await
        .inspect_err(|e| warn!("Failed to decode {}: {:?}", filename, e.details))?;

    match state.controller.present(image, options).await {
        Ok(_) => Ok(Json(json!({ "status": "success" }))),
        Err(e) => {
            error!("Display update failed for {}: {}", filename, e);
            Err(UploadError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "Display update failed",
                details: Some(e.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        for value in ["true", "True", "1", "yes", " on "] {
            assert!(parse_flag(value), "{}", value);
        }
        for value in ["false", "0", "", "maybe"] {
            assert!(!parse_flag(value), "{}", value);
        }
    }

    #[test]
    fn test_options_fall_back_to_defaults() {
        let defaults = FitConfig {
            rotation_mode: "portrait".to_string(),
            zoom_to_fit: true,
            ..FitConfig::default()
        };
        let options = UploadForm::default().options(&defaults).unwrap();
        assert_eq!(options.rotation_mode, RotationMode::Portrait);
        assert_eq!(options.policy, FitPolicy::FillMayCrop);
        assert_eq!(options.auto_zoom, None);
    }

    #[test]
    fn test_form_fields_override_defaults() {
        let form = UploadForm {
            rotation_mode: Some("auto".to_string()),
            zoom_to_fit: Some(false),
            auto_zoom: Some(true),
            ..UploadForm::default()
        };
        let defaults = FitConfig {
            zoom_to_fit: true,
            ..FitConfig::default()
        };
        let options = form.options(&defaults).unwrap();
        assert_eq!(options.rotation_mode, RotationMode::Auto);
        assert_eq!(options.policy, FitPolicy::FitWithoutCrop);
        assert_eq!(options.auto_zoom, Some(true));
    }

    #[test]
    fn test_rotation_override() {
        let form = UploadForm {
            rotation_mode: Some("portrait".to_string()),
            test_rotation: Some("180".to_string()),
            ..UploadForm::default()
        };
        let options = form.options(&FitConfig::default()).unwrap();
        assert!(matches!(options.rotation_mode, RotationMode::TestOverride(_)));

        let bad = UploadForm {
            test_rotation: Some("45".to_string()),
            ..UploadForm::default()
        };
        let err = bad.options(&FitConfig::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error, "Invalid test_rotation");
    }
}
