//! HTTP clients for the calendar server and the display receiver.
//!
//! [`CalendarClient`] talks to the server's `/hash`, `/image` and
//! `/api/status` routes. [`Uploader`] posts images to a receiver. The
//! adapters at the bottom plug them into the [`sync_loop`](crate::sync_loop)
//! traits.

use crate::config::{SyncConfig, UploadConfig};
use crate::errors::SyncError;
use crate::sync_loop::{ChangeSource, Observation, Publisher, StatusSink, SyncStatus};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Body of the server's `GET /hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashPayload {
    pub hash: String,
    /// One-shot flag set by a manual refresh on the server.
    #[serde(default)]
    pub refresh: bool,
}

impl From<HashPayload> for Observation {
    fn from(payload: HashPayload) -> Self {
        Self {
            hash: payload.hash,
            force: payload.refresh,
        }
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> SyncError {
    if e.is_timeout() {
        SyncError::Timeout(timeout)
    } else {
        SyncError::Http(e)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Status {
        url,
        status: status.as_u16(),
        body,
    })
}

/// Client for the calendar server.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    image_timeout: Duration,
}

impl CalendarClient {
    /// `timeout` bounds hash and status calls, `image_timeout` the image
    /// download (which may wait for a render).
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        image_timeout: Duration,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            image_timeout,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        Self::new(
            &config.server.url,
            config.server_timeout(),
            config.upload_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_hash(&self) -> Result<HashPayload, SyncError> {
        let response = self
            .http
            .get(self.url("/hash"))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let payload = check_status(response)
            .await?
            .json::<HashPayload>()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        debug!("Server hash {} (refresh: {})", payload.hash, payload.refresh);
        Ok(payload)
    }

    pub async fn fetch_image(&self) -> Result<Bytes, SyncError> {
        let response = self
            .http
            .get(self.url("/image"))
            .timeout(self.image_timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, self.image_timeout))?;
        let bytes = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.image_timeout))?;
        debug!("Fetched image ({} bytes)", bytes.len());
        Ok(bytes)
    }

    pub async fn post_status(&self, status: &SyncStatus) -> Result<(), SyncError> {
        let response = self
            .http
            .post(self.url("/api/status"))
            .json(status)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        check_status(response).await?;
        Ok(())
    }
}

/// Posts images to a receiver's upload route.
#[derive(Debug, Clone)]
pub struct Uploader {
    http: reqwest::Client,
    config: UploadConfig,
}

impl Uploader {
    pub fn new(config: UploadConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn form(&self, png: Bytes) -> Result<Form, SyncError> {
        let part = Part::stream(png)
            .file_name("calendar.png")
            .mime_str("image/png")?;
        let mut form = Form::new()
            .part("file", part)
            .text("rotation_mode", self.config.rotation_mode.clone())
            .text("zoom_to_fit", self.config.zoom_to_fit.to_string())
            .text("auto_rotate", self.config.auto_rotate.to_string());
        if let Some(auto_zoom) = self.config.auto_zoom {
            form = form.text("auto_zoom", auto_zoom.to_string());
        }
        Ok(form)
    }

    /// Upload one PNG.
    pub async fn upload(&self, png: Bytes) -> Result<(), SyncError> {
        let size = png.len();
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let response = self
            .http
            .post(&self.config.endpoint)
            .multipart(self.form(png)?)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        check_status(response).await?;
        info!("Uploaded {} bytes to {}", size, self.config.endpoint);
        Ok(())
    }
}

/// Polls the server's image hash.
#[derive(Debug, Clone)]
pub struct HttpHashSource {
    client: CalendarClient,
}

impl HttpHashSource {
    pub fn new(client: CalendarClient) -> Self {
        Self { client }
    }
}

impl ChangeSource for HttpHashSource {
    async fn poll(&mut self) -> Result<Observation, SyncError> {
        Ok(self.client.fetch_hash().await?.into())
    }
}

/// Forwards loop state to the server's status route.
#[derive(Debug, Clone)]
pub struct HttpStatusSink {
    client: CalendarClient,
}

impl HttpStatusSink {
    pub fn new(client: CalendarClient) -> Self {
        Self { client }
    }
}

impl StatusSink for HttpStatusSink {
    async fn report(&self, status: &SyncStatus) {
        if let Err(e) = self.client.post_status(status).await {
            warn!("Failed to report status: {}", e);
        }
    }
}

/// Downloads the server's image and uploads it to a receiver.
#[derive(Debug, Clone)]
pub struct ImageRelay {
    client: CalendarClient,
    uploader: Uploader,
}

impl ImageRelay {
    pub fn new(client: CalendarClient, uploader: Uploader) -> Self {
        Self { client, uploader }
    }
}

impl Publisher for ImageRelay {
    async fn publish(&mut self, observation: &Observation) -> Result<(), SyncError> {
        let png = self.client.fetch_image().await?;
        debug!("Relaying image {}", observation.hash);
        self.uploader.upload(png).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_payload_refresh_defaults_false() {
        let payload: HashPayload = serde_json::from_str(r#"{"hash":"abc"}"#).unwrap();
        assert!(!payload.refresh);
        let observation: Observation = payload.into();
        assert_eq!(observation, Observation::new("abc"));
    }

    #[test]
    fn test_refresh_forces_observation() {
        let payload: HashPayload =
            serde_json::from_str(r#"{"hash":"abc","refresh":true}"#).unwrap();
        assert!(Observation::from(payload).force);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = CalendarClient::new(
            "http://localhost:5000/",
            Duration::from_secs(5),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.url("/hash"), "http://localhost:5000/hash");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_retryable() {
        // Port 9 (discard) on loopback is closed in test environments
        let client = CalendarClient::new(
            "http://127.0.0.1:9",
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.fetch_hash().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
