//! Headless-browser screenshot capture.

use crate::errors::SyncError;
use crate::process::ProcessRunner;
use ecal_common::FrameSize;
use ecal_image::{fit_capture, CropReport, WhitespaceConfig};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Browser invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Browser executable.
    #[serde(default = "default_browser")]
    pub browser: String,
    /// Target capture width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Target capture height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Extra window height requested so the page never clips.
    #[serde(default = "default_overscan")]
    pub overscan: u32,
    /// Time the page gets to run its scripts before the shot.
    #[serde(default = "default_virtual_time_budget_ms")]
    pub virtual_time_budget_ms: u64,
    /// Hard limit on the browser process.
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,
    /// Appended to the browser arguments before the URL.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_browser() -> String {
    "chromium-browser".to_string()
}

fn default_width() -> u32 {
    1600
}

fn default_height() -> u32 {
    1200
}

fn default_overscan() -> u32 {
    200
}

fn default_virtual_time_budget_ms() -> u64 {
    2_000
}

fn default_capture_timeout_ms() -> u64 {
    30_000
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            browser: default_browser(),
            width: default_width(),
            height: default_height(),
            overscan: default_overscan(),
            virtual_time_budget_ms: default_virtual_time_budget_ms(),
            timeout_ms: default_capture_timeout_ms(),
            extra_args: Vec::new(),
        }
    }
}

impl CaptureConfig {
    /// Size of the trimmed capture.
    pub fn target(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.target().is_empty() {
            return Err(SyncError::Config(format!(
                "capture size must be non-zero, got {}",
                self.target()
            )));
        }
        if self.browser.trim().is_empty() {
            return Err(SyncError::Config("capture.browser is empty".to_string()));
        }
        Ok(())
    }
}

/// Takes screenshots of a URL with a headless browser.
#[derive(Debug, Clone)]
pub struct BrowserCapture {
    config: CaptureConfig,
    runner: ProcessRunner,
}

impl BrowserCapture {
    pub fn new(config: CaptureConfig) -> Self {
        let runner = ProcessRunner::new(config.timeout());
        Self { config, runner }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Browser arguments for capturing `url` into `output`.
    pub fn args(&self, url: &str, output: &Path) -> Vec<String> {
        let c = &self.config;
        let mut args = vec![
            "--headless".to_string(),
            format!("--screenshot={}", output.display()),
            format!("--window-size={},{}", c.width, c.height + c.overscan),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            format!("--virtual-time-budget={}", c.virtual_time_budget_ms),
            "--hide-scrollbars".to_string(),
        ];
        args.extend(c.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }

    /// Capture `url` as an untrimmed image.
    pub async fn capture(&self, url: &str) -> Result<DynamicImage, SyncError> {
        let file = tempfile::Builder::new()
            .prefix("ecal-capture-")
            .suffix(".png")
            .tempfile()?;
        let path = file.path().to_path_buf();

        debug!("Capturing {} into {}", url, path.display());
        self.runner
            .run(&self.config.browser, self.args(url, &path))
            .await?
            .into_result(&self.config.browser)?;

        let bytes = tokio::fs::read(&path).await?;
        if bytes.is_empty() {
            return Err(SyncError::Capture(format!(
                "{} wrote an empty screenshot",
                self.config.browser
            )));
        }

        let image = ecal_image::decode(&bytes)?;
        info!(
            "Captured {} ({}x{})",
            url,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    /// Capture `url`, cut the overscan and trim trailing whitespace.
    pub async fn capture_trimmed(
        &self,
        url: &str,
        whitespace: &WhitespaceConfig,
    ) -> Result<(RgbImage, CropReport), SyncError> {
        let image = self.capture(url).await?;
        let (trimmed, report) = fit_capture(image, self.config.target(), whitespace)?;
        if report.should_crop() {
            debug!(
                "Trimmed {} rows of whitespace (content ends at {:?})",
                report.whitespace_height(),
                report.last_content_row
            );
        }
        Ok((trimmed, report))
    }
}
