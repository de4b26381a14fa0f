//! The rendered calendar image and its cache.
//!
//! The cache is keyed by the content fingerprint of the events it was
//! rendered from. The async lock is held across the render, so concurrent
//! requests for a stale image wait for one render instead of starting
//! their own.

use crate::errors::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use ecal_calendar::image_fingerprint;
use ecal_common::FrameSize;
use ecal_image::WhitespaceConfig;
use ecal_sync::BrowserCapture;
use futures::future::BoxFuture;
use image::RgbImage;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Produces a fresh raster of the calendar page.
pub trait Renderer: Send + Sync {
    fn render(&self) -> BoxFuture<'_, Result<RgbImage>>;
}

/// Renders by screenshotting the calendar page with a headless browser.
pub struct BrowserRenderer {
    capture: BrowserCapture,
    page_url: String,
    whitespace: WhitespaceConfig,
}

impl BrowserRenderer {
    pub fn new(
        capture: BrowserCapture,
        page_url: impl Into<String>,
        whitespace: WhitespaceConfig,
    ) -> Self {
        Self {
            capture,
            page_url: page_url.into(),
            whitespace,
        }
    }
}

impl Renderer for BrowserRenderer {
    fn render(&self) -> BoxFuture<'_, Result<RgbImage>> {
        Box::pin(async move {
            let (image, _report) = self
                .capture
                .capture_trimmed(&self.page_url, &self.whitespace)
                .await?;
            Ok(image)
        })
    }
}

/// An encoded render.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub png: Bytes,
    /// Image fingerprint of `png`.
    pub hash: String,
    /// Content fingerprint the image was rendered from.
    pub content_hash: String,
    pub size: FrameSize,
    pub rendered_at: DateTime<Utc>,
}

#[derive(Default)]
struct CacheState {
    current: Option<Rendered>,
    invalidated: bool,
}

/// Single-slot render cache.
#[derive(Default)]
pub struct ScreenshotCache {
    state: Mutex<CacheState>,
}

impl ScreenshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached render, if any, without rendering.
    pub async fn peek(&self) -> Option<Rendered> {
        self.state.lock().await.current.clone()
    }

    /// Force the next [`get_or_render`](Self::get_or_render) to render.
    pub async fn invalidate(&self) {
        self.state.lock().await.invalidated = true;
    }

    /// The render for `content_hash`, rendering if the cache is stale.
    ///
    /// A failed render leaves the cache untouched and falls back to the
    /// previous image when there is one.
    pub async fn get_or_render(
        &self,
        content_hash: &str,
        renderer: &dyn Renderer,
    ) -> Result<Rendered> {
        let mut state = self.state.lock().await;

        if let Some(current) = &state.current {
            if !state.invalidated && current.content_hash == content_hash {
                return Ok(current.clone());
            }
        }

        match render_png(content_hash, renderer).await {
            Ok(rendered) => {
                info!(
                    "Rendered {} image {} (content {})",
                    rendered.size, rendered.hash, content_hash
                );
                state.current = Some(rendered.clone());
                state.invalidated = false;
                Ok(rendered)
            }
            Err(e) => match &state.current {
                Some(stale) => {
                    warn!("Render failed, serving previous image: {}", e);
                    Ok(stale.clone())
                }
                None => Err(e),
            },
        }
    }
}

async fn render_png(content_hash: &str, renderer: &dyn Renderer) -> Result<Rendered> {
    let image = renderer.render().await?;
    let size = FrameSize::new(image.width(), image.height());
    let png = ecal_image::encode_png(&image)?;
    Ok(Rendered {
        hash: image_fingerprint(&png),
        png: Bytes::from(png),
        content_hash: content_hash.to_string(),
        size,
        rendered_at: Utc::now(),
    })
}
