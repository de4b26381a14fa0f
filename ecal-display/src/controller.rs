//! Serialized access to the panel.

use crate::errors::Result;
use crate::panel::{check_size, Panel};
use ecal_common::FrameSize;
use ecal_image::{place_on_frame, FitOptions, Placement};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Thread-safe panel wrapper. Cloning shares the panel.
#[derive(Clone)]
pub struct DisplayController {
    panel: Arc<Mutex<Box<dyn Panel>>>,
    size: FrameSize,
}

impl DisplayController {
    pub fn new(panel: Box<dyn Panel>) -> Self {
        let size = panel.size();
        Self {
            panel: Arc::new(Mutex::new(panel)),
            size,
        }
    }

    /// Panel resolution.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// Paint a frame-sized buffer.
    pub async fn show(&self, image: &RgbImage) -> Result<()> {
        check_size(self.size, image)?;
        let mut panel = self.panel.lock().await;
        panel.show(image).await
    }

    /// Fit `image` to the panel under `options` and paint it.
    pub async fn present(&self, image: DynamicImage, options: FitOptions) -> Result<Placement> {
        let size = self.size;
        let (frame, placement) =
            tokio::task::spawn_blocking(move || place_on_frame(image, size, &options)).await??;
        info!(
            "Placing {} on {}: rotate {}, {:?} x{:.4}",
            placement.source, size, placement.rotation, placement.policy, placement.scale
        );
        self.show(&frame).await?;
        Ok(placement)
    }
}
