//! Blank-margin trimming for raw browser captures.
//!
//! Headless browsers render the calendar page into a fixed viewport, so the
//! bottom of the capture is usually a band of empty page. This module finds
//! that band (and any blank band at the top), crops it away and resizes the
//! remainder back to the declared capture size.
//!
//! Only raw capture output goes through here. Uploaded photos are never
//! trimmed.

use crate::errors::Result;
use crate::geometry::GeometryError;
use crate::render::resize_exact;
use ecal_common::FrameSize;
use image::imageops;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Thresholds for the whitespace scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitespaceConfig {
    /// A channel value above this counts as white
    #[serde(default = "default_white_threshold")]
    pub white_threshold: u8,

    /// Minimum fraction of non-white samples for a content row
    #[serde(default = "default_content_ratio")]
    pub content_ratio: f64,

    /// Minimum fraction of white samples for a white row
    #[serde(default = "default_white_row_ratio")]
    pub white_row_ratio: f64,

    /// Target number of sampled columns per row
    #[serde(default = "default_sample_columns")]
    pub sample_columns: u32,

    /// Rows scanned upwards from the bottom edge
    #[serde(default = "default_bottom_window")]
    pub bottom_window: u32,

    /// Rows scanned downwards from the top edge
    #[serde(default = "default_top_window")]
    pub top_window: u32,

    /// Rows kept below the last content row
    #[serde(default = "default_content_margin")]
    pub content_margin: u32,

    /// Consecutive white rows that make a blank band
    #[serde(default = "default_white_run")]
    pub white_run: u32,
}

fn default_white_threshold() -> u8 {
    240
}

fn default_content_ratio() -> f64 {
    0.02
}

fn default_white_row_ratio() -> f64 {
    0.90
}

fn default_sample_columns() -> u32 {
    50
}

fn default_bottom_window() -> u32 {
    400
}

fn default_top_window() -> u32 {
    100
}

fn default_content_margin() -> u32 {
    6
}

fn default_white_run() -> u32 {
    3
}

impl Default for WhitespaceConfig {
    fn default() -> Self {
        Self {
            white_threshold: default_white_threshold(),
            content_ratio: default_content_ratio(),
            white_row_ratio: default_white_row_ratio(),
            sample_columns: default_sample_columns(),
            bottom_window: default_bottom_window(),
            top_window: default_top_window(),
            content_margin: default_content_margin(),
            white_run: default_white_run(),
        }
    }
}

/// Outcome of a whitespace scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropReport {
    /// Size of the scanned image.
    pub original: FrameSize,
    /// Lowest row with content inside the bottom window.
    pub last_content_row: Option<u32>,
    /// Exclusive end suggested by the first blank band found bottom-up.
    pub white_run_boundary: Option<u32>,
    /// First row kept.
    pub top: u32,
    /// Exclusive end of the rows kept.
    pub bottom: u32,
}

impl CropReport {
    /// True if any rows are removed.
    pub fn should_crop(&self) -> bool {
        self.top > 0 || self.bottom < self.original.height
    }

    /// Rows removed at the bottom.
    pub fn whitespace_height(&self) -> u32 {
        self.original.height - self.bottom
    }

    /// Size of the kept region.
    pub fn cropped_size(&self) -> FrameSize {
        FrameSize::new(self.original.width, self.bottom - self.top)
    }
}

/// Samples one row at a fixed column stride.
struct RowSampler<'a> {
    image: &'a RgbImage,
    step: usize,
    threshold: u8,
}

impl<'a> RowSampler<'a> {
    fn new(image: &'a RgbImage, config: &WhitespaceConfig) -> Self {
        let step = (image.width() / config.sample_columns.max(1)).max(1) as usize;
        Self {
            image,
            step,
            threshold: config.white_threshold,
        }
    }

    /// Fraction of sampled pixels in row `y` that are white.
    fn white_ratio(&self, y: u32) -> f64 {
        let mut sampled = 0u32;
        let mut white = 0u32;
        for x in (0..self.image.width()).step_by(self.step) {
            let [r, g, b] = self.image.get_pixel(x, y).0;
            if r > self.threshold && g > self.threshold && b > self.threshold {
                white += 1;
            }
            sampled += 1;
        }
        if sampled == 0 {
            return 1.0;
        }
        f64::from(white) / f64::from(sampled)
    }
}

/// Scan `image` and decide which rows to keep.
///
/// The bottom boundary is the more aggressive of the two signals: the blank
/// band found bottom-up, or the last content row plus its margin. It never
/// cuts into the last content row itself. With no content row in the bottom
/// window the blank band alone decides. A blank top band is trimmed only when
/// a non-white row ends it inside the top window, so an image whose whole top
/// window is white keeps its top edge.
pub fn detect(image: &RgbImage, config: &WhitespaceConfig) -> CropReport {
    let (width, height) = image.dimensions();
    let original = FrameSize::new(width, height);
    if original.is_empty() {
        return CropReport {
            original,
            last_content_row: None,
            white_run_boundary: None,
            top: 0,
            bottom: height,
        };
    }

    let sampler = RowSampler::new(image, config);
    let window_start = height - config.bottom_window.min(height);

    let last_content_row = (window_start..height)
        .rev()
        .find(|&y| 1.0 - sampler.white_ratio(y) >= config.content_ratio);

    let mut run = 0;
    let mut white_run_boundary = None;
    for y in (window_start..height).rev() {
        if sampler.white_ratio(y) >= config.white_row_ratio {
            run += 1;
            if run >= config.white_run {
                white_run_boundary = Some(y + 1);
                break;
            }
        } else {
            run = 0;
        }
    }

    let run_bottom = white_run_boundary.unwrap_or(height);
    let bottom = match last_content_row {
        Some(row) => run_bottom
            .min(row + config.content_margin)
            .max(row + 1)
            .min(height),
        None => run_bottom,
    };

    let top_window = config.top_window.min(bottom);
    let leading = (0..top_window)
        .position(|y| sampler.white_ratio(y) < config.white_row_ratio)
        .map(|n| n as u32);
    let top = match leading {
        Some(n) if n >= config.white_run && n < bottom => n,
        _ => 0,
    };

    CropReport {
        original,
        last_content_row,
        white_run_boundary,
        top,
        bottom,
    }
}

/// Trim blank margins from `image` and resize the rest to exactly `target`.
///
/// # Errors
///
/// Fails with a geometry error if either `image` or `target` is empty.
pub fn crop_whitespace(
    image: RgbImage,
    target: FrameSize,
    config: &WhitespaceConfig,
) -> Result<(RgbImage, CropReport)> {
    let size = FrameSize::new(image.width(), image.height());
    if size.is_empty() {
        return Err(GeometryError::EmptyImage(size).into());
    }
    if target.is_empty() {
        return Err(GeometryError::EmptyFrame(target).into());
    }

    let report = detect(&image, config);
    debug!(
        "Whitespace scan: last_content_row={:?} white_run_boundary={:?} top={} bottom={}",
        report.last_content_row, report.white_run_boundary, report.top, report.bottom
    );

    let trimmed = if report.should_crop() {
        let kept = report.cropped_size();
        info!(
            "Trimming whitespace: {} -> {} ({} rows from top, {} from bottom)",
            size,
            kept,
            report.top,
            report.whitespace_height()
        );
        imageops::crop_imm(&image, 0, report.top, kept.width, kept.height).to_image()
    } else {
        image
    };

    Ok((resize_exact(&trimmed, target), report))
}

/// Prepare a raw capture: hard-crop overscan, trim whitespace, resize to `target`.
///
/// The browser is asked for a viewport taller than `target`; everything
/// beyond `target` (measured from the top-left corner) is discarded first.
pub fn fit_capture(
    capture: DynamicImage,
    target: FrameSize,
    config: &WhitespaceConfig,
) -> Result<(RgbImage, CropReport)> {
    let mut rgb = capture.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width > target.width || height > target.height {
        let keep = FrameSize::new(width.min(target.width), height.min(target.height));
        debug!("Hard-cropping capture {}x{} to {}", width, height, keep);
        rgb = imageops::crop_imm(&rgb, 0, 0, keep.width, keep.height).to_image();
    }
    crop_whitespace(rgb, target, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    /// White image with solid content rows in `rows`.
    fn page(width: u32, height: u32, rows: std::ops::Range<u32>) -> RgbImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for y in rows {
            for x in 0..width {
                img.put_pixel(x, y, BLACK);
            }
        }
        img
    }

    #[test]
    fn test_default_config() {
        let config = WhitespaceConfig::default();
        assert_eq!(config.white_threshold, 240);
        assert_eq!(config.bottom_window, 400);
        assert_eq!(config.content_margin, 6);
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: WhitespaceConfig = serde_json::from_str(r#"{"bottom_window": 200}"#).unwrap();
        assert_eq!(config.bottom_window, 200);
        assert_eq!(config.white_run, 3);
    }

    #[test]
    fn test_detect_bottom_band() {
        let img = page(100, 200, 0..150);
        let report = detect(&img, &WhitespaceConfig::default());

        assert_eq!(report.last_content_row, Some(149));
        assert_eq!(report.white_run_boundary, Some(198));
        assert_eq!(report.bottom, 155);
        assert_eq!(report.top, 0);
        assert_eq!(report.whitespace_height(), 45);
        assert!(report.should_crop());
    }

    #[test]
    fn test_short_band_uses_white_run() {
        // Three blank rows below content: the white run is tighter than the margin
        let img = page(100, 100, 0..97);
        let report = detect(&img, &WhitespaceConfig::default());
        assert_eq!(report.last_content_row, Some(96));
        assert_eq!(report.white_run_boundary, Some(98));
        assert_eq!(report.bottom, 98);
        assert!(report.should_crop());
    }

    #[test]
    fn test_no_content_in_window_uses_white_run() {
        let img = page(100, 600, 0..50);
        let report = detect(&img, &WhitespaceConfig::default());
        assert_eq!(report.last_content_row, None);
        assert_eq!(report.white_run_boundary, Some(598));
        assert_eq!(report.bottom, 598);
    }

    #[test]
    fn test_white_run_above_content_never_drops_content() {
        // The only blank band sits above the last content row
        let mut img = page(100, 100, 0..100);
        for y in 50..54 {
            for x in 0..100 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let report = detect(&img, &WhitespaceConfig::default());
        assert_eq!(report.last_content_row, Some(99));
        assert_eq!(report.white_run_boundary, Some(52));
        assert_eq!(report.bottom, 100);
    }

    #[test]
    fn test_blank_top_window_keeps_top_edge() {
        let img = page(100, 300, 150..200);
        let report = detect(&img, &WhitespaceConfig::default());
        assert_eq!(report.top, 0);
        assert_eq!(report.bottom, 205);
    }

    #[test]
    fn test_light_pixels_count_as_content() {
        let mut img = page(100, 100, 0..0);
        for x in 0..100 {
            img.put_pixel(x, 40, Rgb([240, 240, 240]));
        }
        let report = detect(&img, &WhitespaceConfig::default());
        assert_eq!(report.last_content_row, Some(40));
    }

    #[test]
    fn test_top_band_trimmed() {
        let img = page(100, 200, 10..150);
        let report = detect(&img, &WhitespaceConfig::default());
        assert_eq!(report.top, 10);
        assert_eq!(report.cropped_size(), FrameSize::new(100, 145));
    }

    #[test]
    fn test_short_top_band_kept() {
        let img = page(100, 200, 2..150);
        let report = detect(&img, &WhitespaceConfig::default());
        assert_eq!(report.top, 0);
    }

    #[test]
    fn test_crop_is_idempotent() {
        let config = WhitespaceConfig::default();
        let img = page(120, 300, 20..210);
        let first = detect(&img, &config);
        assert!(first.should_crop());

        let crop = |img: &RgbImage, report: &CropReport| {
            let kept = report.cropped_size();
            imageops::crop_imm(img, 0, report.top, kept.width, kept.height).to_image()
        };

        // Every pass keeps the same content rows
        let mut current = crop(&img, &first);
        let content_end = first.last_content_row.unwrap() - first.top;
        for _ in 0..3 {
            let report = detect(&current, &config);
            assert_eq!(report.top, 0);
            assert_eq!(report.last_content_row, Some(content_end));
            assert!(report.bottom > content_end);
            current = crop(&current, &report);
        }

        // and the blank tail settles
        let settled = detect(&current, &config);
        assert!(!settled.should_crop());
    }

    #[test]
    fn test_crop_resizes_to_target() {
        let target = FrameSize::new(100, 200);
        let (out, report) =
            crop_whitespace(page(100, 200, 0..150), target, &WhitespaceConfig::default())
                .unwrap();
        assert_eq!(report.bottom, 155);
        assert_eq!(out.dimensions(), (100, 200));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let config = WhitespaceConfig::default();
        assert!(crop_whitespace(RgbImage::new(0, 10), FrameSize::new(10, 10), &config).is_err());
        assert!(crop_whitespace(page(10, 10, 0..5), FrameSize::new(0, 10), &config).is_err());
    }
}
