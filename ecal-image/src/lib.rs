//! # ecal-image: image geometry for e-paper frames
//!
//! Everything between a raw image and a frame-sized buffer ready for the
//! panel:
//!
//! - [`geometry`]: rotation and fit/fill placement, pure arithmetic
//! - [`render`]: applies a placement to pixels
//! - [`whitespace`]: trims blank margins from browser captures
//! - [`orientation`]: EXIF orientation compensation for uploads
//!
//! ## Example
//!
//! ```rust,no_run
//! use ecal_common::FrameSize;
//! use ecal_image::{place_on_frame, FitOptions, RotationMode};
//!
//! # fn example(img: image::DynamicImage) -> ecal_image::Result<()> {
//! let options = FitOptions {
//!     rotation_mode: RotationMode::Auto,
//!     ..FitOptions::default()
//! };
//! let (frame_image, placement) = place_on_frame(img, FrameSize::new(960, 680), &options)?;
//! assert_eq!(frame_image.dimensions(), (960, 680));
//! println!("rotated {}", placement.rotation);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod geometry;
pub mod orientation;
pub mod render;
pub mod whitespace;

pub use errors::{ImageError, Result};
pub use geometry::{
    plan, FitOptions, FitPolicy, GeometryError, Layout, Placement, RotationMode,
    AUTO_ROTATE_GAIN,
};
pub use orientation::{compensate, decode_with_orientation, ExifCompensation, Oriented};
pub use render::{compose, rotate};
pub use whitespace::{crop_whitespace, detect, fit_capture, CropReport, WhitespaceConfig};

use ecal_common::FrameSize;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Plan and compose `image` onto a frame in one step.
pub fn place_on_frame(
    image: DynamicImage,
    frame: FrameSize,
    options: &FitOptions,
) -> Result<(RgbImage, Placement)> {
    let placement = plan(FrameSize::new(image.width(), image.height()), frame, options)?;
    let composed = compose(image, &placement, frame);
    Ok((composed, placement))
}

/// Encode an RGB buffer as PNG.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Decode any supported format from memory, ignoring orientation metadata.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}
