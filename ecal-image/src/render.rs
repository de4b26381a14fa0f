//! Pixel operations that carry out a [`Placement`].

use crate::geometry::{Layout, Placement};
use ecal_common::{FrameSize, Rotation};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

/// Background colour of padded frames and the white test of the cropper.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// A white canvas of the given size.
pub fn white_canvas(size: FrameSize) -> RgbImage {
    RgbImage::from_pixel(size.width, size.height, WHITE)
}

/// Rotate counterclockwise by `rotation`.
///
/// `image` rotates clockwise, so a counterclockwise quarter turn is its
/// `rotate270`.
pub fn rotate(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => image,
        Rotation::Ccw90 => image.rotate270(),
        Rotation::Ccw180 => image.rotate180(),
        Rotation::Ccw270 => image.rotate90(),
    }
}

/// Resize exactly to `size` with the Lanczos3 filter.
pub fn resize_exact(image: &RgbImage, size: FrameSize) -> RgbImage {
    if image.dimensions() == (size.width, size.height) {
        return image.clone();
    }
    imageops::resize(image, size.width, size.height, FilterType::Lanczos3)
}

/// Apply `placement` to `image`, producing a buffer of exactly `frame` size.
pub fn compose(image: DynamicImage, placement: &Placement, frame: FrameSize) -> RgbImage {
    let rotated = rotate(image, placement.rotation).to_rgb8();
    let scaled = resize_exact(&rotated, placement.scaled);

    let output = match placement.layout {
        Layout::Pad { x, y } => {
            let mut canvas = white_canvas(frame);
            imageops::overlay(&mut canvas, &scaled, i64::from(x), i64::from(y));
            canvas
        }
        Layout::Crop(rect) => {
            let cropped =
                imageops::crop_imm(&scaled, rect.x, rect.y, rect.width, rect.height).to_image();
            if rect.size() == frame {
                cropped
            } else {
                // Truncation left the scaled image a pixel short of the frame
                let mut canvas = white_canvas(frame);
                let x = frame.width.saturating_sub(rect.width) / 2;
                let y = frame.height.saturating_sub(rect.height) / 2;
                imageops::overlay(&mut canvas, &cropped, i64::from(x), i64::from(y));
                canvas
            }
        }
    };

    debug!("Composed {} onto {} frame", placement.scaled, frame);
    output
}
