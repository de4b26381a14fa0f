//! EXIF orientation handling for uploaded photos.
//!
//! Two compensation tables exist because two receiver revisions were deployed
//! with different panel mounts. They are kept apart on purpose; choosing one
//! is a device configuration decision.

use crate::errors::Result;
use crate::render::rotate;
use ecal_common::Rotation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// Table mapping EXIF orientation tags to a counterclockwise rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExifCompensation {
    /// Upload receiver: 3 → 180°, 6 → 90°, 8 → 270°
    #[default]
    Receiver,
    /// Mount-offset panel: 3 → 180°, 6 → 270°, 8 → 90°
    MountOffset,
}

impl ExifCompensation {
    /// Rotation for an EXIF orientation tag. Tags other than 3, 6 and 8 map to none.
    pub fn rotation_for(&self, orientation: u8) -> Rotation {
        match (self, orientation) {
            (_, 3) => Rotation::Ccw180,
            (Self::Receiver, 6) => Rotation::Ccw90,
            (Self::Receiver, 8) => Rotation::Ccw270,
            (Self::MountOffset, 6) => Rotation::Ccw270,
            (Self::MountOffset, 8) => Rotation::Ccw90,
            _ => Rotation::None,
        }
    }
}

/// A decoded image with the orientation tag found in its metadata.
#[derive(Debug, Clone)]
pub struct Oriented {
    pub image: DynamicImage,
    /// EXIF orientation tag (1..=8), if the container carried one.
    pub exif: Option<u8>,
}

/// Decode `bytes`, guessing the format, and read the orientation tag.
pub fn decode_with_orientation(bytes: &[u8]) -> Result<Oriented> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()?;
    // Missing or unreadable metadata is not an error
    let exif = decoder.orientation().ok().map(|o| o.to_exif());
    let image = DynamicImage::from_decoder(decoder)?;
    Ok(Oriented { image, exif })
}

/// Rotate `oriented` according to its EXIF tag and `table`.
pub fn compensate(oriented: Oriented, table: ExifCompensation) -> DynamicImage {
    match oriented.exif {
        Some(tag) => {
            let rotation = table.rotation_for(tag);
            if rotation != Rotation::None {
                debug!("EXIF orientation {} -> rotating {}", tag, rotation);
            }
            rotate(oriented.image, rotation)
        }
        None => oriented.image,
    }
}
