//! Error types for image processing.

use crate::geometry::GeometryError;
use ecal_common::FrameSize;
use thiserror::Error;

/// Errors raised while decoding, transforming or encoding an image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Placement could not be computed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Decoding or encoding failed.
    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    /// Reading the byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A buffer did not have the size the caller required.
    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: FrameSize, actual: FrameSize },
}

/// Result alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;
