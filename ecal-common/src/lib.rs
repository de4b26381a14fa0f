//! Common types shared across the e-paper calendar pipeline.
//!
//! This crate provides the small value types every stage agrees on:
//! - [`FrameSize`] - the fixed pixel size of a display or capture surface
//! - [`Rect`] - a crop box inside an image
//! - [`Rotation`] - a counterclockwise quarter-turn applied before scaling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of an output surface (e-paper panel or capture viewport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Create a new frame size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True if the surface is wider than it is tall.
    pub const fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// True if the surface is taller than it is wide.
    pub const fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// The same surface turned a quarter: width and height swapped.
    pub const fn transposed(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Get the area in pixels.
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl From<(u32, u32)> for FrameSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A rectangle defined by top-left position and dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the right edge (x + width).
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Get the bottom edge (y + height).
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Get the size of the rectangle.
    pub const fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// A counterclockwise rotation in quarter turns.
///
/// Angles follow the convention of the reference renderer: `Ccw270` is the
/// physical-mount compensation of the landscape panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    None,
    Ccw90,
    Ccw180,
    Ccw270,
}

impl Rotation {
    /// Parse an angle in degrees. Only 0, 90, 180 and 270 are accepted.
    pub const fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Self::None),
            90 => Some(Self::Ccw90),
            180 => Some(Self::Ccw180),
            270 => Some(Self::Ccw270),
            _ => None,
        }
    }

    /// The angle in degrees, counterclockwise.
    pub const fn degrees(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Ccw90 => 90,
            Self::Ccw180 => 180,
            Self::Ccw270 => 270,
        }
    }

    /// True if width and height trade places under this rotation.
    pub const fn swaps_axes(&self) -> bool {
        matches!(self, Self::Ccw90 | Self::Ccw270)
    }

    /// Size of an image of `size` after this rotation is applied.
    pub const fn apply_to(&self, size: FrameSize) -> FrameSize {
        if self.swaps_axes() {
            size.transposed()
        } else {
            size
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        let f = FrameSize::new(960, 680);
        assert!(f.is_landscape());
        assert!(!f.is_portrait());
        assert!(!f.is_empty());
        assert_eq!(f.area(), 652_800);
        assert_eq!(f.transposed(), FrameSize::new(680, 960));
        assert_eq!(f.to_string(), "960x680");
    }

    #[test]
    fn test_empty_frame() {
        assert!(FrameSize::new(0, 10).is_empty());
        assert!(FrameSize::new(10, 0).is_empty());
    }

    #[test]
    fn test_rect() {
        let r = Rect::new(10, 20, 100, 50);
        assert_eq!(r.right(), 110);
        assert_eq!(r.bottom(), 70);
        assert_eq!(r.size(), FrameSize::new(100, 50));
    }

    #[test]
    fn test_rotation_degrees() {
        for deg in [0, 90, 180, 270] {
            assert_eq!(Rotation::from_degrees(deg).unwrap().degrees(), deg);
        }
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::from_degrees(360), None);
    }

    #[test]
    fn test_rotation_apply() {
        let size = FrameSize::new(600, 800);
        assert_eq!(Rotation::Ccw270.apply_to(size), FrameSize::new(800, 600));
        assert_eq!(Rotation::Ccw180.apply_to(size), size);
        assert_eq!(Rotation::None.apply_to(size), size);
    }
}
