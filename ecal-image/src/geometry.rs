//! Fit policies and rotation resolution for placing an image on an e-paper frame.
//!
//! This module is pure arithmetic: it decides the rotation, the scale factor,
//! the scaled size and either the crop box (fill) or the padding offset (fit).
//! Pixels are only touched by [`crate::render::compose`].
//!
//! Numeric behaviour is kept bit-for-bit with the reference renderer: scaled
//! sizes are truncated, and crop/pad offsets use floor division, which leaves
//! a one-pixel bias on odd deltas.

use ecal_common::{FrameSize, Rect, Rotation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Rotated utilization must beat the unrotated one by more than this factor.
pub const AUTO_ROTATE_GAIN: f64 = 1.05;

/// Errors raised for geometry that cannot be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The source image has a zero dimension.
    #[error("Image has no area: {0}")]
    EmptyImage(FrameSize),

    /// The target frame has a zero dimension.
    #[error("Frame has no area: {0}")]
    EmptyFrame(FrameSize),

    /// A test override angle that is not a quarter turn.
    #[error("Unsupported rotation angle: {0}° (expected 0, 90, 180 or 270)")]
    UnsupportedAngle(u32),
}

/// Scaling policies for placing an image on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitPolicy {
    /// Scale to fit inside the frame, pad the remainder with white
    #[default]
    FitWithoutCrop,
    /// Scale to cover the frame, crop the overflow around the centre
    FillMayCrop,
}

impl FitPolicy {
    /// Policy selected by the `zoom_to_fit` flag of the upload form.
    pub fn from_zoom_to_fit(zoom_to_fit: bool) -> Self {
        if zoom_to_fit {
            Self::FillMayCrop
        } else {
            Self::FitWithoutCrop
        }
    }

    /// Scale factor for placing `source` on `frame` under this policy.
    ///
    /// Callers must have rejected empty sizes first.
    pub fn scale(&self, source: FrameSize, frame: FrameSize) -> f64 {
        let width_ratio = f64::from(frame.width) / f64::from(source.width);
        let height_ratio = f64::from(frame.height) / f64::from(source.height);
        match self {
            Self::FitWithoutCrop => width_ratio.min(height_ratio),
            Self::FillMayCrop => width_ratio.max(height_ratio),
        }
    }
}

impl fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FitWithoutCrop => write!(f, "fit-without-crop"),
            Self::FillMayCrop => write!(f, "fill-may-crop"),
        }
    }
}

/// How the rotation applied before scaling is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationMode {
    /// Fixed 270° counterclockwise, the mount compensation of the reference panel
    #[default]
    Landscape,
    /// Fixed 90° counterclockwise
    Portrait,
    /// Rotate only when it improves frame coverage by more than 5%
    Auto,
    /// Diagnostic: rotate by exactly this angle
    TestOverride(Rotation),
}

impl RotationMode {
    /// Parse a mode string from a form field or config file.
    ///
    /// Unknown strings fall back to [`RotationMode::Landscape`], which rotates
    /// 270°. This matches the deployed receivers and must not become
    /// "no rotation".
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "landscape" => Self::Landscape,
            "portrait" => Self::Portrait,
            "auto" => Self::Auto,
            other => {
                warn!("Unknown rotation mode '{}', falling back to landscape", other);
                Self::Landscape
            }
        }
    }

    /// Build a test override from an angle in degrees.
    pub fn test_override(degrees: u32) -> Result<Self, GeometryError> {
        Rotation::from_degrees(degrees)
            .map(Self::TestOverride)
            .ok_or(GeometryError::UnsupportedAngle(degrees))
    }

    /// Whether a rotation switches to fill mode when the caller left auto-zoom unset.
    ///
    /// Landscape suppresses auto-zoom by default; every other mode enables it.
    pub const fn default_auto_zoom(&self) -> bool {
        !matches!(self, Self::Landscape)
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Landscape => write!(f, "landscape"),
            Self::Portrait => write!(f, "portrait"),
            Self::Auto => write!(f, "auto"),
            Self::TestOverride(rotation) => write!(f, "test-{}", rotation.degrees()),
        }
    }
}

/// Caller-selected options for one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FitOptions {
    /// Requested scaling policy (may be overridden by auto-zoom).
    pub policy: FitPolicy,
    /// How to pick the rotation.
    pub rotation_mode: RotationMode,
    /// Explicit auto-zoom choice; `None` uses the mode's default.
    pub auto_zoom: Option<bool>,
}

impl FitOptions {
    /// Auto-zoom setting in effect for these options.
    pub fn effective_auto_zoom(&self) -> bool {
        self.auto_zoom
            .unwrap_or_else(|| self.rotation_mode.default_auto_zoom())
    }
}

/// Where the scaled image lands on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Centre-crop box inside the scaled image (fill).
    Crop(Rect),
    /// Top-left offset of the scaled image on a white frame (fit).
    Pad { x: u32, y: u32 },
}

/// Complete placement decision for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Size of the image as decoded.
    pub source: FrameSize,
    /// Rotation applied before scaling.
    pub rotation: Rotation,
    /// Policy actually used (after auto-zoom).
    pub policy: FitPolicy,
    /// Uniform scale factor.
    pub scale: f64,
    /// Size after rotation and scaling.
    pub scaled: FrameSize,
    /// Crop box or padding offset.
    pub layout: Layout,
}

impl Placement {
    /// Size of the image after rotation, before scaling.
    pub fn rotated(&self) -> FrameSize {
        self.rotation.apply_to(self.source)
    }

    /// True if a rotation was applied.
    pub fn is_rotated(&self) -> bool {
        self.rotation != Rotation::None
    }
}

/// Compute the placement of an image of size `source` on `frame`.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyImage`] or [`GeometryError::EmptyFrame`] if
/// either size has a zero dimension.
pub fn plan(
    source: FrameSize,
    frame: FrameSize,
    options: &FitOptions,
) -> Result<Placement, GeometryError> {
    if source.is_empty() {
        return Err(GeometryError::EmptyImage(source));
    }
    if frame.is_empty() {
        return Err(GeometryError::EmptyFrame(frame));
    }

    let rotation = resolve_rotation(source, frame, options.rotation_mode);
    let working = rotation.apply_to(source);

    let policy = if rotation != Rotation::None && options.effective_auto_zoom() {
        FitPolicy::FillMayCrop
    } else {
        options.policy
    };

    let scale = policy.scale(working, frame);
    let scaled = scaled_size(working, scale);

    let layout = match policy {
        FitPolicy::FitWithoutCrop => Layout::Pad {
            x: frame.width.saturating_sub(scaled.width) / 2,
            y: frame.height.saturating_sub(scaled.height) / 2,
        },
        FitPolicy::FillMayCrop => Layout::Crop(center_crop(scaled, frame)),
    };

    debug!(
        "Placement: source={} rotation={} policy={} scale={:.4} scaled={} frame={}",
        source, rotation, policy, scale, scaled, frame
    );

    Ok(Placement {
        source,
        rotation,
        policy,
        scale,
        scaled,
        layout,
    })
}

/// Resolve the rotation for `mode`. Exactly one rotation (possibly none) results.
pub fn resolve_rotation(source: FrameSize, frame: FrameSize, mode: RotationMode) -> Rotation {
    match mode {
        RotationMode::Landscape => Rotation::Ccw270,
        RotationMode::Portrait => Rotation::Ccw90,
        RotationMode::TestOverride(rotation) => rotation,
        RotationMode::Auto => auto_rotation(source, frame),
    }
}

/// Orientation-aware rotation: turn only when coverage improves by more than 5%.
///
/// The direction keeps the picture upright on the reference mount: a portrait
/// image on a landscape frame turns 270°, a landscape image on a portrait
/// frame turns 90°. Equal orientations never rotate.
fn auto_rotation(source: FrameSize, frame: FrameSize) -> Rotation {
    let candidate = if source.is_portrait() && frame.is_landscape() {
        Rotation::Ccw270
    } else if source.is_landscape() && frame.is_portrait() {
        Rotation::Ccw90
    } else {
        return Rotation::None;
    };

    let unrotated = utilization(source, frame);
    let rotated = utilization(candidate.apply_to(source), frame);

    debug!(
        "Auto rotation: unrotated={:.3} rotated={:.3} candidate={}",
        unrotated, rotated, candidate
    );

    if rotated > unrotated * AUTO_ROTATE_GAIN {
        candidate
    } else {
        Rotation::None
    }
}

/// Fraction of the frame covered when `source` is fitted without cropping.
pub fn utilization(source: FrameSize, frame: FrameSize) -> f64 {
    if source.is_empty() || frame.is_empty() {
        return 0.0;
    }
    let scale = FitPolicy::FitWithoutCrop.scale(source, frame);
    let covered = scaled_size(source, scale);
    covered.area() as f64 / frame.area() as f64
}

/// Multiply and truncate, never collapsing a side to zero.
fn scaled_size(source: FrameSize, scale: f64) -> FrameSize {
    FrameSize::new(
        ((f64::from(source.width) * scale) as u32).max(1),
        ((f64::from(source.height) * scale) as u32).max(1),
    )
}

/// Centred crop of `frame` out of `scaled`, clamped to the scaled image.
fn center_crop(scaled: FrameSize, frame: FrameSize) -> Rect {
    let x = scaled.width.saturating_sub(frame.width) / 2;
    let y = scaled.height.saturating_sub(frame.height) / 2;
    Rect::new(
        x,
        y,
        frame.width.min(scaled.width),
        frame.height.min(scaled.height),
    )
}
