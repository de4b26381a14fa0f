//! End-to-end checks of the capture and upload image paths.

use ecal_common::{FrameSize, Rotation};
use ecal_image::{
    compensate, decode_with_orientation, encode_png, fit_capture, place_on_frame,
    ExifCompensation, FitOptions, FitPolicy, Layout, RotationMode, WhitespaceConfig,
};
use image::{DynamicImage, Rgb, RgbImage};
use pretty_assertions::assert_eq;

const FRAME: FrameSize = FrameSize::new(960, 680);

fn solid(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 30, 30])))
}

fn auto() -> FitOptions {
    FitOptions {
        policy: FitPolicy::FitWithoutCrop,
        rotation_mode: RotationMode::Auto,
        auto_zoom: None,
    }
}

#[test]
fn portrait_upload_on_landscape_frame_rotates_and_fills() {
    let (out, placement) = place_on_frame(solid(600, 800), FRAME, &auto()).unwrap();

    assert_eq!(placement.rotation, Rotation::Ccw270);
    assert_eq!(placement.policy, FitPolicy::FillMayCrop);
    assert_eq!(out.dimensions(), (960, 680));
    // Filled: no white padding anywhere on the edges
    assert_eq!(out.get_pixel(0, 0), &Rgb([30, 30, 30]));
    assert_eq!(out.get_pixel(959, 679), &Rgb([30, 30, 30]));
}

#[test]
fn landscape_upload_on_landscape_frame_letterboxes() {
    let (out, placement) = place_on_frame(solid(800, 600), FRAME, &auto()).unwrap();

    assert_eq!(placement.rotation, Rotation::None);
    assert_eq!(placement.policy, FitPolicy::FitWithoutCrop);
    assert!((placement.scale - 1.1333).abs() < 1e-3);
    assert_eq!(placement.scaled, FrameSize::new(906, 680));
    assert_eq!(placement.layout, Layout::Pad { x: 27, y: 0 });

    assert_eq!(out.dimensions(), (960, 680));
    assert_eq!(out.get_pixel(0, 340), &Rgb([255, 255, 255]));
    assert_eq!(out.get_pixel(26, 340), &Rgb([255, 255, 255]));
    assert_eq!(out.get_pixel(480, 340), &Rgb([30, 30, 30]));
    assert_eq!(out.get_pixel(959, 340), &Rgb([255, 255, 255]));
}

#[test]
fn oversized_capture_is_hard_cropped_then_trimmed() {
    let target = FrameSize::new(1600, 1200);

    // Content down to row 1119, then 80 blank rows, then 200 rows of overscan
    let mut capture = RgbImage::from_pixel(1600, 1400, Rgb([255, 255, 255]));
    for y in 0..1120 {
        for x in (0..1600).step_by(4) {
            capture.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    for y in 1200..1400 {
        for x in 0..1600 {
            capture.put_pixel(x, y, Rgb([0, 0, 255]));
        }
    }

    let (out, report) = fit_capture(
        DynamicImage::ImageRgb8(capture),
        target,
        &WhitespaceConfig::default(),
    )
    .unwrap();

    assert_eq!(report.original, target);
    assert_eq!(report.last_content_row, Some(1119));
    assert_eq!(report.bottom, 1125);
    assert_eq!(report.whitespace_height(), 75);
    assert_eq!(out.dimensions(), (1600, 1200));
}

#[test]
fn upload_bytes_round_through_orientation_and_geometry() {
    let png = encode_png(&RgbImage::from_pixel(600, 800, Rgb([0, 0, 0]))).unwrap();
    let oriented = decode_with_orientation(&png).unwrap();
    let image = compensate(oriented, ExifCompensation::Receiver);

    let options = FitOptions {
        rotation_mode: RotationMode::Landscape,
        ..FitOptions::default()
    };
    let (out, placement) = place_on_frame(image, FRAME, &options).unwrap();

    assert_eq!(placement.rotation, Rotation::Ccw270);
    // Landscape keeps fit-without-crop unless auto-zoom is asked for
    assert_eq!(placement.policy, FitPolicy::FitWithoutCrop);
    assert_eq!(out.dimensions(), (960, 680));
}
