//! Calendar-sync mode against an in-process fake of the calendar server.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use ecal_common::FrameSize;
use ecal_display::calendar_sync;
use ecal_display::config::CalendarSyncConfig;
use ecal_display::{DisplayController, Panel, PanelPublisher};
use ecal_image::{FitOptions, RotationMode};
use ecal_sync::{CalendarClient, HashPayload, Observation, Publisher, SyncError, SyncStatus};
use futures::future::BoxFuture;
use image::{Rgb, RgbImage};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Frames = Arc<Mutex<Vec<RgbImage>>>;

struct RecordingPanel {
    size: FrameSize,
    frames: Frames,
}

impl Panel for RecordingPanel {
    fn size(&self) -> FrameSize {
        self.size
    }

    fn show<'a>(&'a mut self, image: &'a RgbImage) -> BoxFuture<'a, ecal_display::Result<()>> {
        Box::pin(async move {
            self.frames.lock().unwrap().push(image.clone());
            Ok(())
        })
    }
}

struct Fake {
    hash: String,
    image: Vec<u8>,
    statuses: Vec<SyncStatus>,
}

type Shared = Arc<Mutex<Fake>>;

async fn hash(State(fake): State<Shared>) -> Json<HashPayload> {
    Json(HashPayload {
        hash: fake.lock().unwrap().hash.clone(),
        refresh: false,
    })
}

async fn image(State(fake): State<Shared>) -> Vec<u8> {
    fake.lock().unwrap().image.clone()
}

async fn status(State(fake): State<Shared>, Json(status): Json<SyncStatus>) -> StatusCode {
    fake.lock().unwrap().statuses.push(status);
    StatusCode::OK
}

async fn start_fake(png: Vec<u8>) -> (Shared, SocketAddr) {
    let fake = Arc::new(Mutex::new(Fake {
        hash: "first".to_string(),
        image: png,
        statuses: Vec::new(),
    }));
    let app = Router::new()
        .route("/hash", get(hash))
        .route("/image", get(image))
        .route("/api/status", post(status))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (fake, addr)
}

fn calendar_png() -> Vec<u8> {
    ecal_image::encode_png(&RgbImage::from_pixel(160, 120, Rgb([0, 128, 0]))).unwrap()
}

fn recording_controller(size: FrameSize) -> (DisplayController, Frames) {
    let frames = Frames::default();
    let panel = RecordingPanel {
        size,
        frames: frames.clone(),
    };
    (DisplayController::new(Box::new(panel)), frames)
}

async fn wait_for_frames(frames: &Frames, count: usize) {
    for _ in 0..100 {
        if frames.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("expected {} frames", count);
}

#[tokio::test]
async fn publisher_paints_server_image() {
    let (_fake, addr) = start_fake(calendar_png()).await;
    let client = CalendarClient::new(
        format!("http://{}", addr),
        Duration::from_secs(2),
        Duration::from_secs(5),
    )
    .unwrap();
    let (controller, frames) = recording_controller(FrameSize::new(120, 160));
    let mut publisher = PanelPublisher::new(client, controller, FitOptions::default());

    publisher.publish(&Observation::new("first")).await.unwrap();

    let frames = frames.lock().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].dimensions(), (120, 160));
    assert_eq!(frames[0].get_pixel(60, 80), &Rgb([0, 128, 0]));
}

#[tokio::test]
async fn undecodable_image_fails_publish() {
    let (_fake, addr) = start_fake(b"<html>oops</html>".to_vec()).await;
    let client = CalendarClient::new(
        format!("http://{}", addr),
        Duration::from_secs(2),
        Duration::from_secs(5),
    )
    .unwrap();
    let (controller, frames) = recording_controller(FrameSize::new(120, 160));
    let mut publisher = PanelPublisher::new(client, controller, FitOptions::default());

    let err = publisher.publish(&Observation::new("first")).await.unwrap_err();
    assert!(matches!(err, SyncError::Image(_)));
    assert!(frames.lock().unwrap().is_empty());
}

#[tokio::test]
async fn loop_repaints_only_on_change() {
    let (fake, addr) = start_fake(calendar_png()).await;
    let config = CalendarSyncConfig {
        server_url: format!("http://{}", addr),
        interval_secs: 1,
        ..CalendarSyncConfig::default()
    };
    let (controller, frames) = recording_controller(FrameSize::new(160, 120));
    let options = FitOptions {
        rotation_mode: RotationMode::Auto,
        ..FitOptions::default()
    };

    let task = calendar_sync::spawn(&config, controller, options).unwrap();
    wait_for_frames(&frames, 1).await;

    // Unchanged hash: the next tick skips
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(frames.lock().unwrap().len(), 1);

    fake.lock().unwrap().hash = "second".to_string();
    wait_for_frames(&frames, 2).await;

    let stats = task.shutdown().await.unwrap();
    assert_eq!(stats.published, 2);
    assert!(stats.skipped >= 1);

    let statuses = fake.lock().unwrap().statuses.clone();
    assert!(statuses.iter().any(|s| s.uploading));
    assert!(statuses.iter().all(|s| s.error.is_none()));
}
