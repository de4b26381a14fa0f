//! # ecal-server: the calendar web server
//!
//! Serves calendar events and settings to the calendar page, renders the
//! page to a PNG with a headless browser, and exposes the image and its
//! fingerprint to sync loops.
//!
//! | Route | Method | |
//! |-------|--------|-|
//! | `/api/events` | GET | events of the configured calendars |
//! | `/api/calendar_list` | GET | calendars the source knows |
//! | `/api/settings` | GET, POST | read or merge settings |
//! | `/image` | GET | current PNG |
//! | `/hash` | GET | `{hash, refresh}` |
//! | `/api/refresh` | POST | re-render and flag the next poll |
//! | `/api/status` | GET, POST | sync loop state |
//! | `/api/logs` | GET | recent log lines |
//! | `/api/sync`, `/api/sync/start`, `/api/sync/stop` | GET, POST | sync service process |
//!
//! All mutable state lives in [`AppState`], built once and shared by the
//! handlers.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod logs;
pub mod routes;
pub mod screenshot;
pub mod settings_store;
pub mod state;
pub mod status;

#[cfg(feature = "cli")]
pub mod args;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use logs::{LogBuffer, LogBufferLayer, LogLine};
pub use routes::router;
pub use screenshot::{BrowserRenderer, Rendered, Renderer, ScreenshotCache};
pub use settings_store::SettingsStore;
pub use state::AppState;
pub use status::{StatusBoard, SyncProcess, SyncProcessInfo};
