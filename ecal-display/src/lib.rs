//! # ecal-display: the device side of the e-paper calendar
//!
//! One binary, two service modes chosen by the device config:
//!
//! - **image_receiver**: `POST /upload` accepts an image, compensates its
//!   EXIF orientation, places it on the panel frame and paints it
//! - **calendar_sync**: polls the calendar server's `/hash` every few
//!   seconds and paints `/image` when it changes
//!
//! Both go through a [`DisplayController`], which serializes access to the
//! [`Panel`].
//!
//! ```no_run
//! use ecal_display::{router, DisplayConfig, DisplayController, ReceiverState};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = DisplayConfig::default();
//! let controller = DisplayController::new(config.panel.build());
//! let state = Arc::new(ReceiverState::new(controller, config.fit.clone()));
//!
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()?).await?;
//! axum::serve(listener, router(state, config.http.max_upload_bytes)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod calendar_sync;
pub mod config;
pub mod controller;
pub mod errors;
pub mod panel;
pub mod receiver;

#[cfg(feature = "cli")]
pub mod args;

pub use calendar_sync::PanelPublisher;
pub use config::{DisplayConfig, ServiceMode};
pub use controller::DisplayController;
pub use errors::{DisplayError, Result};
pub use panel::{CommandPanel, FilePanel, Panel};
pub use receiver::{router, ReceiverState};
