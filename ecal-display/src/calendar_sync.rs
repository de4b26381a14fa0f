//! Calendar-sync mode: poll the server's hash and paint its image directly.

use crate::config::CalendarSyncConfig;
use crate::controller::DisplayController;
use crate::errors::{DisplayError, Result};
use ecal_image::FitOptions;
use ecal_sync::{
    CalendarClient, HttpHashSource, HttpStatusSink, NullStatus, Observation, Publisher,
    StatusSink, SyncError, SyncLoop, SyncStats, SyncTask, TickPolicy,
};
use std::future::Future;
use tracing::{debug, info};

/// Downloads the server's image and presents it on the panel.
#[derive(Clone)]
pub struct PanelPublisher {
    client: CalendarClient,
    controller: DisplayController,
    options: FitOptions,
}

impl PanelPublisher {
    pub fn new(client: CalendarClient, controller: DisplayController, options: FitOptions) -> Self {
        Self {
            client,
            controller,
            options,
        }
    }

    async fn paint(&self, hash: &str) -> Result<()> {
        let png = self.client.fetch_image().await?;
        debug!("Decoding image {} ({} bytes)", hash, png.len());
        let image = tokio::task::spawn_blocking(move || ecal_image::decode(&png)).await??;
        let placement = self.controller.present(image, self.options).await?;
        info!(
            "Displayed calendar image {} (rotate {})",
            hash, placement.rotation
        );
        Ok(())
    }
}

impl Publisher for PanelPublisher {
    async fn publish(&mut self, observation: &Observation) -> std::result::Result<(), SyncError> {
        self.paint(&observation.hash).await.map_err(SyncError::from)
    }
}

fn spawn_with<S: StatusSink + 'static>(
    client: CalendarClient,
    publisher: PanelPublisher,
    status: S,
    config: &CalendarSyncConfig,
) -> SyncTask {
    SyncLoop::builder(HttpHashSource::new(client), publisher)
        .status(status)
        .interval(config.interval())
        .policy(TickPolicy::OnChange)
        .spawn()
}

/// Start the calendar-sync loop on the current runtime.
pub fn spawn(
    config: &CalendarSyncConfig,
    controller: DisplayController,
    options: FitOptions,
) -> Result<SyncTask> {
    let client = CalendarClient::new(&config.server_url, config.timeout(), config.image_timeout())?;
    let publisher = PanelPublisher::new(client.clone(), controller, options);
    info!(
        "Polling {} every {:?} (status reports: {})",
        client.base_url(),
        config.interval(),
        config.report_status
    );

    let task = if config.report_status {
        spawn_with(client.clone(), publisher, HttpStatusSink::new(client), config)
    } else {
        spawn_with(client, publisher, NullStatus, config)
    };
    Ok(task)
}

/// Run the calendar-sync loop until `shutdown` resolves.
pub async fn run(
    config: &CalendarSyncConfig,
    controller: DisplayController,
    options: FitOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<SyncStats> {
    let task = spawn(config, controller, options)?;
    shutdown.await;
    task.shutdown().await.map_err(DisplayError::from)
}
