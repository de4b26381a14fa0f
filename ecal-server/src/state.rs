//! Server state shared by all handlers.

use crate::config::ServerConfig;
use crate::errors::Result;
use crate::logs::LogBuffer;
use crate::screenshot::{BrowserRenderer, Rendered, Renderer, ScreenshotCache};
use crate::settings_store::SettingsStore;
use crate::status::{StatusBoard, SyncProcess};
use chrono::Local;
use ecal_calendar::{
    collect_events, fingerprint, CalendarEvent, CalendarInfo, EventSource, JsonFileSource,
};
use ecal_sync::{BrowserCapture, HashPayload};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the handlers need. Built once per server.
pub struct AppState {
    pub settings: SettingsStore,
    pub source: Arc<dyn EventSource>,
    pub renderer: Arc<dyn Renderer>,
    pub screenshots: ScreenshotCache,
    pub status: StatusBoard,
    pub logs: LogBuffer,
    pub sync: SyncProcess,
    refresh_pending: AtomicBool,
}

impl AppState {
    pub fn new(
        settings: SettingsStore,
        source: Arc<dyn EventSource>,
        renderer: Arc<dyn Renderer>,
        logs: LogBuffer,
        sync: SyncProcess,
    ) -> Self {
        Self {
            settings,
            source,
            renderer,
            screenshots: ScreenshotCache::new(),
            status: StatusBoard::new(),
            logs,
            sync,
            refresh_pending: AtomicBool::new(false),
        }
    }

    /// State backed by the JSON export, headless browser and sync binary
    /// named in `config`.
    pub fn from_config(config: &ServerConfig, logs: LogBuffer) -> Result<Self> {
        let settings = SettingsStore::open(&config.calendar.settings_path)?;
        let source = JsonFileSource::new(&config.calendar.events_path)
            .with_max_per_calendar(config.calendar.max_per_calendar);
        let renderer = BrowserRenderer::new(
            BrowserCapture::new(config.render.capture.clone()),
            &config.render.page_url,
            config.render.whitespace.clone(),
        );
        Ok(Self::new(
            settings,
            Arc::new(source),
            Arc::new(renderer),
            logs,
            SyncProcess::new(config.sync.clone()),
        ))
    }

    /// Coloured, deduplicated events of the configured calendars.
    pub async fn events(&self) -> Result<Vec<CalendarEvent>> {
        let settings = self.settings.get()?;
        let source = self.source.clone();
        let today = Local::now().date_naive();
        let events =
            tokio::task::spawn_blocking(move || collect_events(source.as_ref(), &settings, today))
                .await??;
        Ok(events)
    }

    pub async fn calendars(&self) -> Result<Vec<CalendarInfo>> {
        let source = self.source.clone();
        Ok(tokio::task::spawn_blocking(move || source.calendars()).await??)
    }

    /// The image for the current events, rendering when they changed.
    ///
    /// When events cannot be fetched the previous image is served if there
    /// is one.
    pub async fn current_image(&self) -> Result<Rendered> {
        let content_hash = match self.events().await {
            Ok(events) => fingerprint(&events),
            Err(e) => match self.screenshots.peek().await {
                Some(stale) => {
                    warn!("Event fetch failed, serving previous image: {}", e);
                    return Ok(stale);
                }
                None => return Err(e),
            },
        };
        self.screenshots
            .get_or_render(&content_hash, self.renderer.as_ref())
            .await
    }

    /// Body of `/hash`. Consumes the refresh flag.
    pub async fn hash(&self) -> Result<HashPayload> {
        let rendered = self.current_image().await?;
        Ok(HashPayload {
            hash: rendered.hash,
            refresh: self.refresh_pending.swap(false, Ordering::SeqCst),
        })
    }

    /// Re-render now and tell the next `/hash` poller to publish.
    pub async fn refresh(&self) -> Result<Rendered> {
        info!("Manual refresh requested");
        self.refresh_pending.store(true, Ordering::SeqCst);
        self.screenshots.invalidate().await;
        self.current_image().await
    }

    pub fn refresh_pending(&self) -> bool {
        self.refresh_pending.load(Ordering::SeqCst)
    }

    /// Stop owned children before exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.sync.stop().await.map(|_| ())
    }
}

