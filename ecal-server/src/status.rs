//! Sync state reported by the sync service, and the service process itself.

use crate::config::SyncProcessConfig;
use crate::errors::Result;
use chrono::{DateTime, Utc};
use ecal_sync::{ManagedProcess, SyncStatus};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

/// Last status posted by a sync loop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct StatusBoard {
    inner: Mutex<StatusSnapshot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> StatusSnapshot {
        self.inner.lock().clone()
    }

    pub fn set(&self, status: SyncStatus) {
        let mut inner = self.inner.lock();
        inner.status = status;
        inner.updated_at = Some(Utc::now());
    }
}

/// State of the managed sync service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncProcessInfo {
    pub running: bool,
    pub program: String,
    pub pid: Option<u32>,
    pub uptime_secs: Option<u64>,
}

/// Starts and stops the sync service as a child of the server.
pub struct SyncProcess {
    config: SyncProcessConfig,
    child: AsyncMutex<Option<ManagedProcess>>,
}

impl SyncProcess {
    pub fn new(config: SyncProcessConfig) -> Self {
        Self {
            config,
            child: AsyncMutex::new(None),
        }
    }

    fn describe(&self, child: &mut Option<ManagedProcess>) -> SyncProcessInfo {
        // Forget a child that exited on its own
        if child.as_mut().is_some_and(|c| !c.is_running()) {
            info!("{} exited", self.config.program);
            *child = None;
        }
        match child {
            Some(c) => SyncProcessInfo {
                running: true,
                program: c.program().to_string(),
                pid: c.pid(),
                uptime_secs: Some(c.uptime().as_secs()),
            },
            None => SyncProcessInfo {
                running: false,
                program: self.config.program.clone(),
                pid: None,
                uptime_secs: None,
            },
        }
    }

    pub async fn info(&self) -> SyncProcessInfo {
        let mut child = self.child.lock().await;
        self.describe(&mut child)
    }

    /// Start the service unless it is already running.
    pub async fn start(&self) -> Result<SyncProcessInfo> {
        let mut child = self.child.lock().await;
        if self.describe(&mut child).running {
            info!("{} already running", self.config.program);
        } else {
            *child = Some(ManagedProcess::spawn(&self.config.program, &self.config.args)?);
        }
        Ok(self.describe(&mut child))
    }

    /// Stop the service if it is running.
    pub async fn stop(&self) -> Result<SyncProcessInfo> {
        let mut child = self.child.lock().await;
        if let Some(process) = child.take() {
            process.stop().await?;
        }
        Ok(self.describe(&mut child))
    }
}
