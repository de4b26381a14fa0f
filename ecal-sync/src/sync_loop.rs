//! The polling state machine that ties change detection to publication.
//!
//! One loop is one tokio task. Each tick asks a [`ChangeSource`] for the
//! current fingerprint and, when it moved (or publication is forced), hands
//! it to a [`Publisher`]. The last successfully published fingerprint is the
//! only baseline; a failed publish leaves it untouched so the next tick
//! retries.
//!
//! ```text
//! Idle -> Fetching -> Uploading       -> Idle
//!                  \-> SkippedNoChange -> Idle
//! ```

use crate::errors::SyncError;
use ecal_calendar::has_changed;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::select;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A fingerprint observed by a [`ChangeSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub hash: String,
    /// The source asks for publication regardless of the hash.
    pub force: bool,
}

impl Observation {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            force: false,
        }
    }

    pub fn forced(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            force: true,
        }
    }
}

/// Produces the current fingerprint of whatever is being synced.
pub trait ChangeSource: Send {
    fn poll(&mut self) -> impl Future<Output = Result<Observation, SyncError>> + Send;
}

/// Delivers the content behind an observation (upload, paint, ...).
pub trait Publisher: Send {
    fn publish(
        &mut self,
        observation: &Observation,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// Loop state as reported to a [`StatusSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub fetching: bool,
    pub uploading: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Receives every state transition. Reporting is best-effort.
pub trait StatusSink: Send + Sync {
    fn report(&self, status: &SyncStatus) -> impl Future<Output = ()> + Send;
}

/// Discards status reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    async fn report(&self, _status: &SyncStatus) {}
}

/// When a tick publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Only when the fingerprint differs from the baseline
    #[default]
    OnChange,
    /// Every tick
    Always,
}

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Fetching,
    Uploading,
    SkippedNoChange,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Uploading => write!(f, "uploading"),
            Self::SkippedNoChange => write!(f, "skipped"),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Published { hash: String },
    Skipped,
    FetchFailed { error: String },
    PublishFailed { error: String },
}

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub ticks: u64,
    pub published: u64,
    pub skipped: u64,
    pub fetch_failures: u64,
    pub publish_failures: u64,
}

impl SyncStats {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Published { .. } => self.published += 1,
            TickOutcome::Skipped => self.skipped += 1,
            TickOutcome::FetchFailed { .. } => self.fetch_failures += 1,
            TickOutcome::PublishFailed { .. } => self.publish_failures += 1,
        }
    }
}

/// Commands accepted by a running loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    /// Publish on the next tick regardless of the fingerprint, and tick now.
    Trigger,
    /// Stop after the current tick.
    Shutdown,
}

/// The sync state machine.
pub struct SyncLoop<C, P, S = NullStatus> {
    source: C,
    publisher: P,
    status: S,
    policy: TickPolicy,
    interval: Duration,
    state: SyncState,
    baseline: Option<String>,
    published_once: bool,
    trigger_pending: bool,
}

impl<C: ChangeSource, P: Publisher> SyncLoop<C, P, NullStatus> {
    /// Start building a loop over `source` and `publisher`.
    pub fn builder(source: C, publisher: P) -> SyncLoopBuilder<C, P, NullStatus> {
        SyncLoopBuilder {
            source,
            publisher,
            status: NullStatus,
            policy: TickPolicy::OnChange,
            interval: Duration::from_secs(5),
        }
    }
}

impl<C, P, S> SyncLoop<C, P, S>
where
    C: ChangeSource,
    P: Publisher,
    S: StatusSink,
{
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Last successfully published fingerprint.
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Force publication on the next tick.
    pub fn trigger(&mut self) {
        self.trigger_pending = true;
    }

    async fn enter(&mut self, state: SyncState, error: Option<String>) {
        debug!("Sync state: {} -> {}", self.state, state);
        self.state = state;
        let status = SyncStatus {
            fetching: state == SyncState::Fetching,
            uploading: state == SyncState::Uploading,
            error,
        };
        self.status.report(&status).await;
    }

    /// Run one poll-compare-publish cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        self.enter(SyncState::Fetching, None).await;

        let observation = match self.source.poll().await {
            Ok(observation) => observation,
            Err(e) => {
                warn!("Hash fetch failed, retrying next tick: {}", e);
                let error = e.to_string();
                self.enter(SyncState::Idle, Some(error.clone())).await;
                return TickOutcome::FetchFailed { error };
            }
        };

        let forced = !self.published_once
            || self.trigger_pending
            || observation.force
            || self.policy == TickPolicy::Always;

        if !forced && !has_changed(self.baseline.as_deref(), &observation.hash) {
            debug!("No change (hash {})", observation.hash);
            self.enter(SyncState::SkippedNoChange, None).await;
            self.enter(SyncState::Idle, None).await;
            return TickOutcome::Skipped;
        }

        if forced {
            info!("Publishing {} (forced)", observation.hash);
        } else {
            info!("Change detected, publishing {}", observation.hash);
        }

        self.enter(SyncState::Uploading, None).await;
        match self.publisher.publish(&observation).await {
            Ok(()) => {
                self.baseline = Some(observation.hash.clone());
                self.published_once = true;
                self.trigger_pending = false;
                self.enter(SyncState::Idle, None).await;
                TickOutcome::Published {
                    hash: observation.hash,
                }
            }
            Err(e) => {
                warn!("Publish failed, retrying next tick: {}", e);
                let error = e.to_string();
                self.enter(SyncState::Idle, Some(error.clone())).await;
                TickOutcome::PublishFailed { error }
            }
        }
    }

    /// Tick until shut down, sleeping `interval` between ticks.
    ///
    /// A [`SyncCommand::Trigger`] cuts the sleep short. The loop ends on
    /// [`SyncCommand::Shutdown`] or when every handle is dropped.
    pub async fn run(mut self, commands: flume::Receiver<SyncCommand>) -> SyncStats {
        let mut stats = SyncStats::default();
        info!("Sync loop started (interval {:?}, {:?})", self.interval, self.policy);

        loop {
            let outcome = self.tick().await;
            stats.record(&outcome);

            select! {
                _ = tokio::time::sleep(self.interval) => {}
                cmd = commands.recv_async() => match cmd {
                    Ok(SyncCommand::Trigger) => {
                        info!("Manual refresh requested");
                        self.trigger();
                    }
                    Ok(SyncCommand::Shutdown) | Err(_) => break,
                },
            }
        }

        info!(
            "Sync loop stopped after {} ticks ({} published)",
            stats.ticks, stats.published
        );
        stats
    }
}

/// Builder for [`SyncLoop`].
pub struct SyncLoopBuilder<C, P, S> {
    source: C,
    publisher: P,
    status: S,
    policy: TickPolicy,
    interval: Duration,
}

impl<C, P, S> SyncLoopBuilder<C, P, S>
where
    C: ChangeSource + 'static,
    P: Publisher + 'static,
    S: StatusSink + 'static,
{
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: TickPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report state transitions to `status`.
    pub fn status<S2: StatusSink>(self, status: S2) -> SyncLoopBuilder<C, P, S2> {
        SyncLoopBuilder {
            source: self.source,
            publisher: self.publisher,
            status,
            policy: self.policy,
            interval: self.interval,
        }
    }

    /// Build the loop without starting it.
    pub fn build(self) -> SyncLoop<C, P, S> {
        SyncLoop {
            source: self.source,
            publisher: self.publisher,
            status: self.status,
            policy: self.policy,
            interval: self.interval,
            state: SyncState::Idle,
            baseline: None,
            published_once: false,
            trigger_pending: false,
        }
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self) -> SyncTask {
        let (tx, rx) = flume::bounded(8);
        let sync_loop = self.build();
        let join = tokio::spawn(sync_loop.run(rx));
        SyncTask {
            handle: SyncHandle { commands: tx },
            join,
        }
    }
}

/// A spawned loop.
pub struct SyncTask {
    handle: SyncHandle,
    join: JoinHandle<SyncStats>,
}

impl SyncTask {
    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Ask the loop to stop and wait for it.
    pub async fn shutdown(self) -> Result<SyncStats, SyncError> {
        // A loop that already exited has dropped its receiver
        let _ = self.handle.shutdown();
        self.join.await.map_err(|_| SyncError::Closed)
    }
}

/// Cloneable handle for controlling a running loop.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    commands: flume::Sender<SyncCommand>,
}

impl SyncHandle {
    /// Request an immediate, unconditional publish.
    pub fn trigger(&self) -> Result<(), SyncError> {
        self.commands
            .send(SyncCommand::Trigger)
            .map_err(|_| SyncError::Closed)
    }

    pub fn shutdown(&self) -> Result<(), SyncError> {
        self.commands
            .send(SyncCommand::Shutdown)
            .map_err(|_| SyncError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays a script of poll results, repeating the last one.
    struct ScriptedSource {
        script: VecDeque<Result<Observation, SyncError>>,
        last: Option<Observation>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Observation, SyncError>>) -> Self {
            Self {
                script: script.into(),
                last: None,
            }
        }
    }

    impl ChangeSource for ScriptedSource {
        async fn poll(&mut self) -> Result<Observation, SyncError> {
            match self.script.pop_front() {
                Some(Ok(obs)) => {
                    self.last = Some(obs.clone());
                    Ok(obs)
                }
                Some(Err(e)) => Err(e),
                None => self.last.clone().ok_or(SyncError::Closed),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingPublisher {
        published: Arc<Mutex<Vec<String>>>,
        failures_left: Arc<Mutex<u32>>,
    }

    impl RecordingPublisher {
        fn failing(times: u32) -> Self {
            let publisher = Self::default();
            *publisher.failures_left.lock().unwrap() = times;
            publisher
        }

        fn published(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    impl Publisher for RecordingPublisher {
        async fn publish(&mut self, observation: &Observation) -> Result<(), SyncError> {
            {
                let mut left = self.failures_left.lock().unwrap();
                if *left > 0 {
                    *left -= 1;
                    return Err(SyncError::Timeout(Duration::from_secs(5)));
                }
            }
            self.published.lock().unwrap().push(observation.hash.clone());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingStatus(Arc<Mutex<Vec<SyncStatus>>>);

    impl StatusSink for RecordingStatus {
        async fn report(&self, status: &SyncStatus) {
            self.0.lock().unwrap().push(status.clone());
        }
    }

    fn ok(hash: &str) -> Result<Observation, SyncError> {
        Ok(Observation::new(hash))
    }

    #[tokio::test]
    async fn test_first_tick_publishes() {
        let publisher = RecordingPublisher::default();
        let mut sync =
            SyncLoop::builder(ScriptedSource::new(vec![ok("a")]), publisher.clone()).build();

        assert_eq!(
            sync.tick().await,
            TickOutcome::Published {
                hash: "a".to_string()
            }
        );
        assert_eq!(sync.baseline(), Some("a"));
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_unchanged_hash_skips() {
        let publisher = RecordingPublisher::default();
        let source = ScriptedSource::new(vec![ok("a"), ok("a")]);
        let mut sync = SyncLoop::builder(source, publisher.clone()).build();

        sync.tick().await;
        assert_eq!(sync.tick().await, TickOutcome::Skipped);
        assert_eq!(publisher.published(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_changed_hash_publishes() {
        let publisher = RecordingPublisher::default();
        let source = ScriptedSource::new(vec![ok("a"), ok("b")]);
        let mut sync = SyncLoop::builder(source, publisher.clone()).build();

        sync.tick().await;
        sync.tick().await;
        assert_eq!(publisher.published(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_always_policy_publishes_every_tick() {
        let publisher = RecordingPublisher::default();
        let source = ScriptedSource::new(vec![ok("a"), ok("a")]);
        let mut sync = SyncLoop::builder(source, publisher.clone())
            .policy(TickPolicy::Always)
            .build();

        sync.tick().await;
        sync.tick().await;
        assert_eq!(publisher.published(), vec!["a", "a"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_fatal() {
        let publisher = RecordingPublisher::default();
        let script = vec![
            ok("a"),
            Err(SyncError::Timeout(Duration::from_secs(5))),
            ok("b"),
        ];
        let mut sync = SyncLoop::builder(ScriptedSource::new(script), publisher.clone()).build();

        sync.tick().await;
        assert!(matches!(sync.tick().await, TickOutcome::FetchFailed { .. }));
        assert_eq!(sync.baseline(), Some("a"));
        sync.tick().await;
        assert_eq!(publisher.published(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_baseline_and_retries() {
        let publisher = RecordingPublisher::failing(1);
        let source = ScriptedSource::new(vec![ok("a"), ok("a")]);
        let mut sync = SyncLoop::builder(source, publisher.clone()).build();

        assert!(matches!(sync.tick().await, TickOutcome::PublishFailed { .. }));
        assert_eq!(sync.baseline(), None);
        assert!(matches!(sync.tick().await, TickOutcome::Published { .. }));
        assert_eq!(publisher.published(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_manual_trigger_forces_once() {
        let publisher = RecordingPublisher::default();
        let mut sync = SyncLoop::builder(
            ScriptedSource::new(vec![ok("a"), ok("a"), ok("a")]),
            publisher.clone(),
        )
        .build();

        sync.tick().await;
        sync.trigger();
        assert!(matches!(sync.tick().await, TickOutcome::Published { .. }));
        assert_eq!(sync.tick().await, TickOutcome::Skipped);
        assert_eq!(publisher.published(), vec!["a", "a"]);
    }

    #[tokio::test]
    async fn test_source_forced_observation() {
        let publisher = RecordingPublisher::default();
        let script = vec![ok("a"), Ok(Observation::forced("a"))];
        let mut sync = SyncLoop::builder(ScriptedSource::new(script), publisher.clone()).build();

        sync.tick().await;
        assert!(matches!(sync.tick().await, TickOutcome::Published { .. }));
    }

    #[tokio::test]
    async fn test_status_transitions_reported() {
        let status = RecordingStatus::default();
        let mut sync = SyncLoop::builder(
            ScriptedSource::new(vec![ok("a"), ok("a")]),
            RecordingPublisher::default(),
        )
        .status(status.clone())
        .build();

        sync.tick().await;
        sync.tick().await;

        let reports = status.0.lock().unwrap().clone();
        let flags: Vec<(bool, bool)> = reports.iter().map(|s| (s.fetching, s.uploading)).collect();
        assert_eq!(
            flags,
            vec![
                (true, false),
                (false, true),
                (false, false),
                (true, false),
                (false, false),
                (false, false),
            ]
        );
        assert!(reports.iter().all(|s| s.error.is_none()));
    }

    #[tokio::test]
    async fn test_error_reported_to_status() {
        let status = RecordingStatus::default();
        let mut sync = SyncLoop::builder(
            ScriptedSource::new(vec![Err(SyncError::Timeout(Duration::from_secs(5)))]),
            RecordingPublisher::default(),
        )
        .status(status.clone())
        .build();

        sync.tick().await;
        let last = status.0.lock().unwrap().last().cloned().unwrap();
        assert!(last.error.unwrap().contains("Timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_trigger_and_shutdown() {
        let publisher = RecordingPublisher::default();
        let task = SyncLoop::builder(ScriptedSource::new(vec![ok("a")]), publisher.clone())
            .interval(Duration::from_secs(60))
            .spawn();
        let handle = task.handle();

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.trigger().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let stats = task.shutdown().await.unwrap();
        assert_eq!(publisher.published(), vec!["a", "a"]);
        assert_eq!(stats.published, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_loop() {
        let source = ScriptedSource::new(vec![ok("a")]);
        let task = SyncLoop::builder(source, RecordingPublisher::default())
            .interval(Duration::from_secs(60))
            .spawn();
        let SyncTask { handle, join } = task;
        drop(handle);
        let stats = join.await.unwrap();
        assert_eq!(stats.ticks, 1);
    }
}
