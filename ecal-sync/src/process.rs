//! External process management.
//!
//! [`ProcessRunner`] runs short-lived commands (headless browser, panel
//! driver) to completion under a timeout. [`ManagedProcess`] owns a
//! long-running child such as the sync service started by the web server.

use crate::errors::SyncError;
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Result of running a command to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exit status zero.
    Success { stdout: String, stderr: String },
    /// Non-zero exit, or killed by a signal (`code` is `None`).
    NonZeroExit { code: Option<i32>, stderr: String },
    /// Killed after exceeding the timeout.
    TimedOut { after: Duration },
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Convert to a `Result`, naming `what` in the error.
    pub fn into_result(self, what: &str) -> Result<String, SyncError> {
        match self {
            Self::Success { stdout, .. } => Ok(stdout),
            Self::NonZeroExit { code, stderr } => Err(SyncError::Process(format!(
                "{} exited with {}: {}",
                what,
                code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr.trim()
            ))),
            Self::TimedOut { after } => Err(SyncError::Timeout(after)),
        }
    }
}

/// Runs commands with captured output and a fixed timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program` with `args` and wait for it, killing it on timeout.
    ///
    /// # Errors
    ///
    /// Only a failure to spawn is an error; exit status and timeout are
    /// reported through [`ProcessOutcome`].
    pub async fn run<I, S>(&self, program: &str, args: I) -> Result<ProcessOutcome, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SyncError::Process(format!("Failed to start {}: {}", program, e)))?;

        debug!("Started {} (pid {:?})", program, child.id());

        // Dropping the wait future on timeout drops the child, which kills it
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                if output.status.success() {
                    Ok(ProcessOutcome::Success { stdout, stderr })
                } else {
                    Ok(ProcessOutcome::NonZeroExit {
                        code: output.status.code(),
                        stderr,
                    })
                }
            }
            Ok(Err(e)) => Err(SyncError::Process(format!(
                "Failed to wait for {}: {}",
                program, e
            ))),
            Err(_) => {
                warn!("{} timed out after {:?}", program, self.timeout);
                Ok(ProcessOutcome::TimedOut {
                    after: self.timeout,
                })
            }
        }
    }
}

/// A long-running child process.
#[derive(Debug)]
pub struct ManagedProcess {
    child: Child,
    program: String,
    started_at: Instant,
}

impl ManagedProcess {
    /// Spawn `program` with inherited stdout/stderr.
    pub fn spawn<I, S>(program: &str, args: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SyncError::Process(format!("Failed to start {}: {}", program, e)))?;
        info!("Started {} (pid {:?})", program, child.id());
        Ok(Self {
            child,
            program: program.to_string(),
            started_at: Instant::now(),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// True while the child has not exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the child and reap it.
    pub async fn stop(mut self) -> Result<(), SyncError> {
        if !self.is_running() {
            return Ok(());
        }
        self.child.kill().await?;
        info!("Stopped {}", self.program);
        Ok(())
    }
}
