//! ProcessLauncher port
//! Interface for spawning and terminating service processes

use crate::domain::constants::{LOG_BUFFER_MAX_LINES, LOG_BUFFER_TRIM_TO};
use crate::domain::DomainError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything needed to launch one service process
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Shell command line taken from the manifest
    pub command: String,
    pub working_dir: PathBuf,
    /// Overlay applied on top of the parent environment
    pub env: Vec<(String, String)>,
}

/// Handle resolving to the exit code once the process is gone
/// This allows event-driven monitoring without polling
pub type ExitHandle = Pin<Box<dyn Future<Output = Result<i32, DomainError>> + Send>>;

/// Bounded ring of captured stdout/stderr lines
///
/// Clones share the same ring, so a buffer handed out at launch stays
/// live for readers while pump tasks keep appending.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, trimming the oldest half once the cap is hit
    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap();
        lines.push_back(line);
        if lines.len() >= LOG_BUFFER_MAX_LINES {
            while lines.len() > LOG_BUFFER_TRIM_TO {
                lines.pop_front();
            }
        }
    }

    /// Last `n` lines, oldest first
    pub fn tail(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap();
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuffer")
            .field("lines", &self.len())
            .finish()
    }
}

/// Result of a successful launch
pub struct LaunchedProcess {
    pub pid: u32,
    /// Resolves exactly once, when the process exits
    pub exit: ExitHandle,
    pub logs: LogBuffer,
}

impl fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("pid", &self.pid)
            .field("logs", &self.logs.len())
            .finish()
    }
}

/// How a stop request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited within the grace period after SIGTERM
    Stopped,
    /// Ignored SIGTERM and needed SIGKILL
    ForcedKill,
    /// Was already gone before any signal was sent
    AlreadyExited,
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Stopped => write!(f, "stopped"),
            StopOutcome::ForcedKill => write!(f, "forced_kill"),
            StopOutcome::AlreadyExited => write!(f, "already_exited"),
        }
    }
}

/// Port for launching and terminating service processes
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawn the command with its output captured line by line
    async fn spawn(&self, spec: LaunchSpec) -> Result<LaunchedProcess, DomainError>;

    /// Graceful termination: SIGTERM, wait up to `grace`, then SIGKILL
    /// and wait up to `kill_wait` for the process to disappear
    async fn terminate(
        &self,
        pid: u32,
        grace: Duration,
        kill_wait: Duration,
    ) -> Result<StopOutcome, DomainError>;

    /// Immediate SIGKILL without the escalation protocol
    async fn force_kill(&self, pid: u32) -> Result<(), DomainError>;

    /// Check whether the process still exists
    async fn is_alive(&self, pid: u32) -> bool;
}
