//! Tokio Process Launcher
//! Real implementation of the ProcessLauncher port
//!
//! Services are launched through the shell in their own session so a
//! whole process group can be signalled at once. Output is captured
//! line by line into the shared log ring; the exit code is delivered
//! through a one-shot handle instead of being polled for.

use crate::domain::constants::EXIT_POLL_INTERVAL_MS;
use crate::domain::ports::{
    ExitHandle, LaunchSpec, LaunchedProcess, LogBuffer, ProcessLauncher, StopOutcome,
};
use crate::domain::DomainError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

#[cfg(unix)]
use libc::{SIGKILL, SIGTERM};
#[cfg(not(unix))]
const SIGTERM: i32 = 15;
#[cfg(not(unix))]
const SIGKILL: i32 = 9;

/// Tokio-based process launcher
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Send a signal to the process group, falling back to the single
    /// process when the group is gone. A process that disappeared
    /// entirely is not an error here; callers decide what that means.
    #[cfg(unix)]
    fn signal(pid: u32, signal: i32) -> Result<(), DomainError> {
        let group = unsafe { libc::kill(-(pid as i32), signal) };
        if group == 0 {
            debug!(pid = pid, signal = signal, "Signalled process group");
            return Ok(());
        }

        let direct = unsafe { libc::kill(pid as i32, signal) };
        if direct == 0 {
            debug!(pid = pid, signal = signal, "Signalled process");
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(DomainError::Io(format!(
            "Failed to send signal {} to process {}: {}",
            signal, pid, err
        )))
    }

    #[cfg(not(unix))]
    fn signal(_pid: u32, _signal: i32) -> Result<(), DomainError> {
        Err(DomainError::Io(
            "Signal delivery is not supported on this platform".to_string(),
        ))
    }

    fn alive(pid: u32) -> bool {
        #[cfg(unix)]
        {
            unsafe { libc::kill(pid as i32, 0) == 0 }
        }
        #[cfg(not(unix))]
        {
            let _ = pid;
            false
        }
    }

    /// Poll until the process disappears or the deadline passes
    async fn wait_gone(pid: u32, window: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            if !Self::alive(pid) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(EXIT_POLL_INTERVAL_MS)).await;
        }
    }

    fn pump_lines<R>(reader: R, logs: LogBuffer)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                logs.push(line);
            }
        });
    }
}

impl Default for TokioProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn spawn(&self, spec: LaunchSpec) -> Result<LaunchedProcess, DomainError> {
        if spec.command.trim().is_empty() {
            return Err(DomainError::LaunchFailed("Empty start command".to_string()));
        }
        if !spec.working_dir.is_dir() {
            return Err(DomainError::LaunchFailed(format!(
                "Working directory '{}' does not exist",
                spec.working_dir.display()
            )));
        }

        info!(
            command = %spec.command,
            working_dir = %spec.working_dir.display(),
            "Spawning service process"
        );

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&spec.command)
            .current_dir(&spec.working_dir)
            .envs(spec.env.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own session, so signals reach the shell and everything under it
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| DomainError::LaunchFailed(format!("Failed to spawn process: {}", e)))?;

        let pid = child
            .id()
            .ok_or_else(|| DomainError::LaunchFailed("Process exited before launch completed".to_string()))?;

        let logs = LogBuffer::new();
        if let Some(stdout) = child.stdout.take() {
            Self::pump_lines(stdout, logs.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            Self::pump_lines(stderr, logs.clone());
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) => {
                    #[cfg(unix)]
                    let code = {
                        use std::os::unix::process::ExitStatusExt;
                        status
                            .code()
                            .or_else(|| status.signal().map(|sig| 128 + sig))
                            .unwrap_or(-1)
                    };
                    #[cfg(not(unix))]
                    let code = status.code().unwrap_or(-1);
                    debug!(pid = pid, exit_code = code, "Process exited");
                    Ok(code)
                }
                Err(e) => Err(DomainError::Io(format!(
                    "Failed to wait for process {}: {}",
                    pid, e
                ))),
            };
            let _ = tx.send(result);
        });

        let exit = Box::pin(async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(DomainError::Io(
                    "Process monitor task died unexpectedly".to_string(),
                )),
            }
        }) as ExitHandle;

        info!(pid = pid, "Service process spawned");
        Ok(LaunchedProcess { pid, exit, logs })
    }

    async fn terminate(
        &self,
        pid: u32,
        grace: Duration,
        kill_wait: Duration,
    ) -> Result<StopOutcome, DomainError> {
        if !Self::alive(pid) {
            debug!(pid = pid, "Process already gone before termination");
            return Ok(StopOutcome::AlreadyExited);
        }

        info!(pid = pid, grace_secs = grace.as_secs(), "Sending SIGTERM");
        Self::signal(pid, SIGTERM)?;
        if Self::wait_gone(pid, grace).await {
            return Ok(StopOutcome::Stopped);
        }

        warn!(
            pid = pid,
            grace_secs = grace.as_secs(),
            "Process ignored SIGTERM, escalating to SIGKILL"
        );
        Self::signal(pid, SIGKILL)?;
        if Self::wait_gone(pid, kill_wait).await {
            return Ok(StopOutcome::ForcedKill);
        }

        Err(DomainError::Io(format!(
            "Process {} still present after SIGKILL",
            pid
        )))
    }

    async fn force_kill(&self, pid: u32) -> Result<(), DomainError> {
        info!(pid = pid, "Force killing process");
        Self::signal(pid, SIGKILL)
    }

    async fn is_alive(&self, pid: u32) -> bool {
        Self::alive(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec(command: &str) -> LaunchSpec {
        LaunchSpec {
            command: command.to_string(),
            working_dir: PathBuf::from("/tmp"),
            env: Vec::new(),
        }
    }

    async fn wait_for_lines(logs: &LogBuffer, want: usize) {
        for _ in 0..50 {
            if logs.len() >= want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn test_spawn_captures_merged_output() {
        let launcher = TokioProcessLauncher::new();
        let launched = launcher
            .spawn(spec("echo out-line; echo err-line 1>&2"))
            .await
            .unwrap();

        assert_eq!(launched.exit.await.unwrap(), 0);
        wait_for_lines(&launched.logs, 2).await;

        let tail = launched.logs.tail(10);
        assert!(tail.contains(&"out-line".to_string()));
        assert!(tail.contains(&"err-line".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_reports_exit_code() {
        let launcher = TokioProcessLauncher::new();
        let launched = launcher.spawn(spec("exit 7")).await.unwrap();
        assert_eq!(launched.exit.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_spawn_missing_workdir_fails_synchronously() {
        let launcher = TokioProcessLauncher::new();
        let result = launcher
            .spawn(LaunchSpec {
                command: "true".to_string(),
                working_dir: PathBuf::from("/definitely/not/here"),
                env: Vec::new(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::LaunchFailed(_))));
    }

    #[tokio::test]
    async fn test_spawn_applies_env_overlay() {
        let launcher = TokioProcessLauncher::new();
        let launched = launcher
            .spawn(LaunchSpec {
                command: "echo \"value=$LAUNCH_TEST_VAR\"".to_string(),
                working_dir: PathBuf::from("/tmp"),
                env: vec![("LAUNCH_TEST_VAR".to_string(), "overlay-42".to_string())],
            })
            .await
            .unwrap();

        assert_eq!(launched.exit.await.unwrap(), 0);
        wait_for_lines(&launched.logs, 1).await;
        assert_eq!(launched.logs.tail(1), vec!["value=overlay-42"]);
    }

    #[tokio::test]
    async fn test_terminate_with_sigterm() {
        let launcher = TokioProcessLauncher::new();
        let launched = launcher.spawn(spec("sleep 30")).await.unwrap();

        let outcome = launcher
            .terminate(launched.pid, Duration::from_secs(5), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(outcome, StopOutcome::Stopped);
        assert!(!launcher.is_alive(launched.pid).await);
    }

    #[tokio::test]
    async fn test_terminate_already_exited() {
        let launcher = TokioProcessLauncher::new();
        let launched = launcher.spawn(spec("true")).await.unwrap();
        launched.exit.await.unwrap();

        let outcome = launcher
            .terminate(launched.pid, Duration::from_secs(1), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome, StopOutcome::AlreadyExited);
    }

    #[tokio::test]
    async fn test_terminate_escalates_to_sigkill() {
        let launcher = TokioProcessLauncher::new();
        // The shell ignores TERM and keeps respawning short sleeps; the
        // marker line proves the trap is installed before we signal
        let launched = launcher
            .spawn(spec(
                "trap '' TERM; echo trap-armed; while true; do sleep 0.2; done",
            ))
            .await
            .unwrap();
        wait_for_lines(&launched.logs, 1).await;

        let outcome = launcher
            .terminate(
                launched.pid,
                Duration::from_millis(600),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(outcome, StopOutcome::ForcedKill);
        assert!(!launcher.is_alive(launched.pid).await);
    }

    #[tokio::test]
    async fn test_is_alive_for_finished_process() {
        let launcher = TokioProcessLauncher::new();
        let launched = launcher.spawn(spec("true")).await.unwrap();
        launched.exit.await.unwrap();
        assert!(!launcher.is_alive(launched.pid).await);
    }
}
