//! Process spawning, watchdog and output capture
//!
//! Runs one child process tree to completion or until the watchdog deadline,
//! capturing bounded stdout and stderr.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::sandbox::SandboxError;
use crate::sandbox::command::SandboxCommand;
use crate::sandbox::platform::{ProcessControl, leader_exited, native_control};
use crate::types::{ResourceLimits, SENTINEL_EXIT_CODE};

const READ_CHUNK: usize = 8 * 1024;

/// Captured result of a finished (or killed) process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Captured standard output, at most `max_output` bytes
    pub stdout: Vec<u8>,

    /// Captured standard error, at most `max_output` bytes
    pub stderr: Vec<u8>,

    /// Exit code; for signal deaths on Unix this is `128 + signal`
    pub exit_code: Option<i32>,

    /// Signal number if the process was killed by a signal
    pub signal: Option<i32>,

    /// Wall clock time from spawn to exit
    pub wall_time: Duration,

    /// The watchdog killed the process; `exit_code` is not meaningful
    pub timed_out: bool,

    /// stdout exceeded the cap and was cut
    pub stdout_truncated: bool,

    /// stderr exceeded the cap and was cut
    pub stderr_truncated: bool,
}

impl ProcessOutput {
    /// Exit code to report: the real one, or the sentinel after a timeout
    pub fn reported_exit_code(&self) -> i32 {
        if self.timed_out {
            SENTINEL_EXIT_CODE
        } else {
            self.exit_code.unwrap_or(SENTINEL_EXIT_CODE)
        }
    }

    /// Exited on its own with code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// stdout followed by stderr, lossily decoded
    pub fn combined_output(&self) -> String {
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stderr = String::from_utf8_lossy(&self.stderr);
        let mut combined = String::with_capacity(stdout.len() + stderr.len() + 1);
        combined.push_str(&stdout);
        if !combined.is_empty() && !stderr.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&stderr);
        combined
    }
}

/// Spawns and supervises child processes through a platform strategy
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    control: Arc<dyn ProcessControl>,
}

impl ProcessRunner {
    /// Create a runner with the given platform strategy
    pub fn new(control: Arc<dyn ProcessControl>) -> Self {
        Self { control }
    }

    /// Create a runner for the host platform
    pub fn native() -> Self {
        Self::new(native_control())
    }

    /// Run a command under its limits
    ///
    /// Returns `Err` only when the process could not be started or waited on.
    /// Non-zero exits and timeouts are reported in [`ProcessOutput`].
    #[instrument(skip(self, command), fields(program = command.program().unwrap_or_default()))]
    pub async fn run(&self, command: SandboxCommand) -> Result<ProcessOutput, SandboxError> {
        let limits = command.resource_limits().clone();
        let defaults = ResourceLimits::default();
        let timeout = seconds(limits.timeout.or(defaults.timeout));
        let grace = seconds(limits.kill_grace.or(defaults.kill_grace));
        let max_output = limits
            .max_output
            .or(defaults.max_output)
            .unwrap_or(ResourceLimits::MB);

        if limits.memory_limit_mb.is_some() && !self.control.enforces_memory_limit() {
            debug!(
                platform = self.control.name(),
                "memory limit not enforced on this platform, timeout only"
            );
        }

        let mut process = command.build(self.control.as_ref())?;

        let started = Instant::now();
        let mut child = process.spawn().map_err(SandboxError::SpawnFailed)?;
        let pid = child.id();
        // Declared after `child` so it drops first, before the leader is reaped.
        let mut guard = TreeGuard::new(Arc::clone(&self.control), pid);
        debug!(?pid, ?timeout, "spawned process");

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut stdout_task = tokio::spawn(read_capped(child.stdout.take(), max_output, stop_rx.clone()));
        let mut stderr_task = tokio::spawn(read_capped(child.stderr.take(), max_output, stop_rx));

        let timed_out = match tokio::time::timeout(timeout, leader_exited(&mut child, pid)).await {
            Ok(exited) => {
                exited?;
                false
            }
            Err(_) => {
                warn!(?pid, ?timeout, "deadline expired, terminating process group");
                self.control.terminate(&child);
                if tokio::time::timeout(grace, leader_exited(&mut child, pid))
                    .await
                    .is_err()
                {
                    warn!(?pid, "process ignored terminate, killing");
                    self.control.kill(&mut child);
                }
                true
            }
        };
        let wall_time = started.elapsed();

        // Background helpers may still hold the pipes open. The leader is not
        // reaped yet, so the group ID cannot have been reused.
        if let Some(pid) = pid {
            self.control.reap_descendants(pid);
        }
        let status = match child.wait().await {
            Ok(status) => Some(status),
            Err(_) if timed_out => None,
            Err(e) => return Err(e.into()),
        };
        guard.disarm();

        let stdout = finish_capture(&mut stdout_task, &stop_tx, grace).await;
        let stderr = finish_capture(&mut stderr_task, &stop_tx, grace).await;

        let (exit_code, signal) = match status {
            Some(status) => exit_details(&status),
            None => (None, None),
        };

        debug!(
            ?exit_code,
            ?signal,
            timed_out,
            wall_time = wall_time.as_secs_f64(),
            "process finished"
        );

        Ok(ProcessOutput {
            stdout: stdout.bytes,
            stderr: stderr.bytes,
            exit_code,
            signal,
            wall_time,
            timed_out,
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
        })
    }
}

/// Kills the process tree if a run is abandoned before its leader is reaped
///
/// Covers the run future being dropped mid-flight, e.g. a cancelled request.
struct TreeGuard {
    control: Arc<dyn ProcessControl>,
    pid: Option<u32>,
}

impl TreeGuard {
    fn new(control: Arc<dyn ProcessControl>, pid: Option<u32>) -> Self {
        Self { control, pid }
    }

    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for TreeGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            warn!(pid, "run abandoned, killing process tree");
            self.control.kill_tree(pid);
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Read a stream to EOF, keeping at most `cap` bytes.
///
/// Keeps draining past the cap so the child never blocks on a full pipe.
async fn read_capped<R>(reader: Option<R>, cap: usize, mut stop: watch::Receiver<bool>) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let Some(mut reader) = reader else {
        return captured;
    };

    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = tokio::select! {
            read = reader.read(&mut chunk) => read,
            _ = stop.changed() => break,
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "output stream read failed");
                break;
            }
        };
        let room = cap.saturating_sub(captured.bytes.len());
        if n > room {
            captured.bytes.extend_from_slice(&chunk[..room]);
            captured.truncated = true;
        } else {
            captured.bytes.extend_from_slice(&chunk[..n]);
        }
    }
    captured
}

/// Wait for a capture task, stopping it if the stream stays open past `grace`
async fn finish_capture(
    task: &mut JoinHandle<Captured>,
    stop: &watch::Sender<bool>,
    grace: Duration,
) -> Captured {
    let joined = match tokio::time::timeout(grace, &mut *task).await {
        Ok(joined) => joined,
        Err(_) => {
            debug!("output stream still open after exit, stopping capture");
            let _ = stop.send(true);
            task.await
        }
    };
    joined.unwrap_or_default()
}

fn seconds(value: Option<f64>) -> Duration {
    value
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(Duration::ZERO)
}

#[cfg(unix)]
fn exit_details(status: &std::process::ExitStatus) -> (Option<i32>, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => (Some(code), None),
        (None, Some(signal)) => (Some(128 + signal), Some(signal)),
        (None, None) => (None, None),
    }
}

#[cfg(not(unix))]
fn exit_details(status: &std::process::ExitStatus) -> (Option<i32>, Option<i32>) {
    (status.code(), None)
}
