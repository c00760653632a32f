//! Platform-specific spawn, limit and terminate strategies
//!
//! One [`ProcessControl`] is picked at startup by [`native_control`]; the
//! process runner only ever talks to the trait.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::process::{Child, Command};

use crate::types::ResourceLimits;

/// Capability set a platform provides to the process runner
pub trait ProcessControl: Send + Sync + fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether `memory_limit_mb` is actually enforced on this platform
    fn enforces_memory_limit(&self) -> bool;

    /// Configure the command before spawn (process grouping, window
    /// suppression, resource limits)
    fn configure(&self, command: &mut Command, limits: &ResourceLimits);

    /// Ask the whole process tree to exit
    fn terminate(&self, child: &Child);

    /// Force-kill the whole process tree
    fn kill(&self, child: &mut Child);

    /// Kill leftovers of the tree once the main process (`pid`) has exited
    ///
    /// Called before the main process is reaped, while its PID is still
    /// reserved.
    fn reap_descendants(&self, pid: u32);

    /// Force-kill the tree rooted at `pid` without a [`Child`] handle
    fn kill_tree(&self, pid: u32);
}

/// Strategy for the host platform
pub fn native_control() -> Arc<dyn ProcessControl> {
    #[cfg(unix)]
    {
        Arc::new(unix::UnixControl)
    }
    #[cfg(windows)]
    {
        Arc::new(windows::WindowsControl)
    }
}

/// Wait for the main process to exit without reaping it
///
/// While the exited process is unreaped its PID, and so the process group ID,
/// cannot be handed out again. Where `waitid(WNOWAIT)` is unavailable this
/// falls back to a reaping wait.
#[cfg(target_os = "linux")]
pub(crate) async fn leader_exited(child: &mut Child, pid: Option<u32>) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::wait::{Id, WaitPidFlag, waitid};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return child.wait().await.map(drop);
    };
    tokio::task::spawn_blocking(move || {
        loop {
            match waitid(
                Id::Pid(Pid::from_raw(pid)),
                WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT,
            ) {
                Ok(_) | Err(Errno::ECHILD) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(io::Error::from(errno)),
            }
        }
    })
    .await
    .map_err(io::Error::other)?
}

#[cfg(not(target_os = "linux"))]
pub(crate) async fn leader_exited(child: &mut Child, _pid: Option<u32>) -> io::Result<()> {
    child.wait().await.map(drop)
}

#[cfg(unix)]
mod unix {
    use nix::sys::resource::{Resource, setrlimit};
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;
    use tokio::process::{Child, Command};
    use tracing::debug;

    use super::ProcessControl;
    use crate::types::ResourceLimits;

    /// Process groups plus `setrlimit` applied between fork and exec
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UnixControl;

    impl UnixControl {
        fn signal_group(pid: Option<u32>, signal: Signal) {
            // The child leads its own group, so its PID is the PGID.
            if let Some(pid) = pid
                && let Ok(pid) = i32::try_from(pid)
                && let Err(errno) = killpg(Pid::from_raw(pid), signal)
            {
                debug!(pid, ?signal, %errno, "killpg failed");
            }
        }
    }

    impl ProcessControl for UnixControl {
        fn name(&self) -> &'static str {
            "unix"
        }

        fn enforces_memory_limit(&self) -> bool {
            true
        }

        fn configure(&self, command: &mut Command, limits: &ResourceLimits) {
            command.process_group(0);

            let address_space = limits
                .memory_limit_mb
                .map(|mb| mb.saturating_mul(1024 * 1024) as nix::libc::rlim_t);

            // SAFETY: the closure runs in the forked child before exec and only
            // calls setrlimit, which is async-signal-safe.
            unsafe {
                command.pre_exec(move || {
                    setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
                    if let Some(bytes) = address_space {
                        setrlimit(Resource::RLIMIT_AS, bytes, bytes)?;
                    }
                    Ok(())
                });
            }
        }

        fn terminate(&self, child: &Child) {
            Self::signal_group(child.id(), Signal::SIGTERM);
        }

        fn kill(&self, child: &mut Child) {
            Self::signal_group(child.id(), Signal::SIGKILL);
            let _ = child.start_kill();
        }

        fn reap_descendants(&self, pid: u32) {
            // The group outlives its leader while any member is alive.
            Self::signal_group(Some(pid), Signal::SIGKILL);
        }

        fn kill_tree(&self, pid: u32) {
            Self::signal_group(Some(pid), Signal::SIGKILL);
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::os::windows::process::CommandExt;
    use std::process::Stdio;

    use tokio::process::{Child, Command};
    use tracing::debug;

    use super::ProcessControl;
    use crate::types::ResourceLimits;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    /// Console-less spawn with `taskkill /T` tree termination.
    ///
    /// No per-process memory ceiling is applied here; only the timeout is
    /// enforced on Windows hosts.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WindowsControl;

    impl WindowsControl {
        fn taskkill(pid: Option<u32>, force: bool) {
            let Some(pid) = pid else {
                return;
            };
            let mut command = std::process::Command::new("taskkill");
            command.arg("/T");
            if force {
                command.arg("/F");
            }
            command
                .arg("/PID")
                .arg(pid.to_string())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .creation_flags(CREATE_NO_WINDOW);
            if let Err(e) = command.spawn() {
                debug!(pid, error = %e, "taskkill spawn failed");
            }
        }
    }

    impl ProcessControl for WindowsControl {
        fn name(&self) -> &'static str {
            "windows"
        }

        fn enforces_memory_limit(&self) -> bool {
            false
        }

        fn configure(&self, command: &mut Command, _limits: &ResourceLimits) {
            command.creation_flags(CREATE_NO_WINDOW);
        }

        fn terminate(&self, child: &Child) {
            Self::taskkill(child.id(), false);
        }

        fn kill(&self, child: &mut Child) {
            Self::taskkill(child.id(), true);
            let _ = child.start_kill();
        }

        fn reap_descendants(&self, _pid: u32) {
            // taskkill /T walks parent links, which are gone once the parent
            // has exited.
        }

        fn kill_tree(&self, pid: u32) {
            Self::taskkill(Some(pid), true);
        }
    }
}
