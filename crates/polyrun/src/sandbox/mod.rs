//! Process sandbox
//!
//! Private per-execution workspaces plus a process runner that spawns,
//! watches and terminates child process trees under time and memory limits.
//!
//! Isolation is limited to a private working directory, a cleared
//! environment and the time/memory ceilings. There is no chroot, network
//! namespace or syscall filter.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::sandbox::command::SandboxCommand;
pub use crate::sandbox::platform::{ProcessControl, native_control};
pub use crate::sandbox::process::{ProcessOutput, ProcessRunner};
pub use crate::sandbox::workspace::{Workspace, WorkspaceManager};

mod command;
mod platform;
mod process;
mod workspace;

/// Errors raised when the sandbox itself cannot operate
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create workspace {path}: {source}")]
    WorkspaceCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove workspace {path}: {source}")]
    WorkspaceCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace pool is closed")]
    PoolClosed,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("command is empty")]
    EmptyCommand,

    #[error("program '{0}' not found in PATH")]
    ProgramNotFound(String),

    #[error("failed to spawn process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve the program in a command to a full path using the host's PATH.
///
/// Children run with a cleared environment, so the lookup happens here
/// against the engine's own PATH. Commands that already contain a path
/// separator (like `/ws/main` or `./main`) are left unchanged. On Windows
/// the `PATHEXT` suffixes are tried as well.
pub fn resolve_command(command: &mut [String]) -> Result<(), SandboxError> {
    let first = match command.first_mut() {
        Some(first) => first,
        None => return Err(SandboxError::EmptyCommand),
    };

    if first.contains('/') || first.contains(std::path::MAIN_SEPARATOR) {
        return Ok(());
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    if let Some(found) = find_in_path(first, &path_var) {
        *first = found.to_string_lossy().into_owned();
        return Ok(());
    }

    Err(SandboxError::ProgramNotFound(first.clone()))
}

fn find_in_path(program: &str, path_var: &OsString) -> Option<PathBuf> {
    let suffixes = executable_suffixes();
    std::env::split_paths(path_var).find_map(|dir| {
        suffixes.iter().find_map(|suffix| {
            let candidate = dir.join(format!("{program}{suffix}"));
            is_executable(&candidate).then_some(candidate)
        })
    })
}

#[cfg(windows)]
fn executable_suffixes() -> Vec<String> {
    let pathext = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    std::iter::once(String::new())
        .chain(pathext.split(';').filter(|s| !s.is_empty()).map(str::to_owned))
        .collect()
}

#[cfg(not(windows))]
fn executable_suffixes() -> Vec<String> {
    vec![String::new()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
