//! Per-execution workspace lifecycle
//!
//! Each execution gets a fresh private directory under the configured root.
//! The directory is removed by [`Workspace::close`] or, failing that, when the
//! workspace is dropped.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::sandbox::SandboxError;

const REMOVE_ATTEMPTS: u32 = 3;
const REMOVE_BACKOFF: Duration = Duration::from_millis(50);

/// A private directory owned by one execution
///
/// Holds a slot of the [`WorkspaceManager`] until dropped.
#[derive(Debug)]
pub struct Workspace {
    execution_id: Uuid,
    path: PathBuf,
    removed: bool,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Workspace {
    /// Create a fresh workspace directory `root/<execution_id>`
    ///
    /// Fails if the directory already exists.
    #[instrument(skip(root), fields(root = %root.display()))]
    pub async fn create(root: &Path, execution_id: Uuid) -> Result<Self, SandboxError> {
        let path = root.join(execution_id.simple().to_string());

        let mut builder = tokio::fs::DirBuilder::new();
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&path)
            .await
            .map_err(|source| SandboxError::WorkspaceCreate {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "workspace created");
        Ok(Self {
            execution_id,
            path,
            removed: false,
            _permit: None,
        })
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Absolute path of the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Host path of a file inside the workspace
    ///
    /// Rejects absolute names and any `..` component.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, SandboxError> {
        let relative = Path::new(name);
        let escapes = name.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SandboxError::InvalidPath(format!(
                "path must stay inside the workspace: {name}"
            )));
        }
        Ok(self.path.join(relative))
    }

    /// Write a source file and return its absolute path
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn write_source(&self, name: &str, content: &[u8]) -> Result<PathBuf, SandboxError> {
        let path = self.file_path(name)?;
        if let Some(parent) = path.parent()
            && parent != self.path
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!("wrote source file");
        Ok(path)
    }

    /// Absolute path where a compile artifact named `name` is expected
    pub fn artifact_path(&self, name: &str) -> Result<PathBuf, SandboxError> {
        self.file_path(name)
    }

    /// Read a file from the workspace
    pub async fn read_file(&self, name: &str) -> Result<Vec<u8>, SandboxError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::read(&path).await?)
    }

    /// Check if a file exists in the workspace
    pub async fn file_exists(&self, name: &str) -> Result<bool, SandboxError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Remove the workspace directory and everything in it
    ///
    /// Retries briefly, since a just-killed process may still be releasing
    /// files. The slot is released whether or not removal succeeds.
    #[must_use = "cleanup errors should be handled"]
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn close(mut self) -> Result<(), SandboxError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match tokio::fs::remove_dir_all(&self.path).await {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
                Err(e) if attempt < REMOVE_ATTEMPTS => {
                    debug!(attempt, error = %e, "workspace removal failed, retrying");
                    tokio::time::sleep(REMOVE_BACKOFF * attempt).await;
                }
                Err(source) => {
                    // Drop would just fail again.
                    self.removed = true;
                    return Err(SandboxError::WorkspaceCleanup {
                        path: self.path.clone(),
                        source,
                    });
                }
            }
        }
        self.removed = true;
        debug!("workspace removed");
        Ok(())
    }

    pub(crate) fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self._permit = Some(permit);
        self
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "workspace removed on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove workspace on drop"
            ),
        }
    }
}

/// Hands out workspaces under a root directory, bounding how many exist at once
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkspaceManager {
    /// Create a manager allowing `capacity` concurrent workspaces (minimum 1)
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            root: root.into(),
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot, then create the workspace for `execution_id`
    #[instrument(skip(self))]
    pub async fn acquire(&self, execution_id: Uuid) -> Result<Workspace, SandboxError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SandboxError::PoolClosed)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| SandboxError::WorkspaceCreate {
                path: self.root.clone(),
                source,
            })?;

        let workspace = Workspace::create(&self.root, execution_id).await?;
        Ok(workspace.with_permit(permit))
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
