//! Code runner for polyrun
//!
//! Orchestrates one execution end to end: language lookup, workspace,
//! optional compile phase, run phase, result recording and cleanup.

use std::sync::Arc;

use thiserror::Error;
use tracing::{Span, debug, instrument, warn};
use uuid::Uuid;

pub use crate::runner::compile::{CompileResult, compile};
pub use crate::runner::execute::{execute, execute_interpreted};
pub use crate::runner::record::{ExecutionRecorder, is_success};

mod compile;
mod execute;
mod record;

use crate::{
    config::{Config, ConfigError, Language, LanguageRegistry},
    sandbox::{ProcessOutput, ProcessRunner, SandboxError, Workspace, WorkspaceManager},
    types::{ExecutionRequest, ExecutionResult, ResourceLimits},
};

/// Errors that occur during compilation
///
/// Compiler diagnostics are not errors; they come back in [`CompileResult`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("language '{0}' does not support compilation")]
    NotCompiled(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

/// Errors that occur during execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("execution not started: {0}")]
    NotStarted(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

/// Errors from a full execution request
///
/// Problems with the submitted code are never errors; they are reported in
/// the [`ExecutionResult`]. These variants cover bad requests and a sandbox
/// that cannot operate.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("code is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),

    #[error("infrastructure error: {0}")]
    Infrastructure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExecutionError {
    /// The request itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLanguage(_) | Self::PayloadTooLarge { .. } | Self::InvalidTimeout(_)
        )
    }

    /// The engine could not operate (missing toolchain, disk failure)
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

impl From<SandboxError> for ExecutionError {
    fn from(err: SandboxError) -> Self {
        Self::Infrastructure(Box::new(err))
    }
}

impl From<CompileError> for ExecutionError {
    fn from(err: CompileError) -> Self {
        Self::Infrastructure(Box::new(err))
    }
}

impl From<ExecuteError> for ExecutionError {
    fn from(err: ExecuteError) -> Self {
        Self::Infrastructure(Box::new(err))
    }
}

/// High-level runner for code execution
///
/// Cheap to clone; clones share the registry and the workspace slots.
#[derive(Debug, Clone)]
pub struct Runner {
    config: Arc<Config>,
    registry: Arc<LanguageRegistry>,
    workspaces: WorkspaceManager,
    processes: ProcessRunner,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_process_runner(config, ProcessRunner::native())
    }

    /// Create a runner with an explicit process strategy
    pub fn with_process_runner(
        config: Config,
        processes: ProcessRunner,
    ) -> Result<Self, ConfigError> {
        let registry = config.registry()?;
        let workspaces =
            WorkspaceManager::new(&config.workspace_root, config.max_concurrent_executions);
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            workspaces,
            processes,
        })
    }

    /// Create a new runner with the built-in languages
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the language registry
    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Get the workspace manager
    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Compile source code into `workspace`
    pub async fn compile(
        &self,
        workspace: &Workspace,
        source: &[u8],
        language: &Language,
    ) -> Result<CompileResult, CompileError> {
        compile::compile(workspace, &self.config, &self.processes, language, source).await
    }

    /// Run the program already placed in `workspace`
    pub async fn run(
        &self,
        workspace: &Workspace,
        language: &Language,
        limits: Option<&ResourceLimits>,
    ) -> Result<ProcessOutput, ExecuteError> {
        execute::execute(workspace, &self.config, &self.processes, language, limits).await
    }

    /// Execute a request end to end
    ///
    /// The workspace is removed on every path, including errors.
    #[instrument(skip(self, request), fields(language = %request.language, execution_id))]
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let execution_id = Uuid::new_v4();
        Span::current().record("execution_id", tracing::field::display(execution_id));

        let language = self
            .registry
            .lookup(&request.language)
            .map_err(|_| ExecutionError::UnsupportedLanguage(request.language.clone()))?;

        let size = request.code.len();
        if size > self.config.max_code_bytes {
            return Err(ExecutionError::PayloadTooLarge {
                size,
                limit: self.config.max_code_bytes,
            });
        }

        let timeout = self.resolve_timeout(language, request.timeout)?;
        let limits = ResourceLimits::unset().with_timeout(timeout);

        let workspace = self.workspaces.acquire(execution_id).await?;
        debug!(path = %workspace.path().display(), timeout, "workspace ready");

        let outcome = self
            .execute_in(&workspace, language, request.code.as_bytes(), &limits, execution_id)
            .await;

        // A finished result is still returned if removal fails.
        if let Err(e) = workspace.close().await {
            warn!(error = %e, completed = outcome.is_ok(), "workspace cleanup failed");
        }

        let result = outcome?;
        debug!(
            status = ?result.status(),
            success = result.is_success(),
            exit_code = result.exit_code(),
            "execution finished"
        );
        Ok(result)
    }

    async fn execute_in(
        &self,
        workspace: &Workspace,
        language: &Language,
        source: &[u8],
        limits: &ResourceLimits,
        execution_id: Uuid,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut recorder = ExecutionRecorder::admit(execution_id, language);

        let run = if language.requires_compilation() {
            let compiled = self.compile(workspace, source, language).await?;
            if !compiled.is_success() {
                return Ok(recorder.compile_failed(&compiled));
            }
            recorder.mark_compiled();
            self.run(workspace, language, Some(limits)).await?
        } else {
            execute::execute_interpreted(
                workspace,
                &self.config,
                &self.processes,
                language,
                source,
                Some(limits),
            )
            .await?
        };

        Ok(recorder.finish(&run))
    }

    /// Pick the run timeout: the language default, or the caller's value capped
    /// at `max_timeout`
    fn resolve_timeout(
        &self,
        language: &Language,
        requested: Option<f64>,
    ) -> Result<f64, ExecutionError> {
        match requested {
            None => Ok(language.timeout.min(self.config.max_timeout)),
            Some(t) if !t.is_finite() || t <= 0.0 => Err(ExecutionError::InvalidTimeout(t)),
            Some(t) => Ok(t.min(self.config.max_timeout)),
        }
    }
}
