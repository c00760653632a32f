use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exit code reported when the real one is not authoritative (timeouts, missing status)
pub const SENTINEL_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall clock time limit in seconds
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Memory ceiling in megabytes (applied as an address-space limit where supported)
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,

    /// Maximum captured bytes per output stream
    #[serde(default)]
    pub max_output: Option<usize>,

    /// Seconds between the terminate signal and the force kill
    #[serde(default)]
    pub kill_grace: Option<f64>,
}

impl ResourceLimits {
    /// 1 kibibyte in bytes
    pub const KB: usize = 1024;
    /// 1 mebibyte in bytes
    pub const MB: usize = 1024 * 1024;

    /// Create new resource limits with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits with every field unset, useful as an override layer
    pub fn unset() -> Self {
        Self {
            timeout: None,
            memory_limit_mb: None,
            max_output: None,
            kill_grace: None,
        }
    }

    /// Set the wall clock time limit in seconds
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Set the memory ceiling in megabytes
    pub fn with_memory_limit_mb(mut self, mb: u64) -> Self {
        self.memory_limit_mb = Some(mb);
        self
    }

    /// Remove the memory ceiling
    pub fn without_memory_limit(mut self) -> Self {
        self.memory_limit_mb = None;
        self
    }

    /// Set the per-stream output cap in bytes
    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output = Some(bytes);
        self
    }

    /// Set the grace period between terminate and kill
    pub fn with_kill_grace(mut self, seconds: f64) -> Self {
        self.kill_grace = Some(seconds);
        self
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            timeout: overrides.timeout.or(self.timeout),
            memory_limit_mb: overrides.memory_limit_mb.or(self.memory_limit_mb),
            max_output: overrides.max_output.or(self.max_output),
            kill_grace: overrides.kill_grace.or(self.kill_grace),
        }
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout: Some(10.0),
            memory_limit_mb: Some(256),
            max_output: Some(ResourceLimits::MB),
            kill_grace: Some(0.5),
        }
    }
}

/// A code submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code to run
    pub code: String,

    /// Language ID from the registry (e.g. "python", "cpp")
    pub language: String,

    /// Optional run timeout in seconds, capped by the configured ceiling
    #[serde(default)]
    pub timeout: Option<f64>,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

/// Terminal state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Program ran and exited with code 0
    Completed,

    /// Compiler rejected the source (or timed out, or produced no artifact)
    CompileFailed,

    /// Program exited non-zero or was killed by a signal
    RuntimeError,

    /// Program was killed by the watchdog
    TimedOut,
}

/// Outcome of one execution
///
/// Built only by the result recorder, so `success` always agrees with
/// `exit_code`, `timeout_occurred` and `compiled`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub(crate) execution_id: Uuid,
    pub(crate) language: String,
    pub(crate) status: ExecutionStatus,
    pub(crate) success: bool,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) exit_code: i32,
    pub(crate) execution_time: f64,
    pub(crate) timeout_occurred: bool,
    pub(crate) compiled: bool,
    pub(crate) stdout_truncated: bool,
    pub(crate) stderr_truncated: bool,
}

impl ExecutionResult {
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Exit code of the last phase; [`SENTINEL_EXIT_CODE`] after a timeout
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Seconds spent in the run phase (compile phase if compilation failed)
    pub fn execution_time(&self) -> f64 {
        self.execution_time
    }

    pub fn timeout_occurred(&self) -> bool {
        self.timeout_occurred
    }

    /// Whether compilation produced an artifact. Always false for interpreted languages.
    pub fn compiled(&self) -> bool {
        self.compiled
    }

    pub fn stdout_truncated(&self) -> bool {
        self.stdout_truncated
    }

    pub fn stderr_truncated(&self) -> bool {
        self.stderr_truncated
    }
}
