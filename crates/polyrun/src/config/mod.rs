use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::language::{
    CommandPaths, CompileConfig, DEFAULT_COMPILE_TIMEOUT, DEFAULT_MEMORY_LIMIT_MB,
    DEFAULT_RUN_TIMEOUT, FileExtension, Language, RunConfig,
};
pub use crate::config::registry::LanguageRegistry;
use crate::types::ResourceLimits;

pub mod language;
mod loader;
mod registry;

/// Example configuration embedded at compile time.
///
/// Holds the 12 built-in languages. Library users can write it out to get a
/// starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../polyrun.example.toml");

/// Prefix for environment variable overrides (`POLYRUN_MAX_TIMEOUT=20`)
pub const ENV_PREFIX: &str = "POLYRUN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("language '{0}' is defined more than once")]
    DuplicateLanguage(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for the execution engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory under which per-execution workspaces are created
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Maximum number of executions running at once; further requests wait
    #[serde(default = "default_max_concurrent_executions")]
    pub max_concurrent_executions: usize,

    /// Ceiling for per-request timeout overrides, in seconds
    #[serde(default = "default_max_timeout")]
    pub max_timeout: f64,

    /// Maximum accepted source size in bytes
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,

    /// Maximum captured bytes per output stream
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Seconds between terminate and force kill when the watchdog fires
    #[serde(default = "default_kill_grace")]
    pub kill_grace: f64,

    /// Host environment variables passed through to child processes.
    /// Everything else is cleared.
    #[serde(default = "default_inherit_env")]
    pub inherit_env: Vec<String>,

    /// Language configurations, in listing order
    #[serde(default)]
    pub languages: Vec<Language>,
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            max_concurrent_executions: default_max_concurrent_executions(),
            max_timeout: default_max_timeout(),
            max_code_bytes: default_max_code_bytes(),
            max_output_bytes: default_max_output_bytes(),
            kill_grace: default_kill_grace(),
            inherit_env: default_inherit_env(),
            languages: Vec::new(),
        }
    }

    /// Get a language by ID
    pub fn get_language(&self, id: &str) -> Result<&Language, ConfigError> {
        self.languages
            .iter()
            .find(|lang| lang.id == id)
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Build the immutable registry from the configured languages
    pub fn registry(&self) -> Result<LanguageRegistry, ConfigError> {
        LanguageRegistry::new(self.languages.clone())
    }

    /// Engine-wide limits layered under a phase's own limits
    pub fn base_limits(&self) -> ResourceLimits {
        ResourceLimits::unset()
            .with_max_output(self.max_output_bytes)
            .with_kill_grace(self.kill_grace)
    }

    /// Merge phase limits with engine-wide settings
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        match overrides {
            Some(limits) => self.base_limits().with_overrides(limits),
            None => ResourceLimits::default().with_overrides(&self.base_limits()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("polyrun")
}

fn default_max_concurrent_executions() -> usize {
    8
}

fn default_max_timeout() -> f64 {
    30.0
}

fn default_max_code_bytes() -> usize {
    64 * 1024
}

fn default_max_output_bytes() -> usize {
    ResourceLimits::MB
}

fn default_kill_grace() -> f64 {
    0.5
}

fn default_inherit_env() -> Vec<String> {
    [
        "PATH",
        "HOME",
        "LANG",
        "TMPDIR",
        // Windows needs these to start most toolchains
        "SYSTEMROOT",
        "TEMP",
        "TMP",
        "USERPROFILE",
        "PATHEXT",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
