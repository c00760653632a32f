use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::ResourceLimits;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Default run timeout in seconds when a language does not set one
pub const DEFAULT_RUN_TIMEOUT: f64 = 10.0;

/// Default compile timeout in seconds when a language does not set one
pub const DEFAULT_COMPILE_TIMEOUT: f64 = 15.0;

/// Default memory ceiling in megabytes
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 256;

/// Build and run instructions for one language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Registry ID used in requests (e.g., "cpp")
    pub id: String,

    /// Human-readable name for the language (e.g., "C++")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Source file name override (Java needs `Main.java`)
    #[serde(default)]
    pub source_name: Option<String>,

    /// Default run timeout in seconds
    #[serde(default = "default_run_timeout")]
    pub timeout: f64,

    /// Memory ceiling in megabytes
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,

    /// Apply the memory ceiling as an address-space rlimit.
    ///
    /// JVM, V8, Go and .NET runtimes reserve far more virtual memory than they
    /// use, so an address-space cap kills them at startup. Those languages set
    /// this to false and rely on the timeout alone.
    #[serde(default = "default_true")]
    pub limit_address_space: bool,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,
}

impl Language {
    /// Check if the language needs a compile phase
    pub fn requires_compilation(&self) -> bool {
        self.compile.is_some()
    }

    /// Get the source file name for this language
    pub fn source_name(&self) -> String {
        match self.source_name {
            Some(ref name) => name.clone(),
            None => format!("main.{}", self.extension),
        }
    }

    /// Artifact file name produced by the compiler, with the platform suffix applied
    pub fn artifact_name(&self) -> Option<String> {
        self.compile
            .as_ref()
            .map(|compile| compile.output_name.replace("{exe}", std::env::consts::EXE_SUFFIX))
    }

    /// Limits the language sets for the run phase
    ///
    /// Only time and memory; output cap and kill grace come from the engine.
    pub fn run_limits(&self) -> ResourceLimits {
        let limits = ResourceLimits::unset()
            .with_timeout(self.timeout)
            .with_memory_limit_mb(self.memory_limit_mb);
        if self.limit_address_space {
            limits
        } else {
            limits.without_memory_limit()
        }
    }

    /// Limits the language sets for the compile phase
    pub fn compile_limits(&self) -> Option<ResourceLimits> {
        // Compilers run without an address-space cap; linkers and javac map large regions.
        self.compile
            .as_ref()
            .map(|compile| ResourceLimits::unset().with_timeout(compile.timeout))
    }

    /// Expand placeholders in the given command
    ///
    /// Placeholders: `{source}`, `{output}`, `{binary}`, `{dir}`, `{exe}`
    pub fn expand_command(command: &[String], paths: &CommandPaths<'_>) -> Vec<String> {
        let source = paths.source.to_string_lossy();
        let output = paths.output.to_string_lossy();
        let dir = paths.dir.to_string_lossy();
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source)
                    .replace("{output}", &output)
                    .replace("{binary}", &output)
                    .replace("{dir}", &dir)
                    .replace("{exe}", std::env::consts::EXE_SUFFIX)
            })
            .collect()
    }
}

/// Paths substituted into command templates
#[derive(Debug, Clone, Copy)]
pub struct CommandPaths<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub dir: &'a Path,
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    pub command: Vec<String>,

    /// Replacement command used on Windows hosts
    #[serde(default)]
    pub windows_command: Option<Vec<String>>,

    /// Artifact name inside the workspace (e.g., "main{exe}", "Main.class")
    pub output_name: String,

    /// Compile timeout in seconds, budgeted separately from the run timeout
    #[serde(default = "default_compile_timeout")]
    pub timeout: f64,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CompileConfig {
    /// Command template for the current host
    pub fn platform_command(&self) -> &[String] {
        select_platform_command(&self.command, self.windows_command.as_deref())
    }
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    pub command: Vec<String>,

    /// Replacement command used on Windows hosts
    #[serde(default)]
    pub windows_command: Option<Vec<String>>,

    /// Environment variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl RunConfig {
    /// Command template for the current host
    pub fn platform_command(&self) -> &[String] {
        select_platform_command(&self.command, self.windows_command.as_deref())
    }
}

fn select_platform_command<'a>(default: &'a [String], windows: Option<&'a [String]>) -> &'a [String] {
    match windows {
        Some(command) if cfg!(windows) => command,
        _ => default,
    }
}

fn default_run_timeout() -> f64 {
    DEFAULT_RUN_TIMEOUT
}

fn default_compile_timeout() -> f64 {
    DEFAULT_COMPILE_TIMEOUT
}

fn default_memory_limit_mb() -> u64 {
    DEFAULT_MEMORY_LIMIT_MB
}

fn default_true() -> bool {
    true
}


#[cfg(test)]
mod proptests {
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn file_extension_rejects_all_strings_with_slash(s in ".*/.*.") {
            prop_assert!(FileExtension::new(&s).is_err());
        }

        #[test]
        fn file_extension_accepts_alphanumeric(s in "[a-zA-Z0-9_-]+") {
            prop_assert!(FileExtension::new(&s).is_ok());
        }

        #[test]
        fn expand_command_preserves_args_without_placeholders(
            arg1 in "[a-z]+",
            arg2 in "[a-z]+",
        ) {
            let source = PathBuf::from("/w/s");
            let output = PathBuf::from("/w/o");
            let dir = PathBuf::from("/w");
            let cmd = vec![arg1.clone(), arg2.clone()];
            let result = Language::expand_command(
                &cmd,
                &CommandPaths { source: &source, output: &output, dir: &dir },
            );
            prop_assert_eq!(&result[0], &arg1);
            prop_assert_eq!(&result[1], &arg2);
        }

        #[test]
        fn expand_command_length_preserved(cmd_len in 1usize..10) {
            let source = PathBuf::from("/w/s");
            let output = PathBuf::from("/w/o");
            let dir = PathBuf::from("/w");
            let cmd: Vec<String> = (0..cmd_len).map(|i| format!("arg{i}-{{source}}")).collect();
            let result = Language::expand_command(
                &cmd,
                &CommandPaths { source: &source, output: &output, dir: &dir },
            );
            prop_assert_eq!(result.len(), cmd_len);
        }
    }
}
