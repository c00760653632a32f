//! Configuration file loading for polyrun
//!
//! Handles loading and parsing configuration files using the config crate.

use std::collections::HashSet;
use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use crate::config::{Config, ConfigError, ENV_PREFIX, EXAMPLE_CONFIG};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load the embedded defaults (or `path` instead), then apply
    /// `POLYRUN_*` environment overrides for the scalar settings.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder();
        let builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml)),
        };
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_executions == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_executions must be at least 1".to_string(),
            ));
        }
        if !(self.max_timeout > 0.0) {
            return Err(ConfigError::Invalid(
                "max_timeout must be positive".to_string(),
            ));
        }
        if self.kill_grace < 0.0 {
            return Err(ConfigError::Invalid(
                "kill_grace must not be negative".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for lang in &self.languages {
            let id = &lang.id;
            if id.is_empty() {
                return Err(ConfigError::Invalid("language with empty id".to_string()));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::DuplicateLanguage(id.clone()));
            }
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if !(lang.timeout > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has non-positive timeout"
                )));
            }
            if let Some(ref compile) = lang.compile {
                if compile.command.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile command"
                    )));
                }
                if compile.output_name.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile output name"
                    )));
                }
                if !(compile.timeout > 0.0) {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has non-positive compile timeout"
                    )));
                }
            }
        }

        Ok(())
    }
}
