//! Command builder for sandboxed processes
//!
//! Collects program, arguments, working directory, environment and limits,
//! then produces a configured [`tokio::process::Command`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::sandbox::platform::ProcessControl;
use crate::sandbox::{SandboxError, resolve_command};
use crate::types::ResourceLimits;

/// Builder for a child process run by [`ProcessRunner`](crate::sandbox::ProcessRunner)
#[derive(Debug, Clone)]
pub struct SandboxCommand {
    command: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    env_inherit: Vec<String>,
    limits: ResourceLimits,
}

impl SandboxCommand {
    /// Create a new builder for `command` (program followed by arguments)
    pub fn new(command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            working_dir: None,
            env: HashMap::new(),
            env_inherit: Vec::new(),
            limits: ResourceLimits::default(),
        }
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables
    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Pass variables through from the host environment (if set there)
    pub fn env_inherit(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.env_inherit.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Set resource limits
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Get the resource limits
    pub fn resource_limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Program name as given, before PATH resolution
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Build the process command
    ///
    /// The environment is cleared; only inherited keys and explicit variables
    /// reach the child. Stdin is closed, stdout and stderr are piped.
    pub fn build(self, control: &dyn ProcessControl) -> Result<Command, SandboxError> {
        let mut args = self.command;
        resolve_command(&mut args)?;

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for key in &self.env_inherit {
            if let Some(value) = std::env::var_os(key) {
                command.env(key, value);
            }
        }
        command.envs(&self.env);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        control.configure(&mut command, &self.limits);
        Ok(command)
    }
}
