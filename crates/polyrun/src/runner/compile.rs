//! Compilation step for code execution
//!
//! Turns a source file into an artifact inside the workspace using the
//! language's compiler command.

use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::config::{CommandPaths, Config, Language};
use crate::runner::CompileError;
use crate::sandbox::{ProcessOutput, ProcessRunner, SandboxCommand, Workspace};

/// Result of a compilation
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Compiler exited 0 in time and the artifact exists
    pub success: bool,

    /// Absolute artifact path, set only on success
    pub artifact: Option<PathBuf>,

    /// Raw process outcome of the compiler
    pub execution: ProcessOutput,

    /// Compiler diagnostics (stdout then stderr)
    pub output: String,
}

impl CompileResult {
    pub fn is_success(&self) -> bool {
        self.success && self.artifact.is_some()
    }
}

/// Write the source into the workspace and compile it
///
/// Code problems (diagnostics, compile timeout, missing artifact) come back
/// as an unsuccessful [`CompileResult`]. A missing compiler or a broken
/// workspace is an `Err`.
#[instrument(skip(workspace, config, processes, language, source), fields(language = %language.id))]
pub async fn compile(
    workspace: &Workspace,
    config: &Config,
    processes: &ProcessRunner,
    language: &Language,
    source: &[u8],
) -> Result<CompileResult, CompileError> {
    let compile_config = language
        .compile
        .as_ref()
        .ok_or_else(|| CompileError::NotCompiled(language.id.clone()))?;
    let artifact_name = language
        .artifact_name()
        .ok_or_else(|| CompileError::NotCompiled(language.id.clone()))?;

    let source_path = workspace.write_source(&language.source_name(), source).await?;
    let artifact_path = workspace.artifact_path(&artifact_name)?;

    let command = Language::expand_command(
        compile_config.platform_command(),
        &CommandPaths {
            source: &source_path,
            output: &artifact_path,
            dir: workspace.path(),
        },
    );
    let limits = config.effective_limits(language.compile_limits().as_ref());

    debug!(?command, timeout = ?limits.timeout, "compiling");

    let command = SandboxCommand::new(command)
        .working_dir(workspace.path())
        .env_inherit(config.inherit_env.iter().cloned())
        .envs(compile_config.env.clone())
        .limits(limits.clone());
    let execution = processes.run(command).await?;

    let artifact_exists = workspace.file_exists(&artifact_name).await?;
    let success = execution.is_success() && artifact_exists;

    let mut output = execution.combined_output();
    if execution.timed_out {
        push_line(
            &mut output,
            &format!(
                "compilation timed out after {}s",
                limits.timeout.unwrap_or_default()
            ),
        );
    } else if execution.is_success() && !artifact_exists {
        push_line(&mut output, "compiler exited successfully but produced no artifact");
    }

    debug!(
        success,
        exit_code = ?execution.exit_code,
        timed_out = execution.timed_out,
        artifact_exists,
        "compilation complete"
    );

    Ok(CompileResult {
        success,
        artifact: success.then_some(artifact_path),
        execution,
        output,
    })
}

fn push_line(output: &mut String, line: &str) {
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(line);
}
