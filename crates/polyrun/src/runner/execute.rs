//! Execution step for code running
//!
//! Runs an interpreted source file or a compiled artifact under the run-phase
//! limits.

use tracing::{debug, instrument};

use crate::config::{CommandPaths, Config, Language};
use crate::runner::ExecuteError;
use crate::sandbox::{ProcessOutput, ProcessRunner, SandboxCommand, Workspace};
use crate::types::ResourceLimits;

/// Run the program already placed in the workspace
///
/// For compiled languages the artifact must exist; for interpreted ones the
/// source file must.
#[instrument(skip(workspace, config, processes, language), fields(language = %language.id))]
pub async fn execute(
    workspace: &Workspace,
    config: &Config,
    processes: &ProcessRunner,
    language: &Language,
    limits: Option<&ResourceLimits>,
) -> Result<ProcessOutput, ExecuteError> {
    let source_name = language.source_name();
    let source_path = workspace.file_path(&source_name)?;

    let output_path = match language.artifact_name() {
        Some(artifact) => {
            if !workspace.file_exists(&artifact).await? {
                return Err(ExecuteError::NotStarted(format!(
                    "artifact '{artifact}' not found - was compilation run?"
                )));
            }
            workspace.artifact_path(&artifact)?
        }
        None => {
            if !workspace.file_exists(&source_name).await? {
                return Err(ExecuteError::NotStarted(format!(
                    "source '{source_name}' not found - write source first"
                )));
            }
            source_path.clone()
        }
    };

    let command = Language::expand_command(
        language.run.platform_command(),
        &CommandPaths {
            source: &source_path,
            output: &output_path,
            dir: workspace.path(),
        },
    );

    // config defaults -> language run limits -> caller overrides
    let mut phase_limits = language.run_limits();
    if let Some(overrides) = limits {
        phase_limits = phase_limits.with_overrides(overrides);
    }
    let effective_limits = config.effective_limits(Some(&phase_limits));

    debug!(?command, timeout = ?effective_limits.timeout, "executing program");

    let command = SandboxCommand::new(command)
        .working_dir(workspace.path())
        .env_inherit(config.inherit_env.iter().cloned())
        .envs(language.run.env.clone())
        .limits(effective_limits);
    let result = processes.run(command).await?;

    debug!(
        exit_code = ?result.exit_code,
        timed_out = result.timed_out,
        wall_time = result.wall_time.as_secs_f64(),
        "execution complete"
    );

    Ok(result)
}

/// Write the source file, then run it
#[instrument(skip(workspace, config, processes, language, source), fields(language = %language.id))]
pub async fn execute_interpreted(
    workspace: &Workspace,
    config: &Config,
    processes: &ProcessRunner,
    language: &Language,
    source: &[u8],
    limits: Option<&ResourceLimits>,
) -> Result<ProcessOutput, ExecuteError> {
    workspace
        .write_source(&language.source_name(), source)
        .await?;
    execute(workspace, config, processes, language, limits).await
}
