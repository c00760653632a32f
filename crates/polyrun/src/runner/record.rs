//! Turns phase outcomes into the single [`ExecutionResult`] returned to callers

use uuid::Uuid;

use crate::config::Language;
use crate::runner::CompileResult;
use crate::sandbox::ProcessOutput;
use crate::types::{ExecutionResult, ExecutionStatus, SENTINEL_EXIT_CODE};

/// Whether an execution counts as successful
///
/// Output content never matters, only exit status and phase flags.
pub fn is_success(
    exit_code: i32,
    timed_out: bool,
    requires_compilation: bool,
    compiled: bool,
) -> bool {
    exit_code == 0 && !timed_out && (!requires_compilation || compiled)
}

/// Collects the state of one execution from admission to its terminal result
#[derive(Debug, Clone)]
pub struct ExecutionRecorder {
    execution_id: Uuid,
    language: String,
    requires_compilation: bool,
    compiled: bool,
}

impl ExecutionRecorder {
    /// Start recording an admitted execution
    pub fn admit(execution_id: Uuid, language: &Language) -> Self {
        Self {
            execution_id,
            language: language.id.clone(),
            requires_compilation: language.requires_compilation(),
            compiled: false,
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Record that the compile phase produced an artifact
    pub fn mark_compiled(&mut self) {
        self.compiled = true;
    }

    /// Terminal result for a failed compile phase; the run phase never happened
    pub fn compile_failed(self, compile: &CompileResult) -> ExecutionResult {
        let execution = &compile.execution;
        let exit_code = if execution.timed_out {
            SENTINEL_EXIT_CODE
        } else {
            match execution.exit_code {
                // Exit 0 without an artifact is still a failure.
                Some(0) => 1,
                Some(code) => code,
                None => SENTINEL_EXIT_CODE,
            }
        };

        ExecutionResult {
            execution_id: self.execution_id,
            language: self.language,
            status: ExecutionStatus::CompileFailed,
            success: false,
            stdout: String::new(),
            stderr: compile.output.clone(),
            exit_code,
            execution_time: execution.wall_time.as_secs_f64(),
            timeout_occurred: execution.timed_out,
            compiled: false,
            // Compiler stdout and stderr are both reported as stderr.
            stdout_truncated: false,
            stderr_truncated: execution.stdout_truncated || execution.stderr_truncated,
        }
    }

    /// Terminal result from the run phase
    pub fn finish(self, run: &ProcessOutput) -> ExecutionResult {
        let exit_code = run.reported_exit_code();
        let success = is_success(
            exit_code,
            run.timed_out,
            self.requires_compilation,
            self.compiled,
        );
        let status = if run.timed_out {
            ExecutionStatus::TimedOut
        } else if success {
            ExecutionStatus::Completed
        } else if self.requires_compilation && !self.compiled {
            ExecutionStatus::CompileFailed
        } else {
            ExecutionStatus::RuntimeError
        };

        ExecutionResult {
            execution_id: self.execution_id,
            language: self.language,
            status,
            success,
            stdout: String::from_utf8_lossy(&run.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&run.stderr).into_owned(),
            exit_code,
            execution_time: run.wall_time.as_secs_f64(),
            timeout_occurred: run.timed_out,
            compiled: self.compiled,
            stdout_truncated: run.stdout_truncated,
            stderr_truncated: run.stderr_truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;
    use crate::config::Config;

    fn recorder(id: &str) -> ExecutionRecorder {
        let config = Config::default();
        ExecutionRecorder::admit(Uuid::new_v4(), config.get_language(id).unwrap())
    }

    fn exited(code: i32) -> ProcessOutput {
        ProcessOutput {
            stdout: b"Hello\n".to_vec(),
            exit_code: Some(code),
            wall_time: Duration::from_millis(40),
            ..Default::default()
        }
    }

    #[test]
    fn interpreted_success() {
        let result = recorder("python").finish(&exited(0));
        assert!(result.is_success());
        assert_eq!(result.status(), ExecutionStatus::Completed);
        assert_eq!(result.stdout(), "Hello\n");
        assert!(!result.compiled());
        assert!((result.execution_time() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn runtime_error_is_not_success() {
        let result = recorder("python").finish(&exited(1));
        assert!(!result.is_success());
        assert_eq!(result.status(), ExecutionStatus::RuntimeError);
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn timeout_reports_sentinel() {
        let run = ProcessOutput {
            exit_code: Some(0),
            timed_out: true,
            ..Default::default()
        };
        let result = recorder("python").finish(&run);
        assert!(!result.is_success());
        assert!(result.timeout_occurred());
        assert_eq!(result.status(), ExecutionStatus::TimedOut);
        assert_eq!(result.exit_code(), SENTINEL_EXIT_CODE);
    }

    #[test]
    fn compiled_language_needs_compile_mark() {
        let result = recorder("c").finish(&exited(0));
        assert!(!result.is_success());
        assert_eq!(result.status(), ExecutionStatus::CompileFailed);

        let mut marked = recorder("c");
        marked.mark_compiled();
        let result = marked.finish(&exited(0));
        assert!(result.is_success());
        assert!(result.compiled());
    }

    #[test]
    fn compile_failure_carries_diagnostics() {
        let compile = CompileResult {
            success: false,
            artifact: None,
            execution: ProcessOutput {
                stderr: b"main.c:1:15: error: expected ';'".to_vec(),
                exit_code: Some(1),
                wall_time: Duration::from_millis(120),
                ..Default::default()
            },
            output: "main.c:1:15: error: expected ';'".to_owned(),
        };
        let result = recorder("c").compile_failed(&compile);
        assert!(!result.is_success());
        assert!(!result.compiled());
        assert_eq!(result.status(), ExecutionStatus::CompileFailed);
        assert_eq!(result.exit_code(), 1);
        assert!(result.stderr().contains("expected ';'"));
        assert!(result.stdout().is_empty());
    }

    #[test]
    fn compile_exit_zero_without_artifact_reports_failure_code() {
        let compile = CompileResult {
            success: false,
            artifact: None,
            execution: exited(0),
            output: "compiler exited successfully but produced no artifact".to_owned(),
        };
        let result = recorder("go").compile_failed(&compile);
        assert_ne!(result.exit_code(), 0);
        assert!(!result.is_success());
    }

    #[test]
    fn compile_timeout_is_flagged() {
        let compile = CompileResult {
            success: false,
            artifact: None,
            execution: ProcessOutput {
                timed_out: true,
                ..Default::default()
            },
            output: "compilation timed out after 10s".to_owned(),
        };
        let result = recorder("cpp").compile_failed(&compile);
        assert!(result.timeout_occurred());
        assert_eq!(result.exit_code(), SENTINEL_EXIT_CODE);
        assert_eq!(result.status(), ExecutionStatus::CompileFailed);
    }

    #[test]
    fn compiler_stdout_truncation_counts_as_stderr() {
        let compile = CompileResult {
            success: false,
            artifact: None,
            execution: ProcessOutput {
                exit_code: Some(1),
                stdout_truncated: true,
                ..Default::default()
            },
            output: "Main.java:3: error: ';' expected".to_owned(),
        };
        let result = recorder("java").compile_failed(&compile);
        assert!(result.stderr_truncated());
        assert!(!result.stdout_truncated());
    }

    proptest! {
        #[test]
        fn finish_agrees_with_success_rule(
            code in -1i32..256,
            timed_out in any::<bool>(),
            compiled in any::<bool>(),
            lang in prop::sample::select(vec!["python", "bash", "c", "java"]),
        ) {
            let mut rec = recorder(lang);
            let requires_compilation = lang == "c" || lang == "java";
            if compiled {
                rec.mark_compiled();
            }
            let run = ProcessOutput {
                exit_code: Some(code),
                timed_out,
                ..Default::default()
            };
            let result = rec.finish(&run);
            let expected = code == 0 && !timed_out && (!requires_compilation || compiled);
            prop_assert_eq!(result.is_success(), expected);
            prop_assert_eq!(result.status() == ExecutionStatus::Completed, expected);
        }
    }
}
