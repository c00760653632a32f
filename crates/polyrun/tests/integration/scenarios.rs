use std::time::{Duration, Instant};

use polyrun::runner::ExecutionError;
use polyrun::types::{ExecutionRequest, ExecutionStatus};

use super::{hello_world_source, test_runner, workspace_count};

#[tokio::test]
async fn test_python_greeting() {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute(&ExecutionRequest::new("python", r#"print("Hello from Python")"#))
        .await
        .unwrap();

    assert!(result.is_success());
    assert!(result.stdout().contains("Hello from Python"));
    assert_eq!(result.exit_code(), 0);
}

#[tokio::test]
async fn test_python_infinite_loop_times_out() {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());

    let started = Instant::now();
    let result = runner
        .execute(&ExecutionRequest::new("python", "while True:\n    pass\n").with_timeout(1.0))
        .await
        .unwrap();

    assert!(result.timeout_occurred());
    assert!(!result.is_success());
    assert_eq!(result.status(), ExecutionStatus::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(workspace_count(root.path()), 0);
}

#[tokio::test]
async fn test_repeated_runs_get_distinct_ids() {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());
    let request = ExecutionRequest::new("python", hello_world_source("python"));

    let first = runner.execute(&request).await.unwrap();
    let second = runner.execute(&request).await.unwrap();

    assert_ne!(first.execution_id(), second.execution_id());
    assert_eq!(first.stdout(), second.stdout());
    assert_eq!(first.exit_code(), second.exit_code());
}

#[tokio::test]
async fn test_unsupported_language() {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());

    let err = runner
        .execute(&ExecutionRequest::new("cobol", "DISPLAY 'HELLO'."))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::UnsupportedLanguage(_)));
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_cpp_greeting_compiles() {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());

    let code = "#include <iostream>\nint main(){std::cout<<\"Hello from C++\";}";
    let result = runner
        .execute(&ExecutionRequest::new("cpp", code))
        .await
        .unwrap();

    assert!(result.compiled());
    assert!(result.is_success());
    assert!(result.stdout().contains("Hello from C++"));
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_c_syntax_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute(&ExecutionRequest::new("c", "int main(){ret"))
        .await
        .unwrap();

    assert!(!result.compiled());
    assert!(!result.is_success());
    assert_eq!(result.status(), ExecutionStatus::CompileFailed);
    assert!(!result.stderr().is_empty());
    assert_ne!(result.exit_code(), 0);
    assert_eq!(workspace_count(root.path()), 0);
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_java_compile_then_run() {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute(&ExecutionRequest::new("java", hello_world_source("java")))
        .await
        .unwrap();

    assert!(result.compiled());
    assert!(result.is_success(), "stderr: {}", result.stderr());
}
