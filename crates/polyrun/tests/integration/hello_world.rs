use polyrun::types::{ExecutionRequest, ExecutionStatus};

use super::{hello_world_source, test_runner, workspace_count};

async fn assert_hello(language: &str, greeting: &str) {
    let root = tempfile::tempdir().unwrap();
    let runner = test_runner(root.path());
    let spec = runner.registry().lookup(language).unwrap().clone();

    let result = runner
        .execute(&ExecutionRequest::new(language, hello_world_source(language)))
        .await
        .expect("execution should not hit an infrastructure error");

    assert!(
        result.is_success(),
        "{language} failed: exit={} stderr={}",
        result.exit_code(),
        result.stderr()
    );
    assert_eq!(result.status(), ExecutionStatus::Completed);
    assert_eq!(result.exit_code(), 0);
    assert!(!result.timeout_occurred());
    assert_eq!(result.compiled(), spec.requires_compilation());
    assert!(result.stdout().contains(greeting), "stdout: {}", result.stdout());
    assert!(result.execution_time() < spec.timeout);
    assert_eq!(workspace_count(root.path()), 0);
}

#[tokio::test]
async fn test_hello_python() {
    assert_hello("python", "Hello from Python").await;
}

#[tokio::test]
async fn test_hello_bash() {
    assert_hello("bash", "Hello from Bash").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_javascript() {
    assert_hello("javascript", "Hello from JavaScript").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_typescript() {
    assert_hello("typescript", "Hello from TypeScript").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_php() {
    assert_hello("php", "Hello from PHP").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_ruby() {
    assert_hello("ruby", "Hello from Ruby").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_perl() {
    assert_hello("perl", "Hello from Perl").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_c() {
    assert_hello("c", "Hello from C").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_cpp() {
    assert_hello("cpp", "Hello from C++").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_csharp() {
    assert_hello("csharp", "Hello from C#").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_java() {
    assert_hello("java", "Hello from Java").await;
}

#[tokio::test]
#[ignore = "requires toolchain"]
async fn test_hello_go() {
    assert_hello("go", "Hello from Go").await;
}
