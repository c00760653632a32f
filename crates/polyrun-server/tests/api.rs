//! HTTP contract tests, driving the router without a socket

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use polyrun::config::Config;
use polyrun::runner::Runner;
use polyrun::templates::TemplateLibrary;
use polyrun_server::{
    AppState, ErrorResponse, ExecuteResponse, HealthResponse, LanguagesResponse,
    TemplateLanguagesResponse, TemplateResponse, TemplateTypesResponse, create_router,
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

const SHELL_CONFIG: &str = r#"
max_concurrent_executions = 2
max_timeout = 5.0
max_code_bytes = 256
kill_grace = 0.2

[[languages]]
id = "shell"
name = "Shell"
extension = "sh"
timeout = 5.0

[languages.run]
command = ["sh", "{source}"]

[[languages]]
id = "ghost"
name = "Missing toolchain"
extension = "gh"

[languages.compile]
command = ["polyrun-missing-compiler", "{source}", "{output}"]
output_name = "prog"

[languages.run]
command = ["{binary}"]
"#;

fn app_with(config: Config) -> Router {
    let runner = Runner::new(config).unwrap();
    create_router(AppState::new(runner, TemplateLibrary::default()))
}

fn default_app(root: &std::path::Path) -> Router {
    let mut config = Config::default();
    config.workspace_root = root.to_path_buf();
    app_with(config)
}

fn shell_app(root: &std::path::Path) -> Router {
    let mut config = Config::parse_toml(SHELL_CONFIG).unwrap();
    config.workspace_root = root.to_path_buf();
    app_with(config)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send<T: DeserializeOwned>(app: Router, request: Request<Body>) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("bad body ({e}): {}", String::from_utf8_lossy(&bytes)));
    (status, body)
}

#[tokio::test]
async fn languages_lists_twelve_in_order() {
    let root = tempfile::tempdir().unwrap();
    let (status, body): (_, LanguagesResponse) =
        send(default_app(root.path()), get("/languages")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.languages.len(), 12);
    assert_eq!(body.languages[0].language, "python");
    assert_eq!(body.languages[0].extension, "py");
    let compiled: Vec<_> = body
        .languages
        .iter()
        .filter(|l| l.requires_compilation)
        .map(|l| l.language.as_str())
        .collect();
    assert_eq!(compiled, ["c", "cpp", "csharp", "java", "go"]);
    assert!(body.languages.iter().all(|l| l.timeout > 0.0 && l.memory_limit_mb > 0));
}

#[tokio::test]
async fn unsupported_language_is_400() {
    let root = tempfile::tempdir().unwrap();
    let request = post_json("/execute", serde_json::json!({ "language": "cobol" }));
    let (status, body): (_, ErrorResponse) = send(default_app(root.path()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.kind, "unsupported_language");
    assert!(body.error.contains("cobol"));
}

#[tokio::test]
async fn oversized_code_is_400() {
    let root = tempfile::tempdir().unwrap();
    let request = post_json(
        "/execute",
        serde_json::json!({ "language": "shell", "code": "#".repeat(1000) }),
    );
    let (status, body): (_, ErrorResponse) = send(shell_app(root.path()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.kind, "payload_too_large");
}

#[tokio::test]
async fn oversized_body_is_400() {
    let root = tempfile::tempdir().unwrap();
    let request = post_json(
        "/execute",
        serde_json::json!({ "language": "shell", "code": "#".repeat(64 * 1024) }),
    );
    let (status, body): (_, ErrorResponse) = send(shell_app(root.path()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.kind, "payload_too_large");
}

#[tokio::test]
async fn malformed_body_is_400() {
    let root = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/execute")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body): (_, ErrorResponse) = send(shell_app(root.path()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.kind, "invalid_request");
}

#[cfg(unix)]
#[tokio::test]
async fn execute_success_returns_result() {
    let root = tempfile::tempdir().unwrap();
    let request = post_json(
        "/execute",
        serde_json::json!({ "language": "shell", "code": "echo 'Hello from Shell'" }),
    );
    let (status, body): (_, ExecuteResponse) = send(shell_app(root.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(body.stdout, "Hello from Shell\n");
    assert_eq!(body.exit_code, 0);
    assert!(!body.timeout_occurred);
    assert_eq!(body.language, "shell");
}

#[cfg(unix)]
#[tokio::test]
async fn runtime_failure_is_still_200() {
    let root = tempfile::tempdir().unwrap();
    let request = post_json(
        "/execute",
        serde_json::json!({ "language": "shell", "code": "exit 4" }),
    );
    let (status, body): (_, ExecuteResponse) = send(shell_app(root.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.success);
    assert_eq!(body.exit_code, 4);
}

#[cfg(unix)]
#[tokio::test]
async fn timeout_is_200_with_flag() {
    let root = tempfile::tempdir().unwrap();
    let request = post_json(
        "/execute",
        serde_json::json!({ "language": "shell", "code": "sleep 30", "timeout": 0.5 }),
    );
    let (status, body): (_, ExecuteResponse) = send(shell_app(root.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.timeout_occurred);
    assert!(!body.success);
}

#[tokio::test]
async fn infrastructure_error_is_generic_500() {
    let root = tempfile::tempdir().unwrap();
    let request = post_json(
        "/execute",
        serde_json::json!({ "language": "ghost", "code": "x" }),
    );
    let (status, body): (_, ErrorResponse) = send(shell_app(root.path()), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.kind, "infrastructure");
    assert!(!body.error.contains("polyrun-missing-compiler"));
    assert!(!body.error.contains(&*root.path().to_string_lossy()));
}

#[tokio::test]
async fn template_endpoints() {
    let root = tempfile::tempdir().unwrap();
    let app = default_app(root.path());

    let (status, languages): (_, TemplateLanguagesResponse) =
        send(app.clone(), get("/templates/languages")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(languages.languages.len(), 12);

    let (_, types): (_, TemplateTypesResponse) = send(app.clone(), get("/templates/types")).await;
    assert!(types.types.iter().any(|t| t == "hello_world"));

    let (status, template): (_, TemplateResponse) =
        send(app.clone(), get("/templates/template/go/hello_world")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(template.code.contains("Hello from Go"));

    let (status, err): (_, ErrorResponse) =
        send(app, get("/templates/template/cobol/hello_world")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err.kind, "template_not_found");
}

#[tokio::test]
async fn health_reports_slots() {
    let root = tempfile::tempdir().unwrap();
    let (status, body): (_, HealthResponse) = send(shell_app(root.path()), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "ok");
    assert_eq!(body.languages, 2);
    assert_eq!(body.available_slots, 2);
}
