//! Request and response bodies of the HTTP API

use polyrun::config::Language;
use polyrun::types::{ExecutionRequest, ExecutionResult, ExecutionStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /execute`
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Missing code is treated as empty so the language is still validated.
    #[serde(default)]
    pub code: String,

    pub language: String,

    #[serde(default)]
    pub timeout: Option<f64>,
}

impl From<ExecuteRequest> for ExecutionRequest {
    fn from(request: ExecuteRequest) -> Self {
        let mut execution = ExecutionRequest::new(request.language, request.code);
        execution.timeout = request.timeout;
        execution
    }
}

/// Response of `POST /execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub execution_id: Uuid,
    pub language: String,
    pub status: ExecutionStatus,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub execution_time: f64,
    pub timeout_occurred: bool,
    pub compiled: bool,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            execution_id: result.execution_id(),
            language: result.language().to_owned(),
            status: result.status(),
            success: result.is_success(),
            stdout: result.stdout().to_owned(),
            stderr: result.stderr().to_owned(),
            exit_code: result.exit_code(),
            execution_time: result.execution_time(),
            timeout_occurred: result.timeout_occurred(),
            compiled: result.compiled(),
            stdout_truncated: result.stdout_truncated(),
            stderr_truncated: result.stderr_truncated(),
        }
    }
}

/// One entry of `GET /languages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub language: String,
    pub name: String,
    pub extension: String,
    pub timeout: f64,
    pub memory_limit_mb: u64,
    pub requires_compilation: bool,
}

impl From<&Language> for LanguageInfo {
    fn from(language: &Language) -> Self {
        Self {
            language: language.id.clone(),
            name: language.name.clone(),
            extension: language.extension.to_string(),
            timeout: language.timeout,
            memory_limit_mb: language.memory_limit_mb,
            requires_compilation: language.requires_compilation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateLanguagesResponse {
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateTypesResponse {
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub language: String,
    pub template_type: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub languages: usize,
    pub available_slots: usize,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}
