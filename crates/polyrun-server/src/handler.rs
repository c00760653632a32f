//! Request handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use polyrun::types::ExecutionRequest;
use tracing::{debug, instrument};

use crate::error::{ServerError, ServerResult};
use crate::payload::{
    ExecuteRequest, ExecuteResponse, HealthResponse, LanguageInfo, LanguagesResponse,
    TemplateLanguagesResponse, TemplateResponse, TemplateTypesResponse,
};
use crate::state::AppState;

/// `POST /execute`
///
/// Anything the submitted code does is reported in a 200 body.
#[instrument(skip_all)]
pub async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ServerResult<Json<ExecuteResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::BodyTooLarge(state.body_limit())
        } else {
            ServerError::InvalidBody(rejection.body_text())
        }
    })?;

    let request = ExecutionRequest::from(request);
    debug!(language = %request.language, bytes = request.code.len(), "execute request");

    let result = state.runner().execute(&request).await?;
    Ok(Json(ExecuteResponse::from(result)))
}

/// `GET /languages`
pub async fn languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    let languages = state
        .runner()
        .registry()
        .list()
        .iter()
        .map(LanguageInfo::from)
        .collect();
    Json(LanguagesResponse { languages })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let runner = state.runner();
    Json(HealthResponse {
        status: "ok".to_string(),
        languages: runner.registry().len(),
        available_slots: runner.workspaces().available(),
    })
}

/// `GET /templates/languages`
pub async fn template_languages(State(state): State<AppState>) -> Json<TemplateLanguagesResponse> {
    let languages = state
        .templates()
        .list_languages()
        .into_iter()
        .map(str::to_owned)
        .collect();
    Json(TemplateLanguagesResponse { languages })
}

/// `GET /templates/types`
pub async fn template_types(State(state): State<AppState>) -> Json<TemplateTypesResponse> {
    let types = state
        .templates()
        .list_types()
        .into_iter()
        .map(str::to_owned)
        .collect();
    Json(TemplateTypesResponse { types })
}

/// `GET /templates/template/{language}/{template_type}`
pub async fn template(
    State(state): State<AppState>,
    Path((language, template_type)): Path<(String, String)>,
) -> ServerResult<Json<TemplateResponse>> {
    let code = state.templates().get(&language, &template_type)?.to_owned();
    Ok(Json(TemplateResponse {
        language,
        template_type,
        code,
    }))
}
