//! HTTP API for the polyrun execution engine.
//!
//! - `POST /execute` runs a snippet and returns its [`ExecuteResponse`]
//! - `GET /languages` lists the registry
//! - `GET /templates/...` serves starter snippets
//! - `GET /health` reports liveness and free execution slots

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

pub use crate::error::{ServerError, ServerResult};
pub use crate::payload::{
    ErrorResponse, ExecuteRequest, ExecuteResponse, HealthResponse, LanguageInfo,
    LanguagesResponse, TemplateLanguagesResponse, TemplateResponse, TemplateTypesResponse,
};
pub use crate::route::create_router;
pub use crate::state::AppState;

pub mod error;
pub mod handler;
pub mod payload;
pub mod route;
pub mod state;

/// Bind `addr` and serve the API until `shutdown` resolves
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
