use crate::server::AppState;
use crate::shared::error::ApiError;
use crate::shared::types::{status_ok, ProvidersResponse, RequestContext};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::Value;
use tracing::info;

/// `GET /providers/{capability}`
pub async fn list_providers(
    State(state): State<AppState>,
    Path(capability): Path<String>,
) -> Result<Json<ProvidersResponse>, ApiError> {
    state.provider_config.list(&capability).map(Json)
}

/// `POST /providers/{capability}`
pub async fn configure_provider(
    State(state): State<AppState>,
    Path(capability): Path<String>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    info!(%capability, request_id = %context.request_id, "Received provider configuration request");
    state
        .provider_config
        .configure(&capability, &body, &context)
        .await?;
    Ok(Json(status_ok()))
}
