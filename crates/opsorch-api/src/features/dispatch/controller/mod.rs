use crate::features::dispatch::service::{DispatchRequest, DispatchService};
use crate::server::AppState;
use crate::shared::error::ApiError;
use crate::shared::types::RequestContext;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

/// Fallback handler: hands the request to the capability owning its path.
pub async fn dispatch(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let Some(capability) = DispatchService::owner(uri.path()) else {
        return ApiError::NotFound(format!("no route for {} {}", method, uri.path()))
            .into_response();
    };

    let request = DispatchRequest {
        method: &method,
        uri: &uri,
        body: &body,
        context: &context,
    };
    match state.dispatch.dispatch(capability, request).await {
        Ok((status, body)) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}
