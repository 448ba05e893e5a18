use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use opsorch_core::{
    Capability, CoreError, ErrorResponse, OrchError, CODE_BAD_REQUEST, CODE_NOT_FOUND,
    CODE_PROVIDER_ERROR,
};
use thiserror::Error;
use tracing::warn;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0} provider not configured")]
    ProviderMissing(Capability),
    #[error("secret provider not configured")]
    SecretProviderMissing,
    #[error("Secret store error: {0}")]
    SecretStore(String),
    /// Provider failure carrying a code other than `not_found`/`bad_request`.
    #[error("Upstream error: {0}")]
    Upstream(OrchError),
    /// Provider or transport failure without a code.
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ProviderMissing(_) | ApiError::SecretProviderMissing => {
                StatusCode::NOT_IMPLEMENTED
            }
            ApiError::SecretStore(_) | ApiError::Upstream(_) | ApiError::Provider(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body written for this error. `code` and `message` are never empty.
    pub fn body(&self) -> ErrorResponse {
        let (code, message) = match self {
            ApiError::BadRequest(msg) => (CODE_BAD_REQUEST.to_string(), msg.clone()),
            ApiError::NotFound(msg) => (CODE_NOT_FOUND.to_string(), msg.clone()),
            ApiError::ProviderMissing(capability) => {
                (capability.missing_code(), self.to_string())
            }
            ApiError::SecretProviderMissing => {
                ("secret_provider_missing".to_string(), self.to_string())
            }
            ApiError::SecretStore(msg) => ("secret_store_error".to_string(), msg.clone()),
            ApiError::Upstream(err) => (err.code.clone(), err.message.clone()),
            ApiError::Provider(msg) => (CODE_PROVIDER_ERROR.to_string(), msg.clone()),
            ApiError::Internal(msg) => ("internal_error".to_string(), msg.clone()),
        };

        let code = if code.trim().is_empty() {
            CODE_PROVIDER_ERROR.to_string()
        } else {
            code
        };
        let message = if message.trim().is_empty() {
            self.status()
                .canonical_reason()
                .unwrap_or("request failed")
                .to_ascii_lowercase()
        } else {
            message
        };
        ErrorResponse::new(code, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Invocation(orch) => match orch.code.as_str() {
                CODE_NOT_FOUND => ApiError::NotFound(orch.message),
                CODE_BAD_REQUEST => ApiError::BadRequest(orch.message),
                "" => ApiError::Provider(orch.message),
                _ => ApiError::Upstream(orch),
            },
            CoreError::Untyped(message) => ApiError::Provider(message),
            err @ CoreError::PluginTransport(_) => ApiError::Provider(err.to_string()),
            CoreError::NotConfigured(capability) => ApiError::ProviderMissing(capability),
            CoreError::UnknownCapability(name) => {
                ApiError::NotFound(format!("unknown capability {}", name))
            }
            CoreError::SecretStore(message) => ApiError::SecretStore(message),
            err @ (CoreError::DuplicateProvider(_)
            | CoreError::InvalidName(_)
            | CoreError::ProviderNotRegistered(_)
            | CoreError::ConfigurationDecode(_)
            | CoreError::ProviderConstruction(_)) => ApiError::BadRequest(err.message()),
            CoreError::Internal(message) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        warn!(status = status.as_u16(), code = %body.code, message = %body.message, "API error");
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
