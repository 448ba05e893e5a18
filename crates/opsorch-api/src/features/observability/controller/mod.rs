use crate::features::observability::repo::ObservabilityRepository;
use crate::features::observability::service::ObservabilityService;
use crate::server::AppState;
use crate::shared::error::ApiError;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use opsorch_core::Capability;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub struct ObservabilityController {
    service: ObservabilityService,
}

impl ObservabilityController {
    pub fn new(service: ObservabilityService) -> Self {
        Self { service }
    }

    pub fn record_api_request(&self, endpoint: &str, status: u16, elapsed: Duration) {
        self.service.record_api_request(endpoint, status, elapsed);
    }

    pub fn record_provider_invocation(&self, capability: Capability, elapsed: Duration) {
        self.service.record_provider_invocation(capability, elapsed);
    }

    pub fn set_capability_configured(&self, capability: Capability, configured: bool) {
        self.service.set_capability_configured(capability, configured);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.service.render_metrics()
    }
}

static GLOBAL_OBSERVABILITY: OnceLock<Arc<ObservabilityController>> = OnceLock::new();

pub fn global_observability_controller() -> Arc<ObservabilityController> {
    GLOBAL_OBSERVABILITY
        .get_or_init(|| {
            let repo = Arc::new(ObservabilityRepository::new().expect("metrics init"));
            Arc::new(ObservabilityController::new(ObservabilityService::new(
                repo,
            )))
        })
        .clone()
}

/// `GET /observability/metrics` in the prometheus text format.
pub async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .observability
        .render_metrics()
        .map_err(ApiError::Internal)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

/// Low-cardinality endpoint label: the first path segment.
pub fn endpoint_label(path: &str) -> String {
    match path.trim_start_matches('/').split('/').next() {
        Some(segment) if !segment.is_empty() => format!("/{}", segment),
        _ => "/".to_string(),
    }
}
