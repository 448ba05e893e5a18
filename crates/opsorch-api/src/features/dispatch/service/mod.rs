use crate::features::audit::service::AuditService;
use crate::features::dispatch::operations::{match_route, Reply, RequestParts};
use crate::features::observability::controller::ObservabilityController;
use crate::features::provider_resolution::repo::ActiveProviders;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::types::{status_ok, RequestContext};
use axum::http::{Method, StatusCode, Uri};
use chrono::Utc;
use opsorch_core::Capability;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// One HTTP request addressed to a capability.
pub struct DispatchRequest<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub body: &'a [u8],
    pub context: &'a RequestContext,
}

/// Forwards matched requests to the active provider of their capability.
pub struct DispatchService {
    active: Arc<ActiveProviders>,
    audit: Arc<AuditService>,
    observability: Arc<ObservabilityController>,
}

impl DispatchService {
    pub fn new(
        active: Arc<ActiveProviders>,
        audit: Arc<AuditService>,
        observability: Arc<ObservabilityController>,
    ) -> Self {
        Self {
            active,
            audit,
            observability,
        }
    }

    /// Capability whose prefix owns `path`, in dispatch order.
    pub fn owner(path: &str) -> Option<Capability> {
        Capability::ALL
            .into_iter()
            .find(|capability| capability.owns_path(path))
    }

    /// Run one request through route, provider, payload, call and reply.
    ///
    /// The provider is called at most once; nothing is retried.
    pub async fn dispatch(
        &self,
        capability: Capability,
        request: DispatchRequest<'_>,
    ) -> ApiResult<(StatusCode, Value)> {
        let provider = self
            .active
            .get(capability)
            .ok_or(ApiError::ProviderMissing(capability))?;

        let path = request.uri.path();
        let route = match_route(capability, request.method, path).ok_or_else(|| {
            ApiError::NotFound(format!("no route for {} {}", request.method, path))
        })?;
        let operation = route.operation;

        let payload = operation.payload.build(
            &route,
            &RequestParts {
                method: request.method,
                uri: request.uri,
                body: request.body,
                now: Utc::now(),
            },
        )?;

        let action = capability.qualify(operation.name);
        debug!(%action, request_id = %request.context.request_id, "Dispatching to provider");

        let started = Instant::now();
        let outcome = provider.invoke(operation.name, payload).await;
        self.observability
            .record_provider_invocation(capability, started.elapsed());

        let result = outcome.map_err(|e| {
            warn!(
                %action,
                request_id = %request.context.request_id,
                error = %e,
                "Provider call failed"
            );
            ApiError::from(e)
        })?;

        self.audit.record(&action, request.context);

        let body = match operation.reply {
            Reply::Result => result.unwrap_or(Value::Null),
            Reply::Ack => status_ok(),
            Reply::Wrapped(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.to_string(), result.unwrap_or(Value::Null));
                Value::Object(wrapped)
            }
        };
        Ok((operation.status, body))
    }
}
