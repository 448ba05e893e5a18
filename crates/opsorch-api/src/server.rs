use crate::features::audit::repo::AuditSink;
use crate::features::audit::service::AuditService;
use crate::features::dispatch::controller::dispatch;
use crate::features::dispatch::service::DispatchService;
use crate::features::observability::controller::{
    endpoint_label, render_metrics, ObservabilityController,
};
use crate::features::provider_config::controller::{configure_provider, list_providers};
use crate::features::provider_config::service::ProviderConfigService;
use crate::features::provider_resolution::repo::{ActiveProviders, SelectionRepository};
use crate::features::provider_resolution::service::ProviderResolutionService;
use crate::shared::types::{status_ok, RequestContext, REQUEST_ID_HEADER};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use opsorch_core::{ConfigSource, CoreError, Result};
use opsorch_providers::ProviderRegistries;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Listener and CORS settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_origin: "*".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads `OPSORCH_ADDR` (a bare `:port` binds every interface) and
    /// `OPSORCH_CORS_ORIGIN`.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let raw = source
            .var("OPSORCH_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let normalized = if raw.starts_with(':') {
            format!("0.0.0.0{}", raw)
        } else {
            raw
        };
        let addr = normalized.parse::<SocketAddr>().map_err(|e| {
            CoreError::ConfigurationDecode(format!("invalid OPSORCH_ADDR {}: {}", normalized, e))
        })?;

        Ok(Self {
            addr,
            cors_origin: source
                .var("OPSORCH_CORS_ORIGIN")
                .unwrap_or_else(|| "*".to_string()),
        })
    }
}

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub resolution: Arc<ProviderResolutionService>,
    pub dispatch: Arc<DispatchService>,
    pub provider_config: Arc<ProviderConfigService>,
    pub observability: Arc<ObservabilityController>,
}

impl AppState {
    pub fn new(
        registries: Arc<ProviderRegistries>,
        selections: Option<Arc<dyn SelectionRepository>>,
        audit_sink: Arc<dyn AuditSink>,
        observability: Arc<ObservabilityController>,
    ) -> Self {
        let active = Arc::new(ActiveProviders::new());
        let audit = Arc::new(AuditService::new(audit_sink));
        let resolution = Arc::new(ProviderResolutionService::new(
            registries,
            selections,
            active.clone(),
            observability.clone(),
        ));
        let dispatch = Arc::new(DispatchService::new(
            active,
            audit.clone(),
            observability.clone(),
        ));
        let provider_config = Arc::new(ProviderConfigService::new(resolution.clone(), audit));

        Self {
            resolution,
            dispatch,
            provider_config,
            observability,
        }
    }
}

/// All routes: health, metrics, provider configuration, then capability
/// dispatch as the fallback.
pub fn app_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/observability/metrics", get(render_metrics))
        .route(
            "/providers/:capability",
            get(list_providers).post(configure_provider),
        )
        .fallback(dispatch)
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origin))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(status_ok())
}

/// Attach the request context and echo the request id on the response.
async fn request_context(mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_headers(request.headers());
    let request_id = HeaderValue::from_str(&context.request_id).ok();
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Some(value) = request_id {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let endpoint = endpoint_label(request.uri().path());
    let started = Instant::now();
    let response = next.run(request).await;
    state
        .observability
        .record_api_request(&endpoint, response.status().as_u16(), started.elapsed());
    response
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            warn!(%origin, error = %e, "Invalid CORS origin; allowing any origin");
            layer.allow_origin(Any)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::audit::repo::InMemoryAuditSink;
    use crate::features::provider_resolution::repo::SecretSelectionRepository;
    use crate::test_support::{echo_constructor, fresh_observability, MockProvider};
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use opsorch_core::{Capability, MapConfigSource, ProviderConfig};
    use opsorch_providers::secret::MemoryStore;
    use opsorch_providers::CapabilityProvider;
    use serde_json::json;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: AppState,
        audit: InMemoryAuditSink,
    }

    async fn test_app(
        registries: ProviderRegistries,
        selections: Option<Arc<dyn SelectionRepository>>,
        source: &MapConfigSource,
    ) -> TestApp {
        let audit = InMemoryAuditSink::new();
        let state = AppState::new(
            Arc::new(registries),
            selections,
            Arc::new(audit.clone()),
            fresh_observability(),
        );
        state.resolution.resolve_all(source).await;
        TestApp {
            router: app_router(state.clone(), &ServerConfig::default()),
            state,
            audit,
        }
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, headers, value)
    }

    #[test]
    fn test_server_config_defaults_and_bare_port() {
        let config = ServerConfig::from_source(&MapConfigSource::new()).unwrap();
        assert_eq!(config, ServerConfig::default());

        let source = MapConfigSource::new()
            .with("OPSORCH_ADDR", ":9090")
            .with("OPSORCH_CORS_ORIGIN", "https://ops.example.com");
        let config = ServerConfig::from_source(&source).unwrap();
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 9090)));
        assert_eq!(config.cors_origin, "https://ops.example.com");

        let bad = MapConfigSource::new().with("OPSORCH_ADDR", "not-an-address");
        assert!(matches!(
            ServerConfig::from_source(&bad),
            Err(CoreError::ConfigurationDecode(_))
        ));
    }

    #[tokio::test]
    async fn test_health_routes_and_request_id_echo() {
        let app = test_app(ProviderRegistries::new(), None, &MapConfigSource::new()).await;

        for path in ["/", "/health"] {
            let (status, headers, body) = send(&app.router, "GET", path, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"status": "ok"}));
            assert!(headers.contains_key(REQUEST_ID_HEADER));
        }

        let request = HttpRequest::builder()
            .uri("/health")
            .header("X-Correlation-ID", "corr-1")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "corr-1");
    }

    #[tokio::test]
    async fn test_mock_provider_scenario() {
        let registries = ProviderRegistries::new();
        registries
            .register(Capability::Incident, "mock", |config: ProviderConfig| {
                assert_eq!(config.get_str("token"), Some("t"));
                let mut mock = MockProvider::new();
                mock.expect_invoke()
                    .withf(|operation, payload| operation == "query" && *payload == json!({}))
                    .times(1)
                    .returning(|_, _| Ok(Some(json!([{"id": "p1", "title": "db down"}]))));
                Ok(Arc::new(mock) as Arc<dyn CapabilityProvider>)
            })
            .unwrap();
        let source = MapConfigSource::new()
            .with("OPSORCH_INCIDENT_PROVIDER", "mock")
            .with("OPSORCH_INCIDENT_CONFIG", r#"{"token":"t"}"#);
        let app = test_app(registries, None, &source).await;

        let (status, _, body) = send(&app.router, "POST", "/incidents/query", Some("{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": "p1", "title": "db down"}]));
        assert_eq!(app.audit.actions(), vec!["incident.query"]);
    }

    #[tokio::test]
    async fn test_unconfigured_capability_is_501() {
        let app = test_app(ProviderRegistries::new(), None, &MapConfigSource::new()).await;

        let (status, _, body) = send(&app.router, "POST", "/logs/query", Some("{}")).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            body,
            json!({"code": "log_provider_missing", "message": "log provider not configured"})
        );
    }

    #[tokio::test]
    async fn test_unknown_field_is_400_and_unknown_path_is_404() {
        let registries = ProviderRegistries::new();
        registries
            .register(Capability::Ticket, "echo", echo_constructor())
            .unwrap();
        let source = MapConfigSource::new().with("OPSORCH_TICKET_PROVIDER", "echo");
        let app = test_app(registries, None, &source).await;

        let (status, _, body) =
            send(&app.router, "POST", "/tickets/query", Some(r#"{"unknown":1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
        assert!(!body["message"].as_str().unwrap().is_empty());

        let (status, _, body) = send(&app.router, "GET", "/widgets", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");

        let (status, _, body) = send(&app.router, "GET", "/tickets/T-9", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["operation"], "get");
        assert_eq!(body["payload"], json!({"id": "T-9"}));
    }

    #[tokio::test]
    async fn test_timeline_append_acknowledges_with_201() {
        let registries = ProviderRegistries::new();
        registries
            .register(Capability::Incident, "echo", echo_constructor())
            .unwrap();
        let source = MapConfigSource::new().with("OPSORCH_INCIDENT_PROVIDER", "echo");
        let app = test_app(registries, None, &source).await;

        let (status, _, body) = send(
            &app.router,
            "POST",
            "/incidents/p1/timeline",
            Some(r#"{"kind":"note","body":"hi"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"status": "ok"}));
        assert_eq!(app.audit.actions(), vec!["incident.timeline.append"]);
    }

    #[tokio::test]
    async fn test_provider_listing() {
        let registries = ProviderRegistries::new();
        registries
            .register(Capability::Alert, "prometheus", echo_constructor())
            .unwrap();
        registries
            .register(Capability::Alert, "datadog", echo_constructor())
            .unwrap();
        let app = test_app(registries, None, &MapConfigSource::new()).await;

        let (status, _, body) = send(&app.router, "GET", "/providers/alerts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"providers": ["datadog", "prometheus"]}));

        let (status, _, body) = send(&app.router, "GET", "/providers/widgets", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_reconfiguration_without_store_is_501() {
        let app = test_app(ProviderRegistries::new(), None, &MapConfigSource::new()).await;
        let (status, _, body) = send(
            &app.router,
            "POST",
            "/providers/incident",
            Some(r#"{"provider":"mock"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["code"], "secret_provider_missing");
    }

    #[tokio::test]
    async fn test_reconfiguration_enables_capability() {
        let registries = ProviderRegistries::new();
        registries
            .register(Capability::Service, "echo", echo_constructor())
            .unwrap();
        let store = MemoryStore::new();
        let selections: Arc<dyn SelectionRepository> =
            Arc::new(SecretSelectionRepository::new(Arc::new(store.clone())));
        let app = test_app(registries, Some(selections), &MapConfigSource::new()).await;

        let (status, _, _) = send(&app.router, "GET", "/services", None).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

        let (status, _, body) = send(
            &app.router,
            "POST",
            "/providers/service",
            Some(r#"{"provider":"echo","config":{"region":"eu"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
        let keys = store.keys("providers/").unwrap();
        assert!(keys.contains(&"providers/service/default".to_string()));

        let (status, _, body) = send(&app.router, "GET", "/services", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"], json!({}));
        assert_eq!(body["config"], json!({"region": "eu"}));
        assert_eq!(app.audit.actions(), vec!["provider.configure", "service.query"]);
    }

    #[tokio::test]
    async fn test_stored_selection_is_used_at_startup() {
        let registries = ProviderRegistries::new();
        registries
            .register(Capability::Deployment, "echo", echo_constructor())
            .unwrap();
        let store = MemoryStore::new()
            .with_entry("providers/deployment/default", r#"{"provider":"echo","config":{}}"#);
        let selections: Arc<dyn SelectionRepository> =
            Arc::new(SecretSelectionRepository::new(Arc::new(store)));
        let app = test_app(registries, Some(selections), &MapConfigSource::new()).await;

        assert!(app
            .state
            .resolution
            .active()
            .is_configured(Capability::Deployment));
        let (status, _, body) = send(&app.router, "GET", "/deployments/d1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"], json!({"id": "d1"}));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = test_app(ProviderRegistries::new(), None, &MapConfigSource::new()).await;
        send(&app.router, "GET", "/health", None).await;

        let (status, _, body) = send(&app.router, "GET", "/observability/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        let text = body.as_str().unwrap();
        assert!(text.contains("opsorch_api_request_total"));
        assert!(text.contains("opsorch_capability_configured"));
    }
}
