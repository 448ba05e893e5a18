use opsorch_api::features::audit::repo::TracingAuditSink;
use opsorch_api::features::observability::controller::global_observability_controller;
use opsorch_api::features::provider_resolution::controller::ProviderResolutionController;
use opsorch_api::{app_router, AppState, ServerConfig};
use opsorch_core::EnvConfigSource;
use opsorch_providers::ProviderRegistries;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("opsorch_api=info,info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let source = EnvConfigSource;
    let config = ServerConfig::from_source(&source)?;

    // In-process providers register here before resolution runs.
    let registries = Arc::new(ProviderRegistries::with_builtin_secret_stores()?);

    let selections = ProviderResolutionController::selection_repository(&source, &registries);

    let state = AppState::new(
        registries,
        selections,
        Arc::new(TracingAuditSink),
        global_observability_controller(),
    );
    ProviderResolutionController::new(state.resolution.clone())
        .resolve_all(&source)
        .await;

    let app = app_router(state, &config);

    info!(addr = %config.addr, "Starting OpsOrch API");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
