use crate::features::provider_resolution::repo::{SecretSelectionRepository, SelectionRepository};
use crate::features::provider_resolution::service::{ProviderResolutionService, ResolutionSummary};
use opsorch_core::{Capability, ConfigSource};
use opsorch_providers::secret::resolve_secret_store;
use opsorch_providers::ProviderRegistries;
use std::sync::Arc;
use tracing::{error, info};

/// Startup entry point of provider resolution.
pub struct ProviderResolutionController {
    service: Arc<ProviderResolutionService>,
}

impl ProviderResolutionController {
    pub fn new(service: Arc<ProviderResolutionService>) -> Self {
        Self { service }
    }

    /// Selection store from the `OPSORCH_SECRET_*` signals.
    ///
    /// A store that cannot be built leaves the server without persisted
    /// selections; capabilities configured through the environment still start.
    pub fn selection_repository(
        source: &dyn ConfigSource,
        registries: &ProviderRegistries,
    ) -> Option<Arc<dyn SelectionRepository>> {
        match resolve_secret_store(source, registries) {
            Ok(Some(store)) => Some(Arc::new(SecretSelectionRepository::new(store))),
            Ok(None) => {
                info!("No secret provider configured; provider selections are not persisted");
                None
            }
            Err(e) => {
                error!(
                    error = %e,
                    "Secret provider unavailable; provider selections are not persisted"
                );
                None
            }
        }
    }

    pub async fn resolve_all(&self, source: &dyn ConfigSource) -> ResolutionSummary {
        let summary = self.service.resolve_all(source).await;
        info!(
            configured = ?names(&summary.configured),
            failed = summary.failed.len(),
            "Resolved capability providers"
        );
        summary
    }
}

fn names(capabilities: &[Capability]) -> Vec<&'static str> {
    capabilities.iter().map(Capability::as_str).collect()
}
