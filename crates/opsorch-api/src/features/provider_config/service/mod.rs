use crate::features::audit::service::AuditService;
use crate::features::provider_resolution::service::ProviderResolutionService;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::types::{ProviderConfigRequest, ProvidersResponse, RequestContext};
use opsorch_core::{Capability, ProviderSelection};
use std::sync::Arc;

pub const CONFIGURE_ACTION: &str = "provider.configure";

/// Lists registered providers and switches a capability to another one.
pub struct ProviderConfigService {
    resolution: Arc<ProviderResolutionService>,
    audit: Arc<AuditService>,
}

impl ProviderConfigService {
    pub fn new(resolution: Arc<ProviderResolutionService>, audit: Arc<AuditService>) -> Self {
        Self { resolution, audit }
    }

    pub fn list(&self, capability: &str) -> ApiResult<ProvidersResponse> {
        let capability = parse_capability(capability)?;
        Ok(ProvidersResponse {
            providers: self.resolution.registries().names(capability),
        })
    }

    pub async fn configure(
        &self,
        capability: &str,
        body: &[u8],
        context: &RequestContext,
    ) -> ApiResult<()> {
        if !self.resolution.has_selection_store() {
            return Err(ApiError::SecretProviderMissing);
        }
        let capability = parse_capability(capability)?;

        let request: ProviderConfigRequest =
            serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if request.provider.trim().is_empty() {
            return Err(ApiError::BadRequest("provider is required".to_string()));
        }

        let selection = ProviderSelection {
            plugin: request.plugin.filter(|p| !p.trim().is_empty()),
            ..ProviderSelection::named(request.provider, request.config)
        };
        self.resolution.reconfigure(capability, selection).await?;

        self.audit.record(CONFIGURE_ACTION, context);
        Ok(())
    }
}

fn parse_capability(raw: &str) -> ApiResult<Capability> {
    Capability::parse(raw).ok_or_else(|| ApiError::NotFound("unknown capability".to_string()))
}
