use crate::features::observability::controller::ObservabilityController;
use crate::features::provider_resolution::repo::{ActiveProviders, SelectionRepository};
use opsorch_core::{Capability, ConfigSource, CoreError, ProviderSelection, Result};
use opsorch_providers::{CapabilityProvider, PluginProvider, ProviderRegistries};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of resolving every capability at startup.
#[derive(Debug, Default)]
pub struct ResolutionSummary {
    pub configured: Vec<Capability>,
    pub unconfigured: Vec<Capability>,
    pub failed: Vec<(Capability, CoreError)>,
}

/// Decides which provider answers each capability and keeps the active slots.
pub struct ProviderResolutionService {
    registries: Arc<ProviderRegistries>,
    selections: Option<Arc<dyn SelectionRepository>>,
    active: Arc<ActiveProviders>,
    observability: Arc<ObservabilityController>,
}

impl ProviderResolutionService {
    pub fn new(
        registries: Arc<ProviderRegistries>,
        selections: Option<Arc<dyn SelectionRepository>>,
        active: Arc<ActiveProviders>,
        observability: Arc<ObservabilityController>,
    ) -> Self {
        Self {
            registries,
            selections,
            active,
            observability,
        }
    }

    pub fn registries(&self) -> &ProviderRegistries {
        &self.registries
    }

    pub fn active(&self) -> &Arc<ActiveProviders> {
        &self.active
    }

    pub fn has_selection_store(&self) -> bool {
        self.selections.is_some()
    }

    /// Selection for `capability`: environment first, then the store.
    ///
    /// The store is not consulted when the environment names a provider or a
    /// plugin, and a malformed environment config fails without falling through.
    pub async fn selection_for(
        &self,
        source: &dyn ConfigSource,
        capability: Capability,
    ) -> Result<Option<ProviderSelection>> {
        if let Some(selection) = source.selection(&capability.env_prefix())? {
            return Ok(Some(selection));
        }
        match &self.selections {
            Some(repo) => repo.load(capability).await,
            None => Ok(None),
        }
    }

    /// Build the provider a selection points at.
    pub fn build(
        &self,
        capability: Capability,
        selection: &ProviderSelection,
    ) -> Result<Arc<dyn CapabilityProvider>> {
        if let Some(path) = selection.plugin_path() {
            debug!(%capability, %path, "Using plugin provider");
            return Ok(Arc::new(PluginProvider::new(
                capability,
                path,
                selection.config.clone(),
            )));
        }

        let name = selection.provider.trim().to_lowercase();
        let constructor = self.registries.lookup(capability, &name).ok_or_else(|| {
            CoreError::ProviderNotRegistered(format!(
                "{} provider {} not registered",
                capability, name
            ))
        })?;
        constructor(selection.config.clone())
    }

    /// Resolve one capability without touching the active slot.
    pub async fn resolve(
        &self,
        source: &dyn ConfigSource,
        capability: Capability,
    ) -> Result<Option<Arc<dyn CapabilityProvider>>> {
        match self.selection_for(source, capability).await? {
            Some(selection) if !selection.is_empty() => {
                self.build(capability, &selection).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Resolve every capability independently; a failure leaves only that
    /// capability unconfigured.
    pub async fn resolve_all(&self, source: &dyn ConfigSource) -> ResolutionSummary {
        let mut summary = ResolutionSummary::default();
        for capability in Capability::ALL {
            match self.resolve(source, capability).await {
                Ok(Some(provider)) => {
                    self.active.set(capability, provider);
                    info!(%capability, "Provider configured");
                    summary.configured.push(capability);
                }
                Ok(None) => {
                    debug!(%capability, "No provider configured");
                    summary.unconfigured.push(capability);
                }
                Err(e) => {
                    warn!(
                        %capability,
                        error = %e,
                        "Provider resolution failed; capability disabled"
                    );
                    summary.failed.push((capability, e));
                }
            }
            self.observability
                .set_capability_configured(capability, self.active.is_configured(capability));
        }
        summary
    }

    /// Replace the provider of `capability` and persist the selection.
    ///
    /// The new provider is built first and the selection saved second; the
    /// slot only changes once both succeeded.
    pub async fn reconfigure(
        &self,
        capability: Capability,
        selection: ProviderSelection,
    ) -> Result<()> {
        let repo = self
            .selections
            .as_ref()
            .ok_or_else(|| CoreError::SecretStore("secret provider not configured".to_string()))?;

        let provider = self.build(capability, &selection)?;
        repo.save(capability, &selection).await?;
        self.active.set(capability, provider);
        self.observability.set_capability_configured(capability, true);

        info!(
            %capability,
            provider = %selection.provider,
            plugin = ?selection.plugin_path(),
            "Provider reconfigured"
        );
        Ok(())
    }
}
