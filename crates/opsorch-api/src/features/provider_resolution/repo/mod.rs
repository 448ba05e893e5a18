use async_trait::async_trait;
use opsorch_core::{Capability, ProviderSelection, Result};
use opsorch_providers::{CapabilityProvider, SecretStore};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Persisted provider selections, one per capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SelectionRepository: Send + Sync {
    /// Stored selection, `None` when nothing usable is stored.
    async fn load(&self, capability: Capability) -> Result<Option<ProviderSelection>>;

    async fn save(&self, capability: Capability, selection: &ProviderSelection) -> Result<()>;
}

/// Selections kept in a secret store under `providers/<capability>/default`.
pub struct SecretSelectionRepository {
    store: Arc<dyn SecretStore>,
}

impl SecretSelectionRepository {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SelectionRepository for SecretSelectionRepository {
    async fn load(&self, capability: Capability) -> Result<Option<ProviderSelection>> {
        let key = capability.store_key();
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(%capability, %key, error = %e, "No stored provider selection");
                return Ok(None);
            }
        };
        let selection = ProviderSelection::from_stored(&raw)?;
        Ok(Some(selection).filter(|s| !s.is_empty()))
    }

    async fn save(&self, capability: Capability, selection: &ProviderSelection) -> Result<()> {
        let raw = selection.to_stored()?;
        self.store.put(&capability.store_key(), &raw).await
    }
}

/// The provider currently answering each capability.
#[derive(Default)]
pub struct ActiveProviders {
    slots: RwLock<HashMap<Capability, Arc<dyn CapabilityProvider>>>,
}

impl ActiveProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the active provider; the lock is released before returning.
    pub fn get(&self, capability: Capability) -> Option<Arc<dyn CapabilityProvider>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&capability)
            .cloned()
    }

    pub fn set(&self, capability: Capability, provider: Arc<dyn CapabilityProvider>) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(capability, provider);
    }

    pub fn is_configured(&self, capability: Capability) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&capability)
    }

    /// Configured capabilities in dispatch order.
    pub fn configured(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.is_configured(*capability))
            .collect()
    }
}
