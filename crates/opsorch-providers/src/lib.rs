pub mod plugin;
pub mod secret;

use async_trait::async_trait;
use opsorch_core::{Capability, CoreError, ProviderConfig, Registry, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use plugin::{PluginProvider, PluginRunner};
pub use secret::{SecretConstructor, SecretStore};

/// Backend answering one capability's operations.
///
/// In-process implementations and plugin handles look identical to the
/// dispatcher: `operation` is the capability-local name (`query`,
/// `timeline.append`, ...) and `None` means the operation has no result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn invoke(&self, operation: &str, payload: Value) -> Result<Option<Value>>;
}

pub type ProviderConstructor =
    Arc<dyn Fn(ProviderConfig) -> Result<Arc<dyn CapabilityProvider>> + Send + Sync>;

pub type ProviderRegistry = Registry<ProviderConstructor>;

/// One constructor registry per capability plus the secret store registry.
///
/// Owned by the composition root and passed by reference to resolution.
pub struct ProviderRegistries {
    capabilities: HashMap<Capability, ProviderRegistry>,
    secrets: Registry<SecretConstructor>,
}

impl Default for ProviderRegistries {
    fn default() -> Self {
        Self {
            capabilities: Capability::ALL
                .into_iter()
                .map(|capability| (capability, Registry::new()))
                .collect(),
            secrets: Registry::new(),
        }
    }
}

impl ProviderRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registries with the bundled `json` and `memory` secret stores.
    pub fn with_builtin_secret_stores() -> Result<Self> {
        let registries = Self::new();
        secret::register_builtin_stores(&registries.secrets)?;
        Ok(registries)
    }

    pub fn registry(&self, capability: Capability) -> Result<&ProviderRegistry> {
        self.capabilities
            .get(&capability)
            .ok_or_else(|| CoreError::Internal(format!("no registry for {}", capability)))
    }

    pub fn register<F>(&self, capability: Capability, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(ProviderConfig) -> Result<Arc<dyn CapabilityProvider>> + Send + Sync + 'static,
    {
        self.registry(capability)?
            .register(name, Arc::new(constructor))
    }

    pub fn lookup(&self, capability: Capability, name: &str) -> Option<ProviderConstructor> {
        self.capabilities
            .get(&capability)
            .and_then(|registry| registry.lookup(name))
    }

    pub fn names(&self, capability: Capability) -> Vec<String> {
        self.capabilities
            .get(&capability)
            .map(Registry::names)
            .unwrap_or_default()
    }

    pub fn secrets(&self) -> &Registry<SecretConstructor> {
        &self.secrets
    }
}
