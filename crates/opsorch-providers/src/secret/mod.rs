//! Persisted configuration store used for provider selections.

pub mod json_store;
pub mod memory_store;
pub mod plugin_store;

pub use json_store::JsonFileStore;
pub use memory_store::MemoryStore;
pub use plugin_store::PluginSecretStore;

use crate::ProviderRegistries;
use async_trait::async_trait;
use opsorch_core::{ConfigSource, CoreError, ProviderConfig, Registry, Result};
use std::sync::Arc;
use tracing::info;

/// Environment prefix of the store's own selection signals.
pub const SECRET_ENV_PREFIX: &str = "OPSORCH_SECRET";

/// Opaque string storage keyed by logical name.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<String>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}

pub type SecretConstructor =
    Arc<dyn Fn(ProviderConfig) -> Result<Arc<dyn SecretStore>> + Send + Sync>;

pub(crate) fn register_builtin_stores(registry: &Registry<SecretConstructor>) -> Result<()> {
    registry.register(
        "json",
        Arc::new(|config: ProviderConfig| -> Result<Arc<dyn SecretStore>> {
            Ok(Arc::new(JsonFileStore::from_config(&config)?))
        }),
    )?;
    registry.register(
        "memory",
        Arc::new(|_config: ProviderConfig| -> Result<Arc<dyn SecretStore>> {
            Ok(Arc::new(MemoryStore::new()))
        }),
    )?;
    Ok(())
}

/// Build the store named by `OPSORCH_SECRET_PLUGIN` or `OPSORCH_SECRET_PROVIDER`.
///
/// `Ok(None)` when neither is set; the server then runs without persisted
/// selections and rejects reconfiguration.
pub fn resolve_secret_store(
    source: &dyn ConfigSource,
    registries: &ProviderRegistries,
) -> Result<Option<Arc<dyn SecretStore>>> {
    let Some(selection) = source.selection(SECRET_ENV_PREFIX)? else {
        return Ok(None);
    };

    if let Some(path) = selection.plugin_path().map(str::to_string) {
        info!(plugin = %path, "Using plugin secret store");
        return Ok(Some(Arc::new(PluginSecretStore::new(path, selection.config))));
    }

    let constructor = registries
        .secrets()
        .lookup(&selection.provider)
        .ok_or_else(|| {
            CoreError::ProviderNotRegistered(format!(
                "secret provider {} not registered",
                selection.provider
            ))
        })?;
    let store = constructor(selection.config)?;
    info!(provider = %selection.provider, "Using secret store");
    Ok(Some(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsorch_core::MapConfigSource;

    #[test]
    fn test_no_signals_means_no_store() {
        let registries = ProviderRegistries::with_builtin_secret_stores().unwrap();
        let store = resolve_secret_store(&MapConfigSource::new(), &registries).unwrap();
        assert!(store.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_by_name() {
        let registries = ProviderRegistries::with_builtin_secret_stores().unwrap();
        let source = MapConfigSource::new().with("OPSORCH_SECRET_PROVIDER", "Memory");

        let store = resolve_secret_store(&source, &registries).unwrap().unwrap();
        store.put("providers/log/default", "{}").await.unwrap();
        assert_eq!(store.get("providers/log/default").await.unwrap(), "{}");
    }

    #[test]
    fn test_plugin_path_selects_plugin_store() {
        let registries = ProviderRegistries::with_builtin_secret_stores().unwrap();
        let source = MapConfigSource::new()
            .with("OPSORCH_SECRET_PROVIDER", "vault")
            .with("OPSORCH_SECRET_PLUGIN", "/usr/local/bin/secretplugin")
            .with("OPSORCH_SECRET_CONFIG", r#"{"token":"t"}"#);

        let store = resolve_secret_store(&source, &registries).unwrap();
        assert!(store.is_some());
    }

    #[test]
    fn test_unknown_store_is_not_registered() {
        let registries = ProviderRegistries::with_builtin_secret_stores().unwrap();
        let source = MapConfigSource::new().with("OPSORCH_SECRET_PROVIDER", "vault");

        let err = resolve_secret_store(&source, &registries).err().unwrap();
        assert!(matches!(err, CoreError::ProviderNotRegistered(_)));
    }

    #[test]
    fn test_json_store_requires_path() {
        let registries = ProviderRegistries::with_builtin_secret_stores().unwrap();
        let source = MapConfigSource::new().with("OPSORCH_SECRET_PROVIDER", "json");

        let err = resolve_secret_store(&source, &registries).err().unwrap();
        assert!(matches!(err, CoreError::ProviderConstruction(_)));
    }

    #[test]
    fn test_malformed_secret_config_fails() {
        let registries = ProviderRegistries::with_builtin_secret_stores().unwrap();
        let source = MapConfigSource::new()
            .with("OPSORCH_SECRET_PROVIDER", "memory")
            .with("OPSORCH_SECRET_CONFIG", "{");

        let err = resolve_secret_store(&source, &registries).err().unwrap();
        assert!(matches!(err, CoreError::ConfigurationDecode(_)));
    }
}
