use super::SecretStore;
use crate::PluginRunner;
use async_trait::async_trait;
use opsorch_core::{CoreError, ProviderConfig, Result};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Secret store answered by a plugin through `secret.get` and `secret.put`.
pub struct PluginSecretStore {
    runner: PluginRunner,
}

impl PluginSecretStore {
    pub fn new(path: impl Into<PathBuf>, config: ProviderConfig) -> Self {
        Self {
            runner: PluginRunner::new(path, config),
        }
    }
}

#[async_trait]
impl SecretStore for PluginSecretStore {
    async fn get(&self, key: &str) -> Result<String> {
        match self.runner.call("secret.get", json!({ "key": key })).await? {
            Some(Value::String(value)) => Ok(value),
            Some(other) => Err(CoreError::SecretStore(format!(
                "secret {} is not a string: {}",
                key, other
            ))),
            None => Err(CoreError::SecretStore(format!("secret not found: {}", key))),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.runner
            .call("secret.put", json!({ "key": key, "value": value }))
            .await?;
        Ok(())
    }
}
