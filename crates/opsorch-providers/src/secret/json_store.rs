use super::SecretStore;
use async_trait::async_trait;
use opsorch_core::{CoreError, ProviderConfig, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Deserialize)]
struct JsonFileStoreConfig {
    #[serde(default)]
    path: Option<PathBuf>,
}

/// Store seeded from a JSON object file.
///
/// Writes stay in memory; the file is never rewritten. Values that are not
/// strings are returned as their JSON encoding.
pub struct JsonFileStore {
    values: RwLock<Map<String, Value>>,
}

impl JsonFileStore {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let parsed: JsonFileStoreConfig = config.parse()?;
        let path = parsed
            .path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                CoreError::ProviderConstruction(
                    "json secret store requires 'path' in config".to_string(),
                )
            })?;

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            CoreError::ProviderConstruction(format!(
                "failed to read secret file {}: {}",
                path.display(),
                e
            ))
        })?;
        let values: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
            CoreError::ProviderConstruction(format!(
                "failed to parse secret file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            values: RwLock::new(values),
        })
    }
}

#[async_trait]
impl SecretStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<String> {
        let values = self
            .values
            .read()
            .map_err(|_| CoreError::SecretStore("secret lock poisoned".to_string()))?;
        match values.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(CoreError::SecretStore(format!("secret not found: {}", key))),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| CoreError::SecretStore("secret lock poisoned".to_string()))?;
        values.insert(key.to_string(), Value::String(value.to_string()));
        Ok(())
    }
}
