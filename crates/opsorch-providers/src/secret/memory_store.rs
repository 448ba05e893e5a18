use super::SecretStore;
use async_trait::async_trait;
use opsorch_core::{CoreError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory store; contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    storage: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(mut storage) = self.storage.write() {
            storage.insert(key.into(), value.into());
        }
        self
    }

    /// Keys starting with `prefix`, sorted.
    pub fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let storage = self
            .storage
            .read()
            .map_err(|_| CoreError::SecretStore("storage lock poisoned".to_string()))?;
        let mut keys: Vec<String> = storage
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<String> {
        let storage = self
            .storage
            .read()
            .map_err(|_| CoreError::SecretStore("storage lock poisoned".to_string()))?;
        storage
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::SecretStore(format!("secret not found: {}", key)))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| CoreError::SecretStore("storage lock poisoned".to_string()))?;
        storage.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        store.put("providers/incident/default", "{\"provider\":\"mock\"}").await.unwrap();
        assert_eq!(
            store.get("providers/incident/default").await.unwrap(),
            "{\"provider\":\"mock\"}"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_an_error() {
        let store = MemoryStore::new();
        let err = store.get("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::SecretStore(m) if m.contains("nope")));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new().with_entry("k", "v1");
        store.put("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), "v2");
    }

    #[test]
    fn test_keys_filters_by_prefix() {
        let store = MemoryStore::new()
            .with_entry("providers/log/default", "{}")
            .with_entry("providers/alert/default", "{}")
            .with_entry("other", "x");
        assert_eq!(
            store.keys("providers/").unwrap(),
            vec!["providers/alert/default", "providers/log/default"]
        );
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.put("shared", "yes").await.unwrap();
        assert_eq!(store.get("shared").await.unwrap(), "yes");
    }
}
