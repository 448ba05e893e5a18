pub mod runner;

pub use runner::PluginRunner;

use crate::CapabilityProvider;
use async_trait::async_trait;
use opsorch_core::{Capability, ProviderConfig, Result};
use serde_json::Value;
use std::path::PathBuf;

/// Capability provider backed by an external plugin executable.
///
/// Operations are forwarded as `<capability>.<operation>` with the payload
/// unchanged.
#[derive(Clone)]
pub struct PluginProvider {
    capability: Capability,
    runner: PluginRunner,
}

impl PluginProvider {
    pub fn new(capability: Capability, path: impl Into<PathBuf>, config: ProviderConfig) -> Self {
        Self {
            capability,
            runner: PluginRunner::new(path, config),
        }
    }
}

#[async_trait]
impl CapabilityProvider for PluginProvider {
    async fn invoke(&self, operation: &str, payload: Value) -> Result<Option<Value>> {
        self.runner
            .call(&self.capability.qualify(operation), payload)
            .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    #[tokio::test]
    async fn test_operation_is_qualified_with_capability() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("method-echo.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        // Answers with the method name it was called with.
        writeln!(
            file,
            concat!(
                "#!/bin/sh\nwhile read line; do ",
                "m=$(echo \"$line\" | sed 's/.*\"method\":\"\\([^\"]*\\)\".*/\\1/'); ",
                "echo \"{{\\\"result\\\":\\\"$m\\\"}}\"; done"
            )
        )
        .unwrap();
        drop(file);
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        let provider = PluginProvider::new(Capability::Incident, &path, ProviderConfig::new());
        let result = provider
            .invoke("timeline.get", json!({"id": "p1"}))
            .await
            .unwrap();
        assert_eq!(result, Some(json!("incident.timeline.get")));
    }
}
