use crate::features::observability::controller::ObservabilityController;
use crate::features::observability::repo::ObservabilityRepository;
use crate::features::observability::service::ObservabilityService;
use async_trait::async_trait;
use opsorch_core::{ProviderConfig, Result};
use opsorch_providers::CapabilityProvider;
use serde_json::{json, Value};
use std::sync::Arc;

mockall::mock! {
    pub Provider {}

    #[async_trait]
    impl CapabilityProvider for Provider {
        async fn invoke(&self, operation: &str, payload: Value) -> Result<Option<Value>>;
    }
}

/// Answers every operation with what it received and how it was configured.
pub struct EchoProvider {
    config: ProviderConfig,
}

#[async_trait]
impl CapabilityProvider for EchoProvider {
    async fn invoke(&self, operation: &str, payload: Value) -> Result<Option<Value>> {
        Ok(Some(json!({
            "operation": operation,
            "payload": payload,
            "config": self.config,
        })))
    }
}

pub fn echo_constructor(
) -> impl Fn(ProviderConfig) -> Result<Arc<dyn CapabilityProvider>> + Send + Sync + 'static {
    |config: ProviderConfig| -> Result<Arc<dyn CapabilityProvider>> {
        Ok(Arc::new(EchoProvider { config }))
    }
}

/// Metrics isolated from the process-wide registry.
pub fn fresh_observability() -> Arc<ObservabilityController> {
    let repo = ObservabilityRepository::new().unwrap();
    Arc::new(ObservabilityController::new(ObservabilityService::new(
        Arc::new(repo),
    )))
}
