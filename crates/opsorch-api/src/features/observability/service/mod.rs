use crate::features::observability::repo::ObservabilityRepository;
use opsorch_core::Capability;
use std::sync::Arc;
use std::time::Duration;

pub struct ObservabilityService {
    repo: Arc<ObservabilityRepository>,
}

impl ObservabilityService {
    pub fn new(repo: Arc<ObservabilityRepository>) -> Self {
        Self { repo }
    }

    pub fn record_api_request(&self, endpoint: &str, status: u16, elapsed: Duration) {
        self.repo
            .observe_api_request(endpoint, &status.to_string(), elapsed.as_secs_f64());
    }

    pub fn record_provider_invocation(&self, capability: Capability, elapsed: Duration) {
        self.repo
            .observe_provider_invocation(capability.as_str(), elapsed.as_secs_f64());
    }

    pub fn set_capability_configured(&self, capability: Capability, configured: bool) {
        self.repo
            .set_capability_configured(capability.as_str(), configured);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.repo.render_metrics()
    }
}
