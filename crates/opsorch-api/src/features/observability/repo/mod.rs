use prometheus::{
    opts, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Registry, TextEncoder,
};

pub struct ObservabilityRepository {
    registry: Registry,
    api_request_total: CounterVec,
    api_request_latency_seconds: HistogramVec,
    provider_invocation_latency_seconds: HistogramVec,
    capability_configured: GaugeVec,
}

impl ObservabilityRepository {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();

        let api_request_total = CounterVec::new(
            opts!("opsorch_api_request_total", "API requests by endpoint and status"),
            &["endpoint", "status"],
        )
        .map_err(|e| e.to_string())?;
        let api_request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "opsorch_api_request_latency_seconds",
                "API request latency (seconds)",
            ),
            &["endpoint"],
        )
        .map_err(|e| e.to_string())?;
        let provider_invocation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "opsorch_provider_invocation_latency_seconds",
                "Provider invocation latency (seconds)",
            ),
            &["capability"],
        )
        .map_err(|e| e.to_string())?;
        let capability_configured = GaugeVec::new(
            opts!(
                "opsorch_capability_configured",
                "Capability has an active provider (1 configured / 0 unconfigured)"
            ),
            &["capability"],
        )
        .map_err(|e| e.to_string())?;

        registry
            .register(Box::new(api_request_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(api_request_latency_seconds.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(provider_invocation_latency_seconds.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(capability_configured.clone()))
            .map_err(|e| e.to_string())?;

        Ok(Self {
            registry,
            api_request_total,
            api_request_latency_seconds,
            provider_invocation_latency_seconds,
            capability_configured,
        })
    }

    pub fn observe_api_request(&self, endpoint: &str, status: &str, seconds: f64) {
        self.api_request_total
            .with_label_values(&[endpoint, status])
            .inc();
        self.api_request_latency_seconds
            .with_label_values(&[endpoint])
            .observe(seconds);
    }

    pub fn observe_provider_invocation(&self, capability: &str, seconds: f64) {
        self.provider_invocation_latency_seconds
            .with_label_values(&[capability])
            .observe(seconds);
    }

    pub fn set_capability_configured(&self, capability: &str, configured: bool) {
        self.capability_configured
            .with_label_values(&[capability])
            .set(if configured { 1.0 } else { 0.0 });
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}
