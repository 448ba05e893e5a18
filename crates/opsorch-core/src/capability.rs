use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain area served by exactly one active provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Incident,
    Alert,
    Log,
    Metric,
    Ticket,
    Messaging,
    Service,
    Deployment,
    Team,
    Orchestration,
}

impl Capability {
    /// Every capability in dispatch order.
    pub const ALL: [Capability; 10] = [
        Capability::Incident,
        Capability::Alert,
        Capability::Log,
        Capability::Metric,
        Capability::Ticket,
        Capability::Messaging,
        Capability::Service,
        Capability::Deployment,
        Capability::Team,
        Capability::Orchestration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Incident => "incident",
            Capability::Alert => "alert",
            Capability::Log => "log",
            Capability::Metric => "metric",
            Capability::Ticket => "ticket",
            Capability::Messaging => "messaging",
            Capability::Service => "service",
            Capability::Deployment => "deployment",
            Capability::Team => "team",
            Capability::Orchestration => "orchestration",
        }
    }

    /// Maps canonical names and the plural/variant path segments onto a capability.
    pub fn parse(name: &str) -> Option<Self> {
        let capability = match name.trim().to_ascii_lowercase().as_str() {
            "incident" | "incidents" => Capability::Incident,
            "alert" | "alerts" => Capability::Alert,
            "log" | "logs" => Capability::Log,
            "metric" | "metrics" => Capability::Metric,
            "ticket" | "tickets" => Capability::Ticket,
            "message" | "messages" | "messaging" => Capability::Messaging,
            "service" | "services" => Capability::Service,
            "deployment" | "deployments" => Capability::Deployment,
            "team" | "teams" => Capability::Team,
            "orchestration" => Capability::Orchestration,
            _ => return None,
        };
        Some(capability)
    }

    /// First path segment owned by this capability's dispatcher.
    pub fn route_prefix(&self) -> &'static str {
        match self {
            Capability::Incident => "/incidents",
            Capability::Alert => "/alerts",
            Capability::Log => "/logs",
            Capability::Metric => "/metrics",
            Capability::Ticket => "/tickets",
            Capability::Messaging => "/messages",
            Capability::Service => "/services",
            Capability::Deployment => "/deployments",
            Capability::Team => "/teams",
            Capability::Orchestration => "/orchestration",
        }
    }

    /// True when `path` is the prefix itself or lies below it.
    pub fn owns_path(&self, path: &str) -> bool {
        let prefix = self.route_prefix();
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// `OPSORCH_<CAPABILITY>`, the prefix of the per-capability environment signals.
    pub fn env_prefix(&self) -> String {
        format!("OPSORCH_{}", self.as_str().to_ascii_uppercase())
    }

    /// Key of the persisted provider selection.
    pub fn store_key(&self) -> String {
        format!("providers/{}/default", self.as_str())
    }

    /// Error code returned when a request reaches an unconfigured capability.
    pub fn missing_code(&self) -> String {
        format!("{}_provider_missing", self.as_str())
    }

    /// Action or plugin method name `<capability>.<operation>`.
    pub fn qualify(&self, operation: &str) -> String {
        format!("{}.{}", self.as_str(), operation)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Capability::parse(s).ok_or_else(|| CoreError::UnknownCapability(s.to_string()))
    }
}
