pub mod capability;
pub mod config;
pub mod registry;
pub mod schema;

pub use capability::Capability;
pub use config::{ConfigSource, EnvConfigSource, MapConfigSource, ProviderConfig, ProviderSelection};
pub use registry::Registry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error code a provider returns when the addressed entity does not exist.
pub const CODE_NOT_FOUND: &str = "not_found";
/// Error code for rejected input, both from clients and from providers.
pub const CODE_BAD_REQUEST: &str = "bad_request";
/// Error code used when a provider failed without a typed code.
pub const CODE_PROVIDER_ERROR: &str = "provider_error";

/// Typed provider failure carrying a stable machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchError {
    pub code: String,
    pub message: String,
}

impl OrchError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CODE_NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(CODE_BAD_REQUEST, message)
    }
}

impl fmt::Display for OrchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("Duplicate provider: {0}")]
    DuplicateProvider(String),
    #[error("Invalid provider name: {0}")]
    InvalidName(String),
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),
    #[error("Provider not registered: {0}")]
    ProviderNotRegistered(String),
    #[error("Configuration decode error: {0}")]
    ConfigurationDecode(String),
    #[error("Provider construction failed: {0}")]
    ProviderConstruction(String),
    #[error("{0} provider not configured")]
    NotConfigured(Capability),
    #[error("{0}")]
    Invocation(OrchError),
    #[error("{0}")]
    Untyped(String),
    #[error("Plugin transport error: {0}")]
    PluginTransport(String),
    #[error("Secret store error: {0}")]
    SecretStore(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Typed code carried by a provider failure, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            CoreError::Invocation(err) => Some(err.code.as_str()),
            _ => None,
        }
    }

    /// Message without the variant prefix, as returned to HTTP clients.
    pub fn message(&self) -> String {
        match self {
            CoreError::Invocation(err) => err.message.clone(),
            CoreError::Untyped(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<OrchError> for CoreError {
    fn from(err: OrchError) -> Self {
        CoreError::Invocation(err)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Error body written on every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<OrchError> for ErrorResponse {
    fn from(err: OrchError) -> Self {
        Self::new(err.code, err.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    #[default]
    User,
    Copilot,
}

impl ActorType {
    /// Anything other than `copilot` is treated as a user.
    pub fn from_header(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("copilot") {
            ActorType::Copilot
        } else {
            ActorType::User
        }
    }
}

/// Structured record of one successful capability call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub request_id: String,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            actor_type: ActorType::User,
            actor_id: "unknown".to_string(),
            timestamp: Utc::now(),
            action: action.into(),
        }
    }

    pub fn with_actor(mut self, actor_type: ActorType, actor_id: impl Into<String>) -> Self {
        self.actor_type = actor_type;
        self.actor_id = actor_id.into();
        self
    }
}

/// Keeps audit entries in memory in the order they were recorded.
#[derive(Debug, Default)]
pub struct AuditRecorder {
    entries: Vec<AuditEntry>,
}

impl AuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orch_error_helpers() {
        let err = OrchError::not_found("incident p9 not found");
        assert_eq!(err.code, "not_found");
        assert_eq!(err.to_string(), "not_found: incident p9 not found");
        assert_eq!(OrchError::bad_request("x").code, CODE_BAD_REQUEST);
    }

    #[test]
    fn test_core_error_code_only_for_invocation() {
        let typed: CoreError = OrchError::new("rate_limited", "slow down").into();
        assert_eq!(typed.code(), Some("rate_limited"));
        assert_eq!(typed.message(), "slow down");

        let untyped = CoreError::Untyped("boom".to_string());
        assert_eq!(untyped.code(), None);
        assert_eq!(untyped.message(), "boom");

        let transport = CoreError::PluginTransport("broken pipe".to_string());
        assert!(transport.message().contains("broken pipe"));
    }

    #[test]
    fn test_not_configured_display() {
        let err = CoreError::NotConfigured(Capability::Incident);
        assert_eq!(err.to_string(), "incident provider not configured");
    }

    #[test]
    fn test_error_response_serialization() {
        let body = ErrorResponse::new("bad_request", "unexpected field");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": "bad_request", "message": "unexpected field"})
        );
    }

    #[test]
    fn test_actor_type_from_header() {
        assert_eq!(ActorType::from_header("Copilot"), ActorType::Copilot);
        assert_eq!(ActorType::from_header(" user "), ActorType::User);
        assert_eq!(ActorType::from_header("robot"), ActorType::User);
        assert_eq!(ActorType::from_header(""), ActorType::User);
    }

    #[test]
    fn test_audit_entry_serialization_uses_snake_case() {
        let entry =
            AuditEntry::new("incident.query", "req-1").with_actor(ActorType::Copilot, "c-1");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["request_id"], "req-1");
        assert_eq!(json["actor_type"], "copilot");
        assert_eq!(json["actor_id"], "c-1");
        assert_eq!(json["action"], "incident.query");
    }

    #[test]
    fn test_audit_recorder_keeps_recording_order() {
        let mut recorder = AuditRecorder::new();
        recorder.record(AuditEntry::new("incident.query", "r1"));
        recorder.record(AuditEntry::new("incident.create", "r2"));

        let actions: Vec<&str> = recorder.entries().iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["incident.query", "incident.create"]);
    }
}
