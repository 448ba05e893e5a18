use axum::http::HeaderMap;
use opsorch_core::{ActorType, ProviderConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers consulted for a request id, in order.
const REQUEST_ID_HEADERS: [&str; 4] = [
    REQUEST_ID_HEADER,
    "x-amzn-trace-id",
    "x-correlation-id",
    "x-trace-id",
];

const ACTOR_TYPE_HEADER: &str = "x-actor-type";

/// Headers consulted for the actor id, in order.
const ACTOR_ID_HEADERS: [&str; 3] = ["x-user-id", "x-actor-id", "x-opsorch-actor-id"];

/// Who issued a request and how to correlate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub actor_type: ActorType,
    pub actor_id: String,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = first_header(headers, &REQUEST_ID_HEADERS)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let actor_type = first_header(headers, &[ACTOR_TYPE_HEADER])
            .map(|value| ActorType::from_header(&value))
            .unwrap_or_default();
        let actor_id =
            first_header(headers, &ACTOR_ID_HEADERS).unwrap_or_else(|| "unknown".to_string());

        Self {
            request_id,
            actor_type,
            actor_id,
        }
    }
}

fn first_header(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Body of `POST /providers/{capability}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfigRequest {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub config: ProviderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersResponse {
    pub providers: Vec<String>,
}

/// `{"status":"ok"}`, returned by health checks and operations without a result.
pub fn status_ok() -> Value {
    json!({"status": "ok"})
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_id_prefers_x_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", HeaderValue::from_static("trace-1"));
        headers.insert("x-request-id", HeaderValue::from_static("req-1"));

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.request_id, "req-1");
    }

    #[test]
    fn test_request_id_falls_back_through_trace_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-correlation-id", HeaderValue::from_static("corr-7"));
        headers.insert("x-trace-id", HeaderValue::from_static("trace-1"));

        assert_eq!(RequestContext::from_headers(&headers).request_id, "corr-7");
    }

    #[test]
    fn test_request_id_is_generated_when_absent() {
        let first = RequestContext::from_headers(&HeaderMap::new());
        let second = RequestContext::from_headers(&HeaderMap::new());
        assert!(!first.request_id.is_empty());
        assert_ne!(first.request_id, second.request_id);
    }

    #[test]
    fn test_actor_defaults() {
        let ctx = RequestContext::from_headers(&HeaderMap::new());
        assert_eq!(ctx.actor_type, ActorType::User);
        assert_eq!(ctx.actor_id, "unknown");
    }

    #[test]
    fn test_copilot_actor() {
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-type", HeaderValue::from_static("Copilot"));
        headers.insert("x-opsorch-actor-id", HeaderValue::from_static("copilot-1"));

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.actor_type, ActorType::Copilot);
        assert_eq!(ctx.actor_id, "copilot-1");
    }

    #[test]
    fn test_provider_config_request_rejects_unknown_fields() {
        let err = serde_json::from_str::<ProviderConfigRequest>(r#"{"provider":"x","extra":1}"#);
        assert!(err.is_err());
    }
}
