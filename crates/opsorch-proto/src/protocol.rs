// Envelopes exchanged with plugin executables over stdin/stdout.
// Version: 1

use opsorch_core::{CoreError, OrchError, ProviderConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call into a plugin. `method` is `<capability>.<operation>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub config: ProviderConfig,
    #[serde(default)]
    pub payload: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, config: ProviderConfig, payload: Value) -> Self {
        Self {
            method: method.into(),
            config,
            payload,
        }
    }
}

/// Failure reported by a plugin.
///
/// Older plugins send a bare string; newer ones send `{code, message}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RpcError {
    Message(String),
    Detailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default)]
        message: String,
    },
}

impl RpcError {
    pub fn code(&self) -> Option<&str> {
        match self {
            RpcError::Message(_) => None,
            RpcError::Detailed { code, .. } => code.as_deref().filter(|c| !c.is_empty()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RpcError::Message(message) => message,
            RpcError::Detailed { message, .. } => message,
        }
    }
}

impl From<RpcError> for CoreError {
    fn from(err: RpcError) -> Self {
        match err.code() {
            Some(code) => CoreError::Invocation(OrchError::new(code, err.message())),
            None => CoreError::Untyped(err.message().to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    /// Success without a result, for operations that only acknowledge.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RpcError::Detailed {
                code: Some(code.into()),
                message: message.into(),
            }),
        }
    }

    pub fn untyped_error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RpcError::Message(message.into())),
        }
    }

    /// Result of the call: the error wins over any result that came with it.
    pub fn into_result(self) -> Result<Option<Value>, CoreError> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.result),
        }
    }
}
