//! Request payload shapes accepted by the capability endpoints.
//!
//! Every type rejects unknown fields. Decoding goes through [`decode_strict`],
//! which re-encodes the typed value so providers receive a normalized JSON
//! document with empty fields omitted.

pub mod alert;
pub mod deployment;
pub mod incident;
pub mod log;
pub mod messaging;
pub mod metric;
pub mod orchestration;
pub mod service;
pub mod team;
pub mod ticket;

pub use alert::AlertQuery;
pub use deployment::DeploymentQuery;
pub use incident::{CreateIncidentInput, IncidentQuery, TimelineAppendInput, UpdateIncidentInput};
pub use log::{LogExpression, LogFilter, LogQuery};
pub use messaging::{Block, BlockType, Message};
pub use metric::{MetricExpression, MetricFilter, MetricQuery};
pub use orchestration::{
    CompleteStepInput, OrchestrationPlanQuery, OrchestrationRunQuery, StartRunInput,
};
pub use service::ServiceQuery;
pub use team::TeamQuery;
pub use ticket::{CreateTicketInput, TicketQuery, UpdateTicketInput};

use crate::{CoreError, OrchError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Narrows a query to a service, team or environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryScope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub team: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub environment: String,
}

impl QueryScope {
    pub fn is_empty(&self) -> bool {
        self.service.is_empty() && self.team.is_empty() && self.environment.is_empty()
    }
}

/// Free-form key/value map carried through untouched.
pub type Metadata = Map<String, Value>;

pub(crate) fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Decode `body` as `T`, rejecting unknown fields, and return it re-encoded.
pub fn decode_strict<T>(body: &[u8]) -> Result<Value>
where
    T: DeserializeOwned + Serialize,
{
    let typed: T = serde_json::from_slice(body)
        .map_err(|e| CoreError::from(OrchError::bad_request(e.to_string())))?;
    encode(&typed)
}

/// Encode a typed payload for a provider.
pub fn encode<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| CoreError::Internal(e.to_string()))
}
