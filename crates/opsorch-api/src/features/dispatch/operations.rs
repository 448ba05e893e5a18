//! Route tables mapping HTTP requests onto capability operations.
//!
//! Each capability owns the paths below its prefix. A table entry names the
//! HTTP method, the path pattern relative to the prefix (`{name}` segments
//! capture path parameters), the operation forwarded to the provider, how the
//! provider payload is built and how the result is shaped.

use axum::extract::Query;
use axum::http::{Method, StatusCode, Uri};
use chrono::{DateTime, Utc};
use opsorch_core::schema::{
    self, AlertQuery, CompleteStepInput, CreateIncidentInput, CreateTicketInput, DeploymentQuery,
    IncidentQuery, LogQuery, Message, MetricQuery, OrchestrationPlanQuery, OrchestrationRunQuery,
    QueryScope, ServiceQuery, StartRunInput, TeamQuery, TicketQuery, TimelineAppendInput,
    UpdateIncidentInput, UpdateTicketInput,
};
use opsorch_core::{Capability, CoreError, OrchError, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Strict body decoder producing the provider payload.
pub type Decoder = fn(&[u8]) -> Result<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Patch,
}

impl Verb {
    fn matches(&self, method: &Method) -> bool {
        match self {
            Verb::Get => method == Method::GET,
            Verb::Post => method == Method::POST,
            Verb::Patch => method == Method::PATCH,
        }
    }
}

#[derive(Clone, Copy)]
pub enum Payload {
    /// Provider receives `null`.
    Nothing,
    /// Provider receives the strictly decoded body.
    Body(Decoder),
    /// Provider receives an empty filter `{}`.
    EmptyFilter,
    /// `{"id": <id>}`
    Id,
    /// `{"id": <id>, "input": <decoded body>}`
    IdAndInput(Decoder),
    /// `{"id": <id>, "entry": <decoded body>}` with `at` defaulting to now.
    TimelineEntry,
    /// Scope from the query string on GET, from the body on POST.
    Scope,
    /// `{"planId": ..}`; the plan id is required.
    StartRun,
    /// `{"runId": .., "stepId": .., "actor": .., "note": ..}`
    CompleteStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Provider result returned verbatim.
    Result,
    /// `{"status":"ok"}` regardless of the result.
    Ack,
    /// Result wrapped as `{"<key>": result}`.
    Wrapped(&'static str),
}

#[derive(Clone, Copy)]
pub struct Operation {
    pub verb: Verb,
    pub pattern: &'static str,
    pub name: &'static str,
    pub payload: Payload,
    pub status: StatusCode,
    pub reply: Reply,
}

const fn op(verb: Verb, pattern: &'static str, name: &'static str, payload: Payload) -> Operation {
    Operation {
        verb,
        pattern,
        name,
        payload,
        status: StatusCode::OK,
        reply: Reply::Result,
    }
}

const fn created(
    verb: Verb,
    pattern: &'static str,
    name: &'static str,
    payload: Payload,
) -> Operation {
    Operation {
        verb,
        pattern,
        name,
        payload,
        status: StatusCode::CREATED,
        reply: Reply::Result,
    }
}

const fn acked(
    status: StatusCode,
    pattern: &'static str,
    name: &'static str,
    payload: Payload,
) -> Operation {
    Operation {
        verb: Verb::Post,
        pattern,
        name,
        payload,
        status,
        reply: Reply::Ack,
    }
}

use Verb::{Get, Patch, Post};

static INCIDENT: [Operation; 7] = [
    op(Post, "/query", "query", Payload::Body(schema::decode_strict::<IncidentQuery>)),
    op(Get, "", "list", Payload::Nothing),
    created(Post, "", "create", Payload::Body(schema::decode_strict::<CreateIncidentInput>)),
    op(Get, "/{id}", "get", Payload::Id),
    op(Patch, "/{id}", "update", Payload::IdAndInput(schema::decode_strict::<UpdateIncidentInput>)),
    op(Get, "/{id}/timeline", "timeline.get", Payload::Id),
    acked(StatusCode::CREATED, "/{id}/timeline", "timeline.append", Payload::TimelineEntry),
];

static ALERT: [Operation; 2] = [
    op(Post, "/query", "query", Payload::Body(schema::decode_strict::<AlertQuery>)),
    op(Get, "/{id}", "get", Payload::Id),
];

static LOG: [Operation; 1] = [op(
    Post,
    "/query",
    "query",
    Payload::Body(schema::decode_strict::<LogQuery>),
)];

static METRIC: [Operation; 3] = [
    op(Post, "/query", "query", Payload::Body(schema::decode_strict::<MetricQuery>)),
    Operation {
        reply: Reply::Wrapped("metrics"),
        ..op(Get, "/describe", "describe", Payload::Scope)
    },
    Operation {
        reply: Reply::Wrapped("metrics"),
        ..op(Post, "/describe", "describe", Payload::Scope)
    },
];

static TICKET: [Operation; 4] = [
    op(Post, "/query", "query", Payload::Body(schema::decode_strict::<TicketQuery>)),
    created(Post, "", "create", Payload::Body(schema::decode_strict::<CreateTicketInput>)),
    op(Get, "/{id}", "get", Payload::Id),
    op(Patch, "/{id}", "update", Payload::IdAndInput(schema::decode_strict::<UpdateTicketInput>)),
];

static MESSAGING: [Operation; 1] = [op(
    Post,
    "/send",
    "send",
    Payload::Body(schema::decode_strict::<Message>),
)];

static SERVICE: [Operation; 2] = [
    op(Get, "", "query", Payload::EmptyFilter),
    op(Post, "/query", "query", Payload::Body(schema::decode_strict::<ServiceQuery>)),
];

static DEPLOYMENT: [Operation; 2] = [
    op(Post, "/query", "query", Payload::Body(schema::decode_strict::<DeploymentQuery>)),
    op(Get, "/{id}", "get", Payload::Id),
];

static TEAM: [Operation; 3] = [
    op(Post, "/query", "query", Payload::Body(schema::decode_strict::<TeamQuery>)),
    op(Get, "/{id}", "get", Payload::Id),
    op(Get, "/{id}/members", "members", Payload::Id),
];

static ORCHESTRATION: [Operation; 6] = [
    op(
        Post,
        "/plans/query",
        "plans.query",
        Payload::Body(schema::decode_strict::<OrchestrationPlanQuery>),
    ),
    op(Get, "/plans/{id}", "plans.get", Payload::Id),
    op(
        Post,
        "/runs/query",
        "runs.query",
        Payload::Body(schema::decode_strict::<OrchestrationRunQuery>),
    ),
    created(Post, "/runs", "runs.start", Payload::StartRun),
    op(Get, "/runs/{id}", "runs.get", Payload::Id),
    acked(
        StatusCode::OK,
        "/runs/{runId}/steps/{stepId}/complete",
        "runs.steps.complete",
        Payload::CompleteStep,
    ),
];

pub fn operations(capability: Capability) -> &'static [Operation] {
    match capability {
        Capability::Incident => &INCIDENT,
        Capability::Alert => &ALERT,
        Capability::Log => &LOG,
        Capability::Metric => &METRIC,
        Capability::Ticket => &TICKET,
        Capability::Messaging => &MESSAGING,
        Capability::Service => &SERVICE,
        Capability::Deployment => &DEPLOYMENT,
        Capability::Team => &TEAM,
        Capability::Orchestration => &ORCHESTRATION,
    }
}

/// Operation matched for a request plus its captured path parameters.
pub struct Route {
    pub operation: &'static Operation,
    pub params: Vec<(&'static str, String)>,
}

impl Route {
    pub fn param(&self, name: &str) -> &str {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    }
}

/// Find the operation for `method` and `path` (a path owned by `capability`).
pub fn match_route(capability: Capability, method: &Method, path: &str) -> Option<Route> {
    let rest = path
        .strip_prefix(capability.route_prefix())?
        .trim_end_matches('/');
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    operations(capability)
        .iter()
        .filter(|operation| operation.verb.matches(method))
        .find_map(|operation| {
            capture(operation.pattern, &segments).map(|params| Route { operation, params })
        })
}

fn capture(pattern: &'static str, segments: &[&str]) -> Option<Vec<(&'static str, String)>> {
    let parts: Vec<&'static str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() != segments.len() {
        return None;
    }
    let mut params = Vec::new();
    for (part, segment) in parts.into_iter().zip(segments) {
        match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some(name) => params.push((name, (*segment).to_string())),
            None if part == *segment => {}
            None => return None,
        }
    }
    Some(params)
}

/// Request pieces a payload is built from.
pub struct RequestParts<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub body: &'a [u8],
    pub now: DateTime<Utc>,
}

impl Payload {
    pub fn build(&self, route: &Route, request: &RequestParts<'_>) -> Result<Value> {
        match self {
            Payload::Nothing => Ok(Value::Null),
            Payload::Body(decode) => decode(request.body),
            Payload::EmptyFilter => Ok(Value::Object(Map::new())),
            Payload::Id => Ok(json!({"id": route.param("id")})),
            Payload::IdAndInput(decode) => {
                let input = decode(request.body)?;
                Ok(json!({"id": route.param("id"), "input": input}))
            }
            Payload::TimelineEntry => {
                let entry: TimelineAppendInput = strict(request.body)?;
                let entry = schema::encode(&entry.stamped(request.now))?;
                Ok(json!({"id": route.param("id"), "entry": entry}))
            }
            Payload::Scope => {
                if request.method == Method::POST {
                    schema::decode_strict::<QueryScope>(request.body)
                } else {
                    let Query(params) = Query::<ScopeParams>::try_from_uri(request.uri)
                        .map_err(|e| CoreError::from(OrchError::bad_request(e.body_text())))?;
                    schema::encode(&QueryScope {
                        service: params.service,
                        team: params.team,
                        environment: params.environment,
                    })
                }
            }
            Payload::StartRun => {
                let input: StartRunInput = strict(request.body)?;
                if input.plan_id.trim().is_empty() {
                    return Err(OrchError::bad_request("planId is required").into());
                }
                Ok(json!({"planId": input.plan_id}))
            }
            Payload::CompleteStep => {
                let input: CompleteStepInput = strict(request.body)?;
                Ok(json!({
                    "runId": route.param("runId"),
                    "stepId": route.param("stepId"),
                    "actor": input.actor,
                    "note": input.note,
                }))
            }
        }
    }
}

/// Scope filters accepted on `GET /metrics/describe`; other parameters are ignored.
#[derive(Debug, Default, Deserialize)]
struct ScopeParams {
    #[serde(default)]
    service: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    environment: String,
}

fn strict<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| CoreError::from(OrchError::bad_request(e.to_string())))
}
