//! Incident plugin holding a small in-memory incident list.

use chrono::Utc;
use opsorch_core::schema::{
    CreateIncidentInput, IncidentQuery, TimelineAppendInput, UpdateIncidentInput,
};
use opsorch_plugins::{init_tracing, payload, serve, unknown_method};
use opsorch_proto::{RpcRequest, RpcResponse};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct ById {
    id: String,
}

#[derive(Deserialize)]
struct UpdateById {
    id: String,
    #[serde(default)]
    input: UpdateIncidentInput,
}

#[derive(Deserialize)]
struct AppendById {
    id: String,
    entry: TimelineAppendInput,
}

struct Incidents {
    items: Vec<Value>,
    timeline: Vec<Value>,
}

impl Incidents {
    fn seeded() -> Self {
        let now = Utc::now();
        Self {
            items: vec![json!({
                "id": "p1",
                "title": "plugin incident",
                "status": "open",
                "severity": "sev2",
                "service": "svc-plugin",
                "createdAt": now,
                "updatedAt": now,
            })],
            timeline: vec![json!({
                "id": "t1",
                "incidentId": "p1",
                "at": now,
                "kind": "note",
                "body": "from plugin",
            })],
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|inc| inc["id"] == id)
    }

    fn handle(&mut self, request: RpcRequest) -> RpcResponse {
        let result = match request.method.as_str() {
            "incident.query" => self.query(&request),
            "incident.list" => Ok(RpcResponse::ok(Value::Array(self.items.clone()))),
            "incident.get" => self.get(&request),
            "incident.create" => self.create(&request),
            "incident.update" => self.update(&request),
            "incident.timeline.get" => self.timeline(&request),
            "incident.timeline.append" => self.append(&request),
            _ => Ok(unknown_method(&request)),
        };
        result.unwrap_or_else(|response| response)
    }

    fn query(&self, request: &RpcRequest) -> Result<RpcResponse, RpcResponse> {
        let query: IncidentQuery = payload(request)?;
        let mut items: Vec<Value> = self
            .items
            .iter()
            .filter(|inc| {
                query.statuses.is_empty()
                    || query
                        .statuses
                        .iter()
                        .any(|s| inc["status"].as_str() == Some(s.as_str()))
            })
            .cloned()
            .collect();
        if query.limit > 0 {
            items.truncate(query.limit as usize);
        }
        Ok(RpcResponse::ok(Value::Array(items)))
    }

    fn get(&self, request: &RpcRequest) -> Result<RpcResponse, RpcResponse> {
        let by_id: ById = payload(request)?;
        match self.position(&by_id.id) {
            Some(idx) => Ok(RpcResponse::ok(self.items[idx].clone())),
            None => Ok(RpcResponse::error(
                "not_found",
                format!("incident {} not found", by_id.id),
            )),
        }
    }

    fn create(&mut self, request: &RpcRequest) -> Result<RpcResponse, RpcResponse> {
        let input: CreateIncidentInput = payload(request)?;
        if input.title.trim().is_empty() {
            return Ok(RpcResponse::error("bad_request", "title is required"));
        }
        let now = Utc::now();
        let incident = json!({
            "id": format!("p{}", self.items.len() + 1),
            "title": input.title,
            "description": input.description,
            "status": if input.status.is_empty() { "open".to_string() } else { input.status },
            "severity": input.severity,
            "service": input.service,
            "createdAt": now,
            "updatedAt": now,
        });
        self.items.push(incident.clone());
        Ok(RpcResponse::ok(incident))
    }

    fn update(&mut self, request: &RpcRequest) -> Result<RpcResponse, RpcResponse> {
        let update: UpdateById = payload(request)?;
        let Some(idx) = self.position(&update.id) else {
            return Ok(RpcResponse::error(
                "not_found",
                format!("incident {} not found", update.id),
            ));
        };
        let incident = &mut self.items[idx];
        let input = update.input;
        for (field, value) in [
            ("title", input.title),
            ("description", input.description),
            ("status", input.status),
            ("severity", input.severity),
            ("service", input.service),
        ] {
            if let Some(value) = value {
                incident[field] = Value::String(value);
            }
        }
        incident["updatedAt"] = json!(Utc::now());
        Ok(RpcResponse::ok(incident.clone()))
    }

    fn timeline(&self, request: &RpcRequest) -> Result<RpcResponse, RpcResponse> {
        let by_id: ById = payload(request)?;
        let entries: Vec<Value> = self
            .timeline
            .iter()
            .filter(|entry| entry["incidentId"] == by_id.id.as_str())
            .cloned()
            .collect();
        Ok(RpcResponse::ok(Value::Array(entries)))
    }

    fn append(&mut self, request: &RpcRequest) -> Result<RpcResponse, RpcResponse> {
        let append: AppendById = payload(request)?;
        if self.position(&append.id).is_none() {
            return Ok(RpcResponse::error(
                "not_found",
                format!("incident {} not found", append.id),
            ));
        }
        let entry = append.entry.stamped(Utc::now());
        self.timeline.push(json!({
            "id": format!("t{}", self.timeline.len() + 1),
            "incidentId": append.id,
            "at": entry.at,
            "kind": entry.kind,
            "body": entry.body,
        }));
        Ok(RpcResponse::empty())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("incidentmock=info");
    let mut incidents = Incidents::seeded();
    serve(|request| incidents.handle(request)).await?;
    Ok(())
}
