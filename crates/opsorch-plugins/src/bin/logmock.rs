//! Log plugin answering every query with one synthetic entry.

use chrono::Utc;
use opsorch_core::schema::LogQuery;
use opsorch_plugins::{init_tracing, payload, serve, unknown_method};
use opsorch_proto::{RpcRequest, RpcResponse};
use serde_json::json;

fn handle(request: RpcRequest) -> RpcResponse {
    if request.method != "log.query" {
        return unknown_method(&request);
    }
    let query: LogQuery = match payload(&request) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let search = query
        .expression
        .map(|expression| expression.search)
        .unwrap_or_default();

    RpcResponse::ok(json!({
        "entries": [{
            "timestamp": Utc::now(),
            "message": format!("plugin log: {}", search),
            "severity": "info",
            "service": query.scope.service,
        }],
        "url": format!("https://logs.example.com/query?q={}", search),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("logmock=info");
    serve(handle).await?;
    Ok(())
}
