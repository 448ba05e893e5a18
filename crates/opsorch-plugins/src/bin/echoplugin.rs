//! Answers any method with the request it received.
//!
//! With `{"failWith": {"code": ..., "message": ...}}` in its config every
//! call fails with that error instead; a missing code yields an untyped error.

use opsorch_plugins::{init_tracing, serve};
use opsorch_proto::{RpcRequest, RpcResponse};
use serde_json::json;

fn handle(request: RpcRequest) -> RpcResponse {
    if let Some(fail) = request.config.get("failWith") {
        let message = fail["message"].as_str().unwrap_or("echo failure").to_string();
        return match fail["code"].as_str() {
            Some(code) if !code.is_empty() => RpcResponse::error(code, message),
            _ => RpcResponse::untyped_error(message),
        };
    }
    RpcResponse::ok(json!({
        "method": request.method,
        "config": request.config,
        "payload": request.payload,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("echoplugin=info");
    serve(handle).await?;
    Ok(())
}
