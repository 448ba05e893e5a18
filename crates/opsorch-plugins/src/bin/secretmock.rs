//! Secret plugin keeping values in process memory.

use opsorch_plugins::{init_tracing, payload, serve, unknown_method};
use opsorch_proto::{RpcRequest, RpcResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Deserialize)]
struct GetSecret {
    key: String,
}

#[derive(Deserialize)]
struct PutSecret {
    key: String,
    value: String,
}

fn handle(store: &mut HashMap<String, String>, request: RpcRequest) -> RpcResponse {
    match request.method.as_str() {
        "secret.get" => match payload::<GetSecret>(&request) {
            Ok(get) => match store.get(&get.key) {
                Some(value) => RpcResponse::ok(Value::String(value.clone())),
                None => RpcResponse::untyped_error(format!("{} not found", get.key)),
            },
            Err(response) => response,
        },
        "secret.put" => match payload::<PutSecret>(&request) {
            Ok(put) => {
                store.insert(put.key, put.value);
                RpcResponse::ok(json!({"status": "ok"}))
            }
            Err(response) => response,
        },
        _ => unknown_method(&request),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("secretmock=info");
    let mut store = HashMap::new();
    serve(|request| handle(&mut store, request)).await?;
    Ok(())
}
