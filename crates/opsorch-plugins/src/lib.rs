//! Request loop shared by the bundled plugin executables.
//!
//! A plugin reads [`RpcRequest`] values from stdin and answers each with
//! exactly one [`RpcResponse`] on stdout. Diagnostics go to stderr so they
//! never interleave with responses.

use opsorch_proto::{write_value, CodecError, JsonStreamReader, RpcRequest, RpcResponse};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Config key that delays every response, used to exercise slow plugins.
pub const DELAY_CONFIG_KEY: &str = "delayMs";

/// Route diagnostics to stderr; stdout carries the protocol.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Serve requests from stdin until it closes.
pub async fn serve<F>(handler: F) -> Result<(), CodecError>
where
    F: FnMut(RpcRequest) -> RpcResponse,
{
    serve_io(tokio::io::stdin(), tokio::io::stdout(), handler).await
}

pub async fn serve_io<R, W, F>(input: R, mut output: W, mut handler: F) -> Result<(), CodecError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(RpcRequest) -> RpcResponse,
{
    let mut reader = JsonStreamReader::new(input);
    loop {
        let request = match reader.next::<RpcRequest>().await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(CodecError::Decode(message)) => {
                warn!(%message, "Rejected malformed request");
                write_value(&mut output, &RpcResponse::untyped_error(message)).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        debug!(method = %request.method, "Handling request");
        if let Some(ms) = request.config.get(DELAY_CONFIG_KEY).and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        let response = handler(request);
        write_value(&mut output, &response).await?;
    }
}

/// Decode a request payload into `T`, answering with an untyped error on failure.
pub fn payload<T: serde::de::DeserializeOwned>(request: &RpcRequest) -> Result<T, RpcResponse> {
    serde_json::from_value(request.payload.clone())
        .map_err(|e| RpcResponse::untyped_error(e.to_string()))
}

pub fn unknown_method(request: &RpcRequest) -> RpcResponse {
    RpcResponse::untyped_error(format!("unknown method {}", request.method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_serve_answers_each_request_in_order() {
        let input = tokio_test::io::Builder::new()
            .read(b"{\"method\":\"a\",\"config\":{},\"payload\":1}\n")
            .read(b"{\"method\":\"b\",\"config\":{},\"payload\":2}\n")
            .build();
        let (writer, mut collected) = tokio::io::duplex(1024);

        serve_io(input, writer, |request| {
            RpcResponse::ok(json!({"method": request.method, "payload": request.payload}))
        })
        .await
        .unwrap();

        let mut out = String::new();
        collected.read_to_string(&mut out).await.unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                json!({"result": {"method": "a", "payload": 1}}),
                json!({"result": {"method": "b", "payload": 2}}),
            ]
        );
    }

    #[tokio::test]
    async fn test_serve_reports_request_of_wrong_shape_and_continues() {
        let input = tokio_test::io::Builder::new()
            .read(b"[1]\n{\"method\":\"ok\"}\n")
            .build();
        let (writer, mut collected) = tokio::io::duplex(1024);

        serve_io(input, writer, |_| RpcResponse::empty())
            .await
            .unwrap();

        let mut out = String::new();
        collected.read_to_string(&mut out).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("{\"error\":"));
        assert_eq!(lines[1], "{}");
    }

    #[test]
    fn test_payload_decode_failure_is_untyped_error() {
        #[derive(serde::Deserialize)]
        struct Keyed {
            #[allow(dead_code)]
            key: String,
        }

        let request = RpcRequest::new("secret.get", Default::default(), json!({"nokey": 1}));
        let response = payload::<Keyed>(&request).err().unwrap();
        assert!(matches!(response.error, Some(opsorch_proto::RpcError::Message(_))));
    }
}
