use opsorch_core::{CoreError, ProviderConfig, Result};
use opsorch_proto::{write_value, JsonStreamReader, RpcRequest, RpcResponse};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Long-lived child process reached through the stream-of-JSON protocol.
///
/// The process starts on the first call and is reused afterwards. Calls are
/// serialized by one lock held for the whole write-then-read round trip.
/// The round trip runs in its own task, so dropping a caller's future never
/// leaves a half-written request or an unread response on the pipes. A
/// process that dies is not restarted; later calls fail with a transport
/// error.
#[derive(Clone)]
pub struct PluginRunner {
    path: PathBuf,
    config: ProviderConfig,
    process: Arc<Mutex<Option<PluginProcess>>>,
}

struct PluginProcess {
    child: Child,
    stdin: ChildStdin,
    reader: JsonStreamReader<ChildStdout>,
}

impl PluginProcess {
    fn spawn(path: &Path) -> Result<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                CoreError::PluginTransport(format!("failed to start {}: {}", path.display(), e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CoreError::PluginTransport("plugin stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::PluginTransport("plugin stdout unavailable".to_string()))?;

        info!(path = %path.display(), pid = ?child.id(), "Started plugin process");

        Ok(Self {
            child,
            stdin,
            reader: JsonStreamReader::new(stdout),
        })
    }

    async fn round_trip(&mut self, request: &RpcRequest) -> Result<RpcResponse> {
        write_value(&mut self.stdin, request)
            .await
            .map_err(|e| CoreError::PluginTransport(format!("write {}: {}", request.method, e)))?;

        match self.reader.next::<RpcResponse>().await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(CoreError::PluginTransport(format!(
                "plugin closed its output before answering {}",
                request.method
            ))),
            Err(e) => Err(CoreError::PluginTransport(format!(
                "read {}: {}",
                request.method, e
            ))),
        }
    }
}

async fn exchange(
    process: Arc<Mutex<Option<PluginProcess>>>,
    path: PathBuf,
    request: RpcRequest,
) -> Result<RpcResponse> {
    let mut guard = process.lock().await;
    if guard.is_none() {
        *guard = Some(PluginProcess::spawn(&path)?);
    }
    match guard.as_mut() {
        Some(running) => running.round_trip(&request).await,
        None => Err(CoreError::PluginTransport("plugin not running".to_string())),
    }
}

impl PluginRunner {
    pub fn new(path: impl Into<PathBuf>, config: ProviderConfig) -> Self {
        Self {
            path: path.into(),
            config,
            process: Arc::new(Mutex::new(None)),
        }
    }

    /// Send one request and wait for its response.
    ///
    /// A plugin error with a code becomes [`CoreError::Invocation`]; one
    /// without a code becomes [`CoreError::Untyped`].
    pub async fn call(&self, method: &str, payload: Value) -> Result<Option<Value>> {
        let request = RpcRequest::new(method, self.config.clone(), payload);
        let process = self.process.clone();
        let path = self.path.clone();

        debug!(path = %path.display(), method = %request.method, "Calling plugin");

        let round_trip = tokio::spawn(exchange(process, path, request));

        let response = round_trip.await.map_err(|e| {
            CoreError::PluginTransport(format!("plugin call for {} aborted: {}", method, e))
        })?;

        match response {
            Ok(response) => response.into_result(),
            Err(err) => {
                warn!(path = %self.path.display(), %method, error = %err, "Plugin call failed");
                Err(err)
            }
        }
    }

    /// Process id of the running plugin, `None` before the first call.
    pub async fn pid(&self) -> Option<u32> {
        self.process
            .lock()
            .await
            .as_ref()
            .and_then(|running| running.child.id())
    }
}
