pub(crate) mod handlers;
pub(crate) mod helpers;
pub(crate) mod protocol;
pub(crate) mod tools;
pub(crate) mod transport;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::FutureExt;
use protocol::{JsonRpcRequest, JsonRpcResponse, Method, ToolCallParams};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{RpcError, RpcErrorKind};
use crate::ragflow::KnowledgeBackend;
use tools::ToolCall;
use transport::Incoming;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP Server implementation
///
/// Holds only read-only state, so one instance is shared by every
/// in-flight request.
pub(crate) struct McpServer {
    backend: Arc<dyn KnowledgeBackend>,
    config: ServerConfig,
}

impl McpServer {
    pub fn new(backend: Arc<dyn KnowledgeBackend>, config: ServerConfig) -> Self {
        Self { backend, config }
    }

    /// Handle incoming JSON-RPC request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        info!("Received: {}", request.method);
        let id = request.id.clone().unwrap_or(Value::Null);

        let method = match Method::parse(&request.method, request.params) {
            Ok(m) => m,
            Err(e) => return Some(JsonRpcResponse::failure(id, e)),
        };

        if method.is_notification() && request.id.is_none() {
            debug!("Notification {} needs no response", request.method);
            return None;
        }

        let result = match method {
            Method::Initialize => Ok(self.handle_initialize()),
            Method::ToolsList => Ok(json!({
                "tools": tools::tool_definitions(self.config.default_limit)
            })),
            Method::ToolsCall(params) => self.handle_tools_call(params).await,
            Method::Initialized | Method::Ping | Method::Shutdown | Method::Notification => {
                Ok(json!({}))
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    /// Handle initialize request
    fn handle_initialize(&self) -> Value {
        info!("Initializing...");
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.config.name,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    /// Handle tools/call request — dispatches to handler modules
    async fn handle_tools_call(&self, params: ToolCallParams) -> Result<Value, RpcError> {
        let call = ToolCall::parse(params)?;
        let backend = self.backend.as_ref();

        let result = match call {
            ToolCall::SearchDocs(args) => {
                handlers::search::handle(backend, args, self.config.default_limit).await
            }
            ToolCall::ListKbs => handlers::list_kbs::handle(backend).await,
            ToolCall::Chat(args) => handlers::chat::handle(backend, args).await,
        };

        match result {
            Ok(text) => Ok(helpers::text_content(text)),
            Err(e) => {
                warn!("Tool call failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Handle a request, turning a panic into an error response
    async fn respond(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone().unwrap_or(Value::Null);
        match AssertUnwindSafe(self.handle_request(request))
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(_) => {
                error!("Handler panicked for request {}", id);
                Some(JsonRpcResponse::failure(
                    id,
                    RpcError::new(RpcErrorKind::InternalError, "Internal error"),
                ))
            }
        }
    }
}

/// Run the dispatch loop until `input` ends.
///
/// Each request runs as its own task; responses are written in completion
/// order by a single writer task. At end of input the loop waits for
/// in-flight requests before returning. A failed write is fatal.
pub(crate) async fn serve<R, W>(server: Arc<McpServer>, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = transport::RequestReader::new(input);
    let (tx, mut writer) = transport::spawn_writer(output);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            next = reader.next_message() => {
                let request = match next.context("Failed to read input")? {
                    None => break,
                    Some(Incoming::Request(request)) => request,
                    Some(Incoming::Invalid { id, message }) => {
                        warn!("Rejected request {}: {}", id, message);
                        let error = RpcError::new(RpcErrorKind::InvalidRequest, message);
                        let _ = tx.send(JsonRpcResponse::failure(id, error));
                        continue;
                    }
                };
                let server = server.clone();
                let tx = tx.clone();
                in_flight.spawn(async move {
                    if let Some(response) = server.respond(request).await {
                        // Only fails once the writer is gone, which the loop reports
                        let _ = tx.send(response);
                    }
                });
            }
            Some(joined) = in_flight.join_next() => {
                if let Err(e) = joined {
                    error!("Request task failed: {}", e);
                }
            }
            written = &mut writer => {
                written.context("Response writer stopped")??;
                anyhow::bail!("Response writer stopped unexpectedly");
            }
        }
    }

    debug!("Input closed, waiting for {} request(s)", in_flight.len());
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Request task failed: {}", e);
        }
    }

    drop(tx);
    writer
        .await
        .context("Response writer stopped")?
        .context("Failed to write response")?;
    Ok(())
}

/// Serve on stdin/stdout until end of input or a termination signal.
/// A signal exits the process immediately without draining requests.
pub(crate) async fn run_stdio(server: Arc<McpServer>) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = serve(server, stdin, stdout) => result,
        signal = shutdown_signal() => {
            signal.context("Failed to install signal handler")?;
            info!("Shutting down...");
            std::process::exit(0);
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
