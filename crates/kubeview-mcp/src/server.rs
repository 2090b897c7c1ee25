//! Stdio MCP server implementation.
//!
//! Requests arrive as one JSON-RPC message per line on stdin and responses
//! are written the same way on stdout. Each request runs on its own task so
//! a slow cluster call never blocks `ping` or other tool calls; a single
//! writer task owns the output stream so lines never interleave.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{
    debug,
    error,
    info,
    warn,
};
use tokio::io::{
    AsyncBufReadExt,
    AsyncRead,
    AsyncWrite,
    AsyncWriteExt,
    BufReader,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::{
    CallToolParams,
    CancelledParams,
    InitializeParams,
    InitializeResult,
    JSONRPC_VERSION,
    JsonRpcRequest,
    JsonRpcResponse,
    ListToolsResult,
    MCP_PROTOCOL_VERSION,
    RequestId,
    SERVER_NAME,
    SERVER_VERSION,
    ServerCapabilities,
    ServerInfo,
    ToolsCapability,
    error_codes,
};
use crate::tools::ToolRegistry;

/// Shared state of a running server.
pub struct ServerState {
    registry: ToolRegistry,
    in_flight: DashMap<RequestId, CancellationToken>,
}

impl ServerState {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            in_flight: DashMap::new(),
        }
    }

    /// Registers a cancellation token for a request id. An id that is
    /// still in flight keeps its first token and `false` is returned.
    fn track(&self, id: RequestId, token: CancellationToken) -> bool {
        match self.in_flight.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(token);
                true
            }
        }
    }

    fn untrack(&self, id: &RequestId) {
        self.in_flight.remove(id);
    }

    /// Cancels an in-flight request. Returns false if the id is unknown
    /// or already finished.
    pub fn cancel(&self, id: &RequestId) -> bool {
        match self.in_flight.remove(id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

pub struct McpServer {
    state: Arc<ServerState>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            state: Arc::new(ServerState::new(registry)),
        }
    }

    /// Serves on the process's stdin/stdout until EOF or `shutdown`.
    pub async fn serve_stdio(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout(), shutdown)
            .await
    }

    pub async fn serve<R, W>(
        self, reader: R, writer: W, shutdown: CancellationToken,
    ) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        info!("MCP server listening on stdio");

        loop {
            buf.clear();
            let read = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => read?,
            };

            if read == 0 {
                debug!("Input closed");
                break;
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("Received non UTF-8 input: {e}");
                    let _ = tx.send(JsonRpcResponse::error(
                        None,
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ));
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Failed to parse request: {e}");
                    let _ = tx.send(JsonRpcResponse::error(
                        None,
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ));
                    continue;
                }
            };

            if request.method == "notifications/cancelled" {
                handle_cancelled(request, &self.state);
                continue;
            }

            let token = shutdown.child_token();
            let tracked = match request.id.clone() {
                Some(id) => self.state.track(id, token.clone()),
                None => false,
            };

            let state = Arc::clone(&self.state);
            let tx = tx.clone();
            tokio::spawn(async move {
                let id = request.id.clone();
                let response = handle_json_rpc_request(request, &state, &token).await;
                if tracked && let Some(id) = &id {
                    state.untrack(id);
                }
                if let Some(response) = response {
                    let _ = tx.send(response);
                }
            });
        }

        // Pending requests hold their own senders; the writer drains them.
        drop(tx);
        writer_task.await??;

        info!("MCP server shutdown");
        Ok(())
    }
}

async fn write_responses<W>(
    mut writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let json = serde_json::to_string(&response)?;
        debug!("Sending response: {json}");
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

fn handle_cancelled(request: JsonRpcRequest, state: &ServerState) {
    let params: Option<CancelledParams> = request
        .params
        .and_then(|p| serde_json::from_value(p).ok());

    match params {
        Some(params) => {
            if state.cancel(&params.request_id) {
                info!(
                    "Cancelled request {:?} ({})",
                    params.request_id,
                    params.reason.as_deref().unwrap_or("no reason given")
                );
            } else {
                debug!("Cancellation for unknown request {:?}", params.request_id);
            }
        }
        None => warn!("Ignoring malformed cancellation notification"),
    }
}

/// Handle a JSON-RPC message. Notifications never produce a response.
async fn handle_json_rpc_request(
    request: JsonRpcRequest, state: &ServerState, cancel: &CancellationToken,
) -> Option<JsonRpcResponse> {
    let method = request.method.as_str();
    debug!("Handling method: {method}");

    if request.is_notification() {
        match method {
            "notifications/initialized" | "initialized" => {
                debug!("Client initialized notification received")
            }
            _ => debug!("Ignoring notification: {method}"),
        }
        return None;
    }

    if request.jsonrpc != JSONRPC_VERSION {
        return Some(JsonRpcResponse::error(
            request.id,
            error_codes::INVALID_REQUEST,
            format!("Unsupported jsonrpc version: {}", request.jsonrpc),
        ));
    }

    let response = match method {
        "initialize" => handle_initialize(request),
        "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
        "tools/list" => handle_list_tools(request, state),
        "tools/call" => handle_call_tool(request, state, cancel).await,
        _ => {
            warn!("Unknown method: {method}");
            JsonRpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )
        }
    };
    Some(response)
}

/// Handle initialize request
fn handle_initialize(request: JsonRpcRequest) -> JsonRpcResponse {
    let params: InitializeParams = match request.params {
        Some(p) => match serde_json::from_value(p) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid initialize params: {e}"),
                );
            }
        },
        None => {
            return JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_PARAMS,
                "Missing initialize params",
            );
        }
    };

    info!(
        "Client connecting: {} (protocol: {})",
        params.client_info.name, params.protocol_version
    );

    let result = InitializeResult {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        },
    };

    to_response(request.id, &result)
}

/// Handle tools/list request
fn handle_list_tools(request: JsonRpcRequest, state: &ServerState) -> JsonRpcResponse {
    let result = ListToolsResult {
        tools: state.registry.definitions(),
        next_cursor: None,
    };

    to_response(request.id, &result)
}

/// Handle tools/call request
async fn handle_call_tool(
    request: JsonRpcRequest, state: &ServerState, cancel: &CancellationToken,
) -> JsonRpcResponse {
    let params: CallToolParams = match request.params {
        Some(p) => match serde_json::from_value(p) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid call tool params: {e}"),
                );
            }
        },
        None => {
            return JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_PARAMS,
                "Missing tool call params",
            );
        }
    };

    debug!(
        "Calling tool: {} with args: {:?}",
        params.name, params.arguments
    );

    match state
        .registry
        .call(&params.name, params.arguments, cancel)
        .await
    {
        Ok(result) => to_response(request.id, &result),
        Err(e) => {
            error!("Tool {} failed: {e}", params.name);
            JsonRpcResponse::error(request.id, e.code(), e.to_string())
        }
    }
}

fn to_response<T: serde::Serialize>(id: Option<RequestId>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            error_codes::INTERNAL_ERROR,
            format!("Failed to serialize result: {e}"),
        ),
    }
}
