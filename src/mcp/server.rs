//! MCP Stdio Server
//!
//! Implements the stdio transport for MCP: reads newline-delimited JSON-RPC
//! messages from stdin and writes responses to stdout. Requests run
//! concurrently; a single writer task owns stdout so response lines never
//! interleave.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::mcp::error::McpError;
use crate::mcp::format::format_unexpected_error;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{JsonRpcId, JsonRpcRequest, JsonRpcResponse};

/// Longest accepted input line, in bytes
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

const WRITE_QUEUE_DEPTH: usize = 256;

enum Frame {
    Line(String),
    TooLong,
    Eof,
}

pub struct McpStdioServer {
    handler: Arc<McpHandler>,
}

impl McpStdioServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { handler: Arc::new(McpHandler::new(ctx)) }
    }

    /// Serve stdin/stdout until EOF or Ctrl-C.
    pub async fn run(&self) -> anyhow::Result<()> {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("Ctrl-C received");
        };
        self.serve(tokio::io::stdin(), tokio::io::stdout(), shutdown).await
    }

    /// Serve an arbitrary reader/writer pair. The gateway session is closed on return.
    pub async fn serve<R, W, S>(&self, input: R, output: W, shutdown: S) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        info!("Starting MCP stdio server");

        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(WRITE_QUEUE_DEPTH);
        let writer = tokio::spawn(write_responses(output, rx));
        let mut in_flight = JoinSet::new();
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();

        tokio::pin!(shutdown);
        let interrupted = loop {
            let frame = tokio::select! {
                _ = &mut shutdown => break true,
                frame = read_frame(&mut reader, &mut buf) => frame?,
            };

            match frame {
                Frame::Eof => break false,
                Frame::TooLong => {
                    warn!(max_bytes = MAX_LINE_BYTES, "Input line exceeds maximum length");
                    let error = McpError::InvalidRequest(format!(
                        "message exceeds {} bytes",
                        MAX_LINE_BYTES
                    ));
                    send(&tx, JsonRpcResponse::failure(None, error.into())).await;
                }
                Frame::Line(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!(bytes = line.len(), "Received input line");
                    match parse_request(line) {
                        Ok(request) => {
                            let handler = self.handler.clone();
                            let tx = tx.clone();
                            in_flight.spawn(async move {
                                if let Some(response) = handle_isolated(handler, request).await {
                                    send(&tx, response).await;
                                }
                            });
                        }
                        Err(response) => send(&tx, *response).await,
                    }
                }
            }

            // Reap finished tasks so the set does not grow without bound.
            while in_flight.try_join_next().is_some() {}
        };

        if interrupted {
            info!(pending = in_flight.len(), "Shutting down; abandoning in-flight requests");
            in_flight.shutdown().await;
        } else {
            info!("MCP stdio server shutting down (EOF received)");
            while in_flight.join_next().await.is_some() {}
        }

        drop(tx);
        match writer.await {
            Ok(result) => result?,
            Err(e) => error!(error = %e, "Response writer task failed"),
        }

        self.handler.context().client.close();
        Ok(())
    }
}

/// Read one line of at most [`MAX_LINE_BYTES`]; longer lines are discarded whole.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader).take(MAX_LINE_BYTES as u64 + 1).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }
    if buf.len() > MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
        loop {
            buf.clear();
            let read = (&mut *reader).take(64 * 1024).read_until(b'\n', buf).await?;
            if read == 0 || buf.last() == Some(&b'\n') {
                break;
            }
        }
        return Ok(Frame::TooLong);
    }
    Ok(Frame::Line(String::from_utf8_lossy(buf).into_owned()))
}

fn parse_request(line: &str) -> Result<JsonRpcRequest, Box<JsonRpcResponse>> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "Failed to parse JSON-RPC request");
        Box::new(JsonRpcResponse::failure(None, McpError::ParseError(e.to_string()).into()))
    })?;

    if value.is_array() {
        return Err(Box::new(JsonRpcResponse::failure(
            None,
            McpError::InvalidRequest("batch requests are not supported".into()).into(),
        )));
    }

    let id = value.get("id").cloned().and_then(|id| serde_json::from_value::<JsonRpcId>(id).ok());
    serde_json::from_value(value).map_err(|e| {
        Box::new(JsonRpcResponse::failure(id, McpError::InvalidRequest(e.to_string()).into()))
    })
}

/// Run one request on its own task so a panic becomes an error response.
async fn handle_isolated(
    handler: Arc<McpHandler>,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let id = request.id.clone();
    let tool_name = (request.method == "tools/call")
        .then(|| request.params.get("name").and_then(Value::as_str).map(str::to_string))
        .flatten();
    let notification = request.is_notification();

    match tokio::spawn(async move { handler.handle_request(request).await }).await {
        Ok(response) => response,
        Err(e) if notification => {
            error!(error = %e, "Notification handler failed");
            None
        }
        Err(e) => Some(match tool_name {
            Some(tool) => {
                let result = format_unexpected_error(&tool, &e, false);
                match serde_json::to_value(&result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(se) => JsonRpcResponse::failure(id, McpError::SerializationError(se).into()),
                }
            }
            None => JsonRpcResponse::failure(id, McpError::InternalError(e.to_string()).into()),
        }),
    }
}

async fn send(tx: &mpsc::Sender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).await.is_err() {
        warn!("Response writer closed; dropping response");
    }
}

async fn write_responses<W>(
    mut output: W,
    mut rx: mpsc::Receiver<JsonRpcResponse>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let json = serde_json::to_string(&response)?;
        debug!(bytes = json.len(), "Writing response");

        output.write_all(json.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}
