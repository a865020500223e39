//! Genie MCP Client - JSON-RPC over streamable HTTP
//!
//! Uses reqwest to talk to the managed MCP endpoint of a Genie space. Each
//! operation runs in its own short session (`initialize` →
//! `notifications/initialized` → request), so the client carries no
//! per-session state between calls.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

use super::credentials::WorkspaceCredentials;
use super::models::ToolInfo;
use super::transport::{ContentFragment, McpTransport, TransportError};

pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";
const SESSION_HEADER: &str = "mcp-session-id";
const EVENT_STREAM: &str = "text/event-stream";

/// MCP HTTP transport bound to one Genie space URL
pub struct HttpMcpTransport {
    http_client: Client,
    server_url: String,
    credentials: WorkspaceCredentials,
    timeout_secs: u64,
    closed: AtomicBool,
}

impl HttpMcpTransport {
    pub fn new(
        server_url: impl Into<String>,
        credentials: WorkspaceCredentials,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            server_url: server_url.into(),
            credentials,
            timeout_secs,
            closed: AtomicBool::new(false),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            TransportError::Request(format!("Connection failed: {}", e))
        } else {
            TransportError::Request(e.to_string())
        }
    }

    async fn post(
        &self,
        session: Option<&str>,
        body: &Value,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self
            .http_client
            .post(&self.server_url)
            .bearer_auth(self.credentials.token())
            .header(ACCEPT, "application/json, text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(session_id) = session {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Http { status, body });
        }

        Ok(response)
    }

    /// Send one JSON-RPC request; returns the `result` member and any session id
    async fn rpc(
        &self,
        session: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<(Value, Option<String>), TransportError> {
        let id = Uuid::new_v4().to_string();
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        tracing::debug!("MCP request {} ({}) -> {}", method, id, self.server_url);

        let response = self.post(session, &body).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(EVENT_STREAM));

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        let message = if is_stream {
            find_event_stream_message(&text, &id)?
        } else {
            serde_json::from_str::<JsonRpcResponse>(&text)
                .map_err(|e| TransportError::InvalidResponse(e.to_string()))?
        };

        Ok((message.into_result()?, session_id))
    }

    async fn notify(&self, session: Option<&str>, method: &str) -> Result<(), TransportError> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        self.post(session, &body).await?;
        Ok(())
    }

    async fn open_session(&self) -> Result<Option<String>, TransportError> {
        self.ensure_open()?;

        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        });
        let (_, session_id) = self.rpc(None, "initialize", params).await?;
        self.notify(session_id.as_deref(), "notifications/initialized").await?;

        Ok(session_id)
    }

    // Best effort; servers expire abandoned sessions on their own
    async fn end_session(&self, session: Option<String>) {
        let Some(session_id) = session else { return };
        let result = self
            .http_client
            .delete(&self.server_url)
            .bearer_auth(self.credentials.token())
            .header(SESSION_HEADER, &session_id)
            .send()
            .await;
        if let Err(e) = result {
            tracing::debug!("Failed to end MCP session {}: {}", session_id, e);
        }
    }
}

#[async_trait]
impl McpTransport for HttpMcpTransport {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, TransportError> {
        let session = self.open_session().await?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let outcome = loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = match self.rpc(session.as_deref(), "tools/list", params).await {
                Ok((result, _)) => result,
                Err(e) => break Err(e),
            };
            let page: ListToolsResult = match serde_json::from_value(result) {
                Ok(page) => page,
                Err(e) => break Err(TransportError::InvalidResponse(e.to_string())),
            };
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break Ok(()),
            }
        };

        self.end_session(session).await;
        outcome.map(|_| tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ContentFragment>, TransportError> {
        let session = self.open_session().await?;

        let params = json!({ "name": name, "arguments": arguments });
        let outcome = self.rpc(session.as_deref(), "tools/call", params).await;
        self.end_session(session).await;

        let result: CallToolResult = serde_json::from_value(outcome?.0)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        if result.is_error {
            let text: String = result.content.iter().filter_map(|c| c.as_text()).collect();
            return Err(TransportError::Tool(text));
        }

        Ok(result.content)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

// ============================================================================
// JSON-RPC / MCP wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn into_result(self) -> Result<Value, TransportError> {
        if let Some(error) = self.error {
            return Err(TransportError::Rpc { code: error.code, message: error.message });
        }
        self.result
            .ok_or_else(|| TransportError::InvalidResponse("missing result".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<ToolInfo>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolResult {
    #[serde(default)]
    content: Vec<ContentFragment>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

/// Pick the JSON-RPC response with the given id out of an SSE body
fn find_event_stream_message(body: &str, id: &str) -> Result<JsonRpcResponse, TransportError> {
    let mut data = String::new();
    let mut events = Vec::new();

    for line in body.lines() {
        if line.trim().is_empty() {
            if !data.is_empty() {
                events.push(std::mem::take(&mut data));
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if !data.is_empty() {
        events.push(data);
    }

    events
        .iter()
        .filter_map(|event| serde_json::from_str::<JsonRpcResponse>(event).ok())
        .find(|msg| msg.id.as_str() == Some(id))
        .ok_or_else(|| {
            TransportError::InvalidResponse(format!("no response for request {} in event stream", id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
    };

    /// Minimal MCP server: JSON for initialize/tools/list, SSE for tools/call
    async fn fake_mcp(
        Path(space): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        if space == "forbidden_space" {
            return (StatusCode::FORBIDDEN, "PERMISSION_DENIED").into_response();
        }
        if space == "missing_space" {
            return (StatusCode::NOT_FOUND, "Genie space not found").into_response();
        }
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer secret") {
            return (StatusCode::UNAUTHORIZED, "bad token").into_response();
        }

        let method = body["method"].as_str().unwrap_or_default().to_string();
        let id = body["id"].clone();
        let has_session = headers.get(SESSION_HEADER).is_some();

        match method.as_str() {
            "initialize" => {
                let payload = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": { "protocolVersion": MCP_PROTOCOL_VERSION, "capabilities": {} }
                });
                ([(SESSION_HEADER, "session-1")], Json(payload)).into_response()
            },
            "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
            _ if !has_session => (StatusCode::BAD_REQUEST, "missing session").into_response(),
            "tools/list" if body["params"]["cursor"].is_null() => Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": [{ "name": "query", "description": "Ask a question", "inputSchema": {} }],
                    "nextCursor": "page-2"
                }
            }))
            .into_response(),
            "tools/list" => Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "tools": [{ "name": "poll_response" }] }
            }))
            .into_response(),
            "tools/call" if body["params"]["arguments"]["question"] == "explode" => Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "isError": true, "content": [{ "type": "text", "text": "space offline" }] }
            }))
            .into_response(),
            "tools/call" => {
                let message = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "content": [
                            { "type": "text", "text": "A" },
                            { "type": "image", "data": "...", "mimeType": "image/png" },
                            { "type": "text", "text": "B" }
                        ]
                    }
                });
                let body = format!(
                    "event: message\ndata: {{\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}}\n\nevent: message\ndata: {}\n\n",
                    message
                );
                ([(CONTENT_TYPE.as_str(), EVENT_STREAM)], body).into_response()
            },
            _ => Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" }
            }))
            .into_response(),
        }
    }

    async fn spawn_server() -> String {
        let app = Router::new()
            .route("/api/2.0/mcp/genie/:space", post(fake_mcp).delete(|| async { StatusCode::OK }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn transport(host: &str, space: &str, token: &str) -> HttpMcpTransport {
        let creds = WorkspaceCredentials::new(host, token);
        HttpMcpTransport::new(creds.genie_url(space), creds, 5).unwrap()
    }

    #[tokio::test]
    async fn test_list_tools_follows_cursor() {
        let host = spawn_server().await;
        let t = transport(&host, "space", "secret");

        let tools = t.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["query", "poll_response"]);
        assert_eq!(tools[0].description, "Ask a question");
    }

    #[tokio::test]
    async fn test_call_tool_reads_event_stream() {
        let host = spawn_server().await;
        let t = transport(&host, "space", "secret");

        let mut args = Map::new();
        args.insert("question".into(), json!("how slow?"));
        let content = t.call_tool("query", args).await.unwrap();

        assert_eq!(content.len(), 3);
        assert_eq!(content[0].as_text(), Some("A"));
        assert_eq!(content[1], ContentFragment::Other);
        assert_eq!(content[2].as_text(), Some("B"));
    }

    #[tokio::test]
    async fn test_tool_error_result() {
        let host = spawn_server().await;
        let t = transport(&host, "space", "secret");

        let mut args = Map::new();
        args.insert("question".into(), json!("explode"));
        let err = t.call_tool("query", args).await.unwrap_err();
        assert!(matches!(err, TransportError::Tool(_)));
        assert_eq!(err.to_string(), "space offline");
    }

    #[tokio::test]
    async fn test_http_errors_lead_with_status_code() {
        let host = spawn_server().await;

        let err = transport(&host, "forbidden_space", "secret").list_tools().await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert!(err.to_string().contains("403"));

        let err = transport(&host, "missing_space", "secret").list_tools().await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("not found"));

        let err = transport(&host, "space", "wrong").list_tools().await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_calls() {
        let host = spawn_server().await;
        let t = transport(&host, "space", "secret");
        t.close().await;

        assert!(matches!(t.list_tools().await, Err(TransportError::Closed)));
    }

    #[test]
    fn test_event_stream_without_matching_id() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":\"other\",\"result\":{}}\n\n";
        assert!(find_event_stream_message(body, "mine").is_err());

        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":\"mine\",\"error\":{\"code\":-32000,\"message\":\"beta feature not enabled\"}}\n";
        let err = find_event_stream_message(body, "mine").unwrap().into_result().unwrap_err();
        assert_eq!(err.to_string(), "MCP error -32000: beta feature not enabled");
    }
}
