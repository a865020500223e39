//! MCP transport seam
//!
//! The Genie service only needs three remote operations: enumerate the
//! available tools, invoke a named tool, and release the session. Everything
//! protocol-specific lives behind this trait so the service can be driven by
//! the HTTP client in production and by scripted doubles in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::models::ToolInfo;

/// One content block of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentFragment {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ContentFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Other => None,
        }
    }
}

/// Transport-level failures
///
/// The Display text is what connection diagnostics classify, so HTTP
/// failures always lead with the numeric status code.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Http { status: reqwest::StatusCode, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("MCP error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Failure reported by the remote tool itself, passed through verbatim
    #[error("{0}")]
    Tool(String),

    #[error("Invalid MCP response: {0}")]
    InvalidResponse(String),

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// HTTP status code, when the failure came from a non-2xx response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(status.as_u16()),
            _ => None,
        }
    }
}

/// Remote Genie space operations
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Enumerate the tools the remote server exposes
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, TransportError>;

    /// Invoke a named tool and return its content fragments in order
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ContentFragment>, TransportError>;

    /// Release any resources; later calls fail with `TransportError::Closed`
    async fn close(&self) {}
}
