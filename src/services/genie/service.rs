//! Genie Service
//!
//! Owns the connection handle to one Genie space and exposes the canned
//! analyses on top of it. A service without a handle is valid: every
//! operation then short-circuits with `GenieError::NotConnected`.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::client::HttpMcpTransport;
use super::credentials::WorkspaceCredentials;
use super::diagnostics;
use super::error::{GenieError, GenieResult};
use super::models::{ConnectionStatus, QueryDescriptor};
use super::prompts;
use super::transport::McpTransport;
use crate::config::GenieConfig;

/// Name of the remote tool answering natural-language questions
pub const QUERY_TOOL: &str = "query";

pub struct GenieService {
    space_id: String,
    transport: Option<Arc<dyn McpTransport>>,
    closed: AtomicBool,
}

impl GenieService {
    /// Build the connection from ambient credentials; never fails
    ///
    /// Any discovery or client construction error is logged and yields a
    /// disconnected service.
    pub fn connect(config: &GenieConfig) -> Self {
        let space_id = config.space_id.clone();

        let transport = WorkspaceCredentials::discover(config)
            .map_err(|e| e.to_string())
            .and_then(|creds| {
                let url = creds.genie_url(&space_id);
                HttpMcpTransport::new(url, creds, config.request_timeout_secs)
                    .map_err(|e| e.to_string())
            });

        match transport {
            Ok(transport) => {
                tracing::info!("Connected to Genie space: {}", space_id);
                tracing::info!("MCP URL: {}", transport.server_url());
                Self::with_transport(space_id, Arc::new(transport))
            },
            Err(e) => {
                tracing::error!("MCP connection failed for Genie space {}: {}", space_id, e);
                Self::disconnected(space_id)
            },
        }
    }

    pub fn with_transport(space_id: impl Into<String>, transport: Arc<dyn McpTransport>) -> Self {
        Self { space_id: space_id.into(), transport: Some(transport), closed: AtomicBool::new(false) }
    }

    pub fn disconnected(space_id: impl Into<String>) -> Self {
        Self { space_id: space_id.into(), transport: None, closed: AtomicBool::new(false) }
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn is_connected(&self) -> bool {
        self.transport().is_some()
    }

    fn transport(&self) -> Option<&Arc<dyn McpTransport>> {
        if self.closed.load(Ordering::Acquire) {
            None
        } else {
            self.transport.as_ref()
        }
    }

    /// Release the connection; the service reports "not connected" afterwards
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(transport) = &self.transport {
            transport.close().await;
            tracing::info!("MCP connection to Genie space {} closed", self.space_id);
        }
    }

    // ========================================
    // Diagnostics
    // ========================================

    /// Probe the connection by enumerating the remote tools
    pub async fn test_connection(&self) -> ConnectionStatus {
        let Some(transport) = self.transport() else {
            return diagnostics::not_initialized();
        };

        match transport.list_tools().await {
            Ok(tools) => {
                tracing::info!("Genie space {} exposes {} tools", self.space_id, tools.len());
                ConnectionStatus::connected(tools)
            },
            Err(e) => {
                let status = diagnostics::probe_failed(&self.space_id, &e.to_string());
                tracing::warn!(
                    "Connection test for Genie space {} failed ({:?}): {}",
                    self.space_id,
                    status.error_type,
                    e
                );
                status
            },
        }
    }

    // ========================================
    // Dispatch
    // ========================================

    /// Send a question and join the text fragments of the answer in order
    pub async fn query_genie_space(&self, question: &str) -> GenieResult<String> {
        let transport = self.transport().ok_or(GenieError::NotConnected)?;

        tracing::info!("Querying Genie space {}", self.space_id);
        tracing::debug!("Genie question: {}", question);

        let mut arguments = Map::new();
        arguments.insert("question".to_string(), Value::String(question.to_string()));

        let fragments = transport
            .call_tool(QUERY_TOOL, arguments)
            .await
            .map_err(|e| GenieError::query_failed(e.to_string()))?;

        let answer: String = fragments.iter().filter_map(|f| f.as_text()).collect();
        tracing::debug!("Genie answered with {} bytes", answer.len());

        Ok(answer)
    }

    // ========================================
    // Canned analyses
    // ========================================

    /// Slowest queries in the window
    pub async fn get_worst_queries(&self, descriptor: &QueryDescriptor) -> GenieResult<String> {
        self.query_genie_space(&prompts::worst_queries(descriptor)).await
    }

    /// Most expensive queries by DBU consumption
    pub async fn get_expensive_queries(&self, descriptor: &QueryDescriptor) -> GenieResult<String> {
        self.query_genie_space(&prompts::expensive_queries(descriptor)).await
    }

    pub async fn get_query_details(&self, query_id: &str) -> GenieResult<String> {
        self.query_genie_space(&prompts::query_details(query_id)).await
    }

    /// Systemic issues across the window (see `prompts::PATTERN_LOOKBACK_HOURS`)
    pub async fn analyze_query_patterns(&self, hours_back: u32) -> GenieResult<String> {
        self.query_genie_space(&prompts::query_patterns(hours_back)).await
    }
}
