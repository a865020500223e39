//! Genie Data Models
//!
//! Connection status, query results, analysis reports and the typed view of
//! the query records returned by the Genie space.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::error::{ErrorKind, GenieError, GenieResult};

/// Genie space targeted when nothing else is configured
pub const DEFAULT_GENIE_SPACE_ID: &str = "system_table_mcp_test";

/// Label attached to every composite analysis report
pub const HYBRID_METHODOLOGY: &str = "Hybrid: Rule-based identification + LLM optimization analysis";

// ============================================================================
// Connection Status
// ============================================================================

/// Classified connection failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionErrorType {
    InitializationFailed,
    GenieSpaceNotFound,
    AccessDenied,
    AuthenticationFailed,
    McpNotEnabled,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Success,
    Error,
}

/// A remote capability exposed by the Genie space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Result of a connection diagnostic run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConnectionStatus {
    pub success: bool,
    pub status: StatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ConnectionErrorType>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub troubleshooting: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolInfo>,
}

impl ConnectionStatus {
    pub fn connected(tools: Vec<ToolInfo>) -> Self {
        Self {
            success: true,
            status: StatusKind::Success,
            error_type: None,
            message: format!("Connected! Found {} tools", tools.len()),
            troubleshooting: vec![],
            tools,
        }
    }

    pub fn failed(
        error_type: ConnectionErrorType,
        message: impl Into<String>,
        troubleshooting: Vec<String>,
    ) -> Self {
        Self {
            success: false,
            status: StatusKind::Error,
            error_type: Some(error_type),
            message: message.into(),
            troubleshooting,
            tools: vec![],
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusKind::Success
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_type.map(ErrorKind::from)
    }
}

// ============================================================================
// Query Result
// ============================================================================

/// Outbound shape of a single dispatch: `{success, data}` or
/// `{success: false, error, error_kind}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl QueryResult {
    pub fn ok(data: impl Into<String>) -> Self {
        Self { success: true, data: Some(data.into()), error: None, error_kind: None }
    }

    pub fn from_error(err: &GenieError) -> Self {
        Self { success: false, data: None, error: Some(err.to_string()), error_kind: Some(err.kind()) }
    }
}

impl From<GenieResult<String>> for QueryResult {
    fn from(result: GenieResult<String>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(&e),
        }
    }
}

// ============================================================================
// Query Descriptor
// ============================================================================

fn default_hours_back() -> u32 {
    24
}
fn default_min_duration_seconds() -> u32 {
    30
}
fn default_limit() -> u32 {
    10
}

/// Parameters interpolated into the canned analysis prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct QueryDescriptor {
    /// Lookback window in hours
    #[serde(default = "default_hours_back")]
    #[validate(range(max = 8760))]
    pub hours_back: u32,
    /// Only consider queries running longer than this
    #[serde(default = "default_min_duration_seconds")]
    pub min_duration_seconds: u32,
    /// Maximum number of queries to return
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_identifier: Option<String>,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self {
            hours_back: default_hours_back(),
            min_duration_seconds: default_min_duration_seconds(),
            limit: default_limit(),
            target_identifier: None,
        }
    }
}

// ============================================================================
// Composite Analysis
// ============================================================================

/// Which query the composite analysis should target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisTarget {
    /// A specific query by identifier
    QueryId(String),
    /// 1-based rank among the worst-performing queries in the window
    Rank(usize),
}

/// Typed view of one record in a rule-based retrieval response
///
/// Unknown fields are kept in `extra` so the report can echo the record
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub query_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub badness_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub primary_issue: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub statement_text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub execution_duration_ms: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Merged result of the rule-based lookup and the LLM optimization request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisReport {
    pub success: bool,
    pub query_id: String,
    /// The selected record, as returned by the rule-based lookup
    #[schema(value_type = Object)]
    pub rule_based_analysis: Value,
    /// Full SQL text fetched for the query, when the lookup succeeded
    #[serde(default)]
    pub statement_text: Option<String>,
    pub llm_optimization_recommendations: QueryResult,
    /// RFC 3339 / ISO-8601 timestamp
    pub analysis_timestamp: String,
    pub methodology: String,
}

// Accept strings, numbers and null for identifier-like fields
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// Accept numbers and numeric strings; anything else becomes None
fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connection_status_shapes() {
        let ok = ConnectionStatus::connected(vec![ToolInfo {
            name: "query".into(),
            description: "Ask Genie".into(),
        }]);
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["message"], "Connected! Found 1 tools");
        assert_eq!(v["tools"][0]["name"], "query");
        assert!(v.get("error_type").is_none());

        let err = ConnectionStatus::failed(
            ConnectionErrorType::AccessDenied,
            "Access denied to Genie space",
            vec!["a".into()],
        );
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["success"], false);
        assert_eq!(v["error_type"], "access_denied");
        assert_eq!(err.error_kind(), Some(ErrorKind::AccessDenied));
    }

    #[test]
    fn test_query_result_from_error() {
        let r = QueryResult::from(Err::<String, _>(GenieError::NotConnected));
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("MCP client not connected"));
        assert_eq!(r.error_kind, Some(ErrorKind::NotConnected));

        let v = serde_json::to_value(QueryResult::ok("ABC")).unwrap();
        assert_eq!(v, json!({ "success": true, "data": "ABC" }));
    }

    #[test]
    fn test_query_record_is_lenient() {
        let record: QueryRecord = serde_json::from_value(json!({
            "query_id": 12345,
            "badness_score": "87.5",
            "primary_issue": "SHUFFLE_HEAVY",
            "user_name": "alice"
        }))
        .unwrap();

        assert_eq!(record.query_id.as_deref(), Some("12345"));
        assert_eq!(record.badness_score, Some(87.5));
        assert_eq!(record.primary_issue.as_deref(), Some("SHUFFLE_HEAVY"));
        assert_eq!(record.statement_text, None);
        assert_eq!(record.extra["user_name"], "alice");
    }

    #[test]
    fn test_query_descriptor_defaults() {
        let d: QueryDescriptor = serde_json::from_value(json!({})).unwrap();
        assert_eq!(d, QueryDescriptor::default());
        assert_eq!((d.hours_back, d.min_duration_seconds, d.limit), (24, 30, 10));

        let bad = QueryDescriptor { limit: 0, ..Default::default() };
        assert!(bad.validate().is_err());
    }
}
