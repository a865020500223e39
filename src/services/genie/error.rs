//! Genie error taxonomy
//!
//! One error enum for every failure the core can report, plus the flat
//! `ErrorKind` used in outbound JSON so callers can branch without parsing
//! message text.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::models::ConnectionErrorType;

/// Every failure category surfaced by the Genie core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Connection-level categories
    InitializationFailed,
    GenieSpaceNotFound,
    AccessDenied,
    AuthenticationFailed,
    McpNotEnabled,
    Unknown,
    // Query / orchestration-level categories
    NotConnected,
    Transport,
    Parse,
    MissingData,
    OutOfRange,
    AnalysisFailed,
    // Rejected request parameters (dashboard API only)
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitializationFailed => "initialization_failed",
            Self::GenieSpaceNotFound => "genie_space_not_found",
            Self::AccessDenied => "access_denied",
            Self::AuthenticationFailed => "authentication_failed",
            Self::McpNotEnabled => "mcp_not_enabled",
            Self::Unknown => "unknown",
            Self::NotConnected => "not_connected",
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::MissingData => "missing_data",
            Self::OutOfRange => "out_of_range",
            Self::AnalysisFailed => "analysis_failed",
            Self::Validation => "validation",
        }
    }
}

impl From<ConnectionErrorType> for ErrorKind {
    fn from(t: ConnectionErrorType) -> Self {
        match t {
            ConnectionErrorType::InitializationFailed => Self::InitializationFailed,
            ConnectionErrorType::GenieSpaceNotFound => Self::GenieSpaceNotFound,
            ConnectionErrorType::AccessDenied => Self::AccessDenied,
            ConnectionErrorType::AuthenticationFailed => Self::AuthenticationFailed,
            ConnectionErrorType::McpNotEnabled => Self::McpNotEnabled,
            ConnectionErrorType::Unknown => Self::Unknown,
        }
    }
}

const QUERY_FAILED_PREFIX: &str = "Query failed: ";

/// Genie core errors
#[derive(Debug, thiserror::Error)]
pub enum GenieError {
    #[error("MCP client not connected")]
    NotConnected,

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// First-stage retrieval did not succeed; `details` carries the raw result
    #[error("Failed to get query details")]
    DetailsUnavailable { details: serde_json::Value },

    #[error("No queries found matching criteria")]
    NoQueriesFound,

    #[error("Query rank {rank} is out of range ({available} queries returned)")]
    RankOutOfRange { rank: usize, available: usize },

    #[error("Failed to parse query data: {0}")]
    Parse(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
}

impl GenieError {
    /// Wrap a transport failure message, without stuttering the prefix when
    /// the remote side already reported "Query failed: ..."
    pub fn query_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        match message.strip_prefix(QUERY_FAILED_PREFIX) {
            Some(rest) => Self::QueryFailed(rest.to_string()),
            None => Self::QueryFailed(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected => ErrorKind::NotConnected,
            Self::QueryFailed(_) => ErrorKind::Transport,
            Self::DetailsUnavailable { .. } => ErrorKind::Transport,
            Self::NoQueriesFound => ErrorKind::MissingData,
            Self::RankOutOfRange { .. } => ErrorKind::OutOfRange,
            Self::Parse(_) => ErrorKind::Parse,
            Self::AnalysisFailed(_) => ErrorKind::AnalysisFailed,
        }
    }

    /// Extra structured context for the outbound payload, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::DetailsUnavailable { details } => Some(details.clone()),
            Self::RankOutOfRange { rank, available } => {
                Some(serde_json::json!({ "rank": rank, "available": available }))
            },
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GenieError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type GenieResult<T> = Result<T, GenieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_failed_does_not_repeat_prefix() {
        let err = GenieError::query_failed("Query failed: boom");
        assert_eq!(err.to_string(), "Query failed: boom");

        let err = GenieError::query_failed("boom");
        assert_eq!(err.to_string(), "Query failed: boom");
    }

    #[test]
    fn test_kinds_serialize_snake_case() {
        let json = serde_json::to_string(&ErrorKind::GenieSpaceNotFound).unwrap();
        assert_eq!(json, "\"genie_space_not_found\"");
        assert_eq!(ErrorKind::OutOfRange.as_str(), "out_of_range");
    }

    #[test]
    fn test_rank_out_of_range_details() {
        let err = GenieError::RankOutOfRange { rank: 5, available: 2 };
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        let details = err.details().unwrap();
        assert_eq!(details["rank"], 5);
        assert_eq!(details["available"], 2);
    }
}
