//! Genie API Handlers
//!
//! REST endpoints exposing connection diagnostics, raw questions, the canned
//! analyses and the composite rule-based + LLM analysis.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::AppState;
use crate::services::genie::{
    AnalysisTarget, ErrorKind, GenieError, PATTERN_LOOKBACK_HOURS, QueryDescriptor, QueryResult,
};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AskRequest {
    /// Natural-language question sent to the Genie space as-is
    #[validate(length(min = 1, max = 8000))]
    pub question: String,
}

fn default_pattern_hours() -> u32 {
    PATTERN_LOOKBACK_HOURS
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatternParams {
    /// Lookback window in hours (default: one week)
    #[serde(default = "default_pattern_hours")]
    #[validate(range(min = 1, max = 8760))]
    pub hours_back: u32,
}

fn default_analysis_hours() -> u32 {
    24
}

/// Composite analysis target: a query id, or a rank among the worst queries
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub query_id: Option<String>,
    /// 1-based rank; defaults to 1 when no query_id is given
    #[serde(default)]
    #[validate(range(min = 1))]
    pub rank: Option<usize>,
    #[serde(default = "default_analysis_hours")]
    #[validate(range(min = 1, max = 8760))]
    pub hours_back: u32,
}

impl AnalyzeRequest {
    pub fn target(&self) -> Result<AnalysisTarget, GenieApiError> {
        let query_id = self.query_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match (query_id, self.rank) {
            (Some(_), Some(_)) => {
                Err(GenieApiError::validation("Provide either query_id or rank, not both"))
            },
            (Some(id), None) => Ok(AnalysisTarget::QueryId(id.to_string())),
            (None, rank) => Ok(AnalysisTarget::Rank(rank.unwrap_or(1))),
        }
    }
}

// ============================================================================
// Diagnostics & Dispatch
// ============================================================================

/// Test the Genie space connection
/// GET /api/genie/status
#[utoipa::path(
    get,
    path = "/api/genie/status",
    responses(
        (status = 200, description = "Connection diagnostics", body = crate::services::genie::ConnectionStatus)
    ),
    tag = "Genie"
)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.genie_service.test_connection().await)
}

/// Ask the Genie space a free-form question
/// POST /api/genie/query
#[utoipa::path(
    post,
    path = "/api/genie/query",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Genie answer", body = QueryResult),
        (status = 400, description = "Invalid question"),
        (status = 502, description = "Genie space request failed"),
        (status = 503, description = "Not connected")
    ),
    tag = "Genie"
)]
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GenieApiError> {
    let Json(req) = payload?;
    req.validate()?;
    let data = state.genie_service.query_genie_space(&req.question).await?;
    Ok(Json(QueryResult::ok(data)))
}

// ============================================================================
// Canned Analyses
// ============================================================================

/// Slowest queries in the window
/// GET /api/genie/queries/worst
#[utoipa::path(
    get,
    path = "/api/genie/queries/worst",
    params(QueryDescriptor),
    responses(
        (status = 200, description = "Worst performing queries", body = QueryResult),
        (status = 400, description = "Invalid parameters")
    ),
    tag = "Genie"
)]
pub async fn get_worst_queries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<QueryDescriptor>, QueryRejection>,
) -> Result<impl IntoResponse, GenieApiError> {
    let Query(descriptor) = query?;
    descriptor.validate()?;
    let data = state.genie_service.get_worst_queries(&descriptor).await?;
    Ok(Json(QueryResult::ok(data)))
}

/// Most expensive queries by DBU consumption
/// GET /api/genie/queries/expensive
#[utoipa::path(
    get,
    path = "/api/genie/queries/expensive",
    params(QueryDescriptor),
    responses(
        (status = 200, description = "Most expensive queries", body = QueryResult),
        (status = 400, description = "Invalid parameters")
    ),
    tag = "Genie"
)]
pub async fn get_expensive_queries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<QueryDescriptor>, QueryRejection>,
) -> Result<impl IntoResponse, GenieApiError> {
    let Query(descriptor) = query?;
    descriptor.validate()?;
    let data = state.genie_service.get_expensive_queries(&descriptor).await?;
    Ok(Json(QueryResult::ok(data)))
}

/// Detailed analysis of one query
/// GET /api/genie/queries/:query_id
#[utoipa::path(
    get,
    path = "/api/genie/queries/{query_id}",
    params(("query_id" = String, Path, description = "Query identifier")),
    responses(
        (status = 200, description = "Query details", body = QueryResult)
    ),
    tag = "Genie"
)]
pub async fn get_query_details(
    State(state): State<Arc<AppState>>,
    Path(query_id): Path<String>,
) -> Result<impl IntoResponse, GenieApiError> {
    let data = state.genie_service.get_query_details(&query_id).await?;
    Ok(Json(QueryResult::ok(data)))
}

/// Systemic query patterns
/// GET /api/genie/patterns
#[utoipa::path(
    get,
    path = "/api/genie/patterns",
    params(PatternParams),
    responses(
        (status = 200, description = "Pattern analysis", body = QueryResult)
    ),
    tag = "Genie"
)]
pub async fn get_query_patterns(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PatternParams>, QueryRejection>,
) -> Result<impl IntoResponse, GenieApiError> {
    let Query(params) = query?;
    params.validate()?;
    let data = state.genie_service.analyze_query_patterns(params.hours_back).await?;
    Ok(Json(QueryResult::ok(data)))
}

// ============================================================================
// Composite Analysis
// ============================================================================

/// Rule-based identification followed by LLM optimization advice
/// POST /api/genie/analyze
#[utoipa::path(
    post,
    path = "/api/genie/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis report", body = crate::services::genie::AnalysisReport),
        (status = 400, description = "Invalid target or rank out of range"),
        (status = 404, description = "No queries found"),
        (status = 502, description = "Genie space request failed"),
        (status = 503, description = "Not connected")
    ),
    tag = "Genie"
)]
pub async fn analyze_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GenieApiError> {
    let Json(req) = payload?;
    req.validate()?;
    let target = req.target()?;

    tracing::info!("Composite analysis requested for {:?} over {}h", target, req.hours_back);
    let report = state.genie_service.analyze_query_with_llm(&target, req.hours_back).await?;
    Ok(Json(report))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub struct GenieApiError {
    kind: ErrorKind,
    message: String,
    details: Option<Value>,
}

impl GenieApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Validation, message: message.into(), details: None }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::NotConnected | ErrorKind::InitializationFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            },
            ErrorKind::MissingData => StatusCode::NOT_FOUND,
            ErrorKind::OutOfRange | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::AnalysisFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Transport
            | ErrorKind::Parse
            | ErrorKind::GenieSpaceNotFound
            | ErrorKind::AccessDenied
            | ErrorKind::AuthenticationFailed
            | ErrorKind::McpNotEnabled
            | ErrorKind::Unknown => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<GenieError> for GenieApiError {
    fn from(err: GenieError) -> Self {
        Self { kind: err.kind(), message: err.to_string(), details: err.details() }
    }
}

// Malformed bodies and query strings are reported like any other invalid request
impl From<JsonRejection> for GenieApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for GenieApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for GenieApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::validation(format!("Invalid request: {}", err))
    }
}

impl IntoResponse for GenieApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Genie API error ({}): {}", self.kind.as_str(), self.message);
        } else {
            tracing::warn!("Genie API request rejected ({}): {}", self.kind.as_str(), self.message);
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": self.message,
            "error_kind": self.kind,
            "code": status.as_u16(),
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}
