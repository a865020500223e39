//! HTTP handlers for the Genie dashboard API

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::AppState;

pub mod genie;
pub mod health;

/// API and probe routes; static assets and the OpenAPI document are mounted by the binary
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/genie/status", get(genie::get_status))
        .route("/api/genie/query", post(genie::ask))
        .route("/api/genie/queries/worst", get(genie::get_worst_queries))
        .route("/api/genie/queries/expensive", get(genie::get_expensive_queries))
        .route("/api/genie/queries/:query_id", get(genie::get_query_details))
        .route("/api/genie/patterns", get(genie::get_query_patterns))
        .route("/api/genie/analyze", post(genie::analyze_query))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .with_state(state)
}
