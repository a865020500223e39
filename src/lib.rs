//! Genie Advisor Library
//!
//! Query performance analysis for a Databricks workspace, driven through a
//! Genie space's managed MCP endpoint.

use std::sync::Arc;

pub mod config;
pub mod embedded;
pub mod handlers;
pub mod services;

// Re-export commonly used types
pub use config::Config;
pub use services::genie::{GenieError, GenieService};

/// Application shared state
#[derive(Clone)]
pub struct AppState {
    pub genie_service: Arc<GenieService>,
}

impl AppState {
    pub fn new(genie_service: Arc<GenieService>) -> Self {
        Self { genie_service }
    }
}
