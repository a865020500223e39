//! Genie Service Module
//!
//! Client-side orchestration around a Genie space reached through its
//! managed MCP endpoint.
//!
//! # Architecture
//! ```text
//! ┌──────────────────┐
//! │   GenieService   │  ← diagnostics, dispatch, canned analyses,
//! └────────┬─────────┘    composite rule-based + LLM analysis
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   McpTransport   │  ← Trait (list tools / call tool / close)
//! └────────┬─────────┘
//!          │
//!    ┌─────┴──────┐
//!    ▼            ▼
//! ┌───────┐  ┌──────────┐
//! │ HTTP  │  │ Scripted │
//! │ (MCP) │  │ (tests)  │
//! └───────┘  └──────────┘
//! ```

mod analysis;
mod client;
mod credentials;
mod diagnostics;
mod error;
mod guidance;
mod models;
mod payload;
mod prompts;
mod service;
mod transport;

pub use client::{HttpMcpTransport, MCP_PROTOCOL_VERSION};
pub use credentials::{CredentialsError, WorkspaceCredentials};
pub use diagnostics::classify as classify_connection_error;
pub use error::{ErrorKind, GenieError, GenieResult};
pub use guidance::{GENERIC_GUIDANCE, IssueCategory, guidance_for};
pub use models::*;
pub use prompts::PATTERN_LOOKBACK_HOURS;
pub use service::{GenieService, QUERY_TOOL};
pub use transport::{ContentFragment, McpTransport, TransportError};
