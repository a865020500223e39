//! Connection diagnostics
//!
//! Failures of the capability probe are classified from the error text.
//! Patterns are checked in a fixed order and the first match wins, so a
//! message mentioning both 404 and 403 is reported as a missing space.

use super::models::{ConnectionErrorType, ConnectionStatus};

// (error type, substrings), checked top to bottom against the lowercased text
const CLASSIFICATION_RULES: &[(ConnectionErrorType, &[&str])] = &[
    (ConnectionErrorType::GenieSpaceNotFound, &["404", "not found"]),
    (ConnectionErrorType::AccessDenied, &["403", "forbidden"]),
    (ConnectionErrorType::AuthenticationFailed, &["401", "unauthorized"]),
    (ConnectionErrorType::McpNotEnabled, &["beta", "not enabled"]),
];

/// Error category for a failure message
pub fn classify(message: &str) -> ConnectionErrorType {
    let lowered = message.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| lowered.contains(p)))
        .map(|(error_type, _)| *error_type)
        .unwrap_or(ConnectionErrorType::Unknown)
}

/// Status reported when no connection handle exists
pub fn not_initialized() -> ConnectionStatus {
    ConnectionStatus::failed(
        ConnectionErrorType::InitializationFailed,
        "MCP client not initialized - check workspace authentication",
        hints(&[
            "Verify you're running in a Databricks environment",
            "Check workspace authentication is working",
            "Ensure DATABRICKS_HOST and DATABRICKS_TOKEN are set",
        ]),
    )
}

/// Classified status for a failed capability probe
pub fn probe_failed(space_id: &str, message: &str) -> ConnectionStatus {
    let error_type = classify(message);
    match error_type {
        ConnectionErrorType::GenieSpaceNotFound => ConnectionStatus::failed(
            error_type,
            format!("Genie space '{}' not found", space_id),
            vec![
                format!("Create Genie space with ID: {}", space_id),
                "Verify the space name is correct".to_string(),
                "Check you have access to the space".to_string(),
            ],
        ),
        ConnectionErrorType::AccessDenied => ConnectionStatus::failed(
            error_type,
            "Access denied to Genie space",
            vec![
                format!("Request access to the Genie space '{}'", space_id),
                "Check your workspace permissions".to_string(),
                "Verify you're authenticated correctly".to_string(),
            ],
        ),
        ConnectionErrorType::AuthenticationFailed => ConnectionStatus::failed(
            error_type,
            "Authentication failed",
            hints(&[
                "Check workspace authentication",
                "Verify your token/credentials",
                "Try re-authenticating to Databricks",
            ]),
        ),
        ConnectionErrorType::McpNotEnabled => ConnectionStatus::failed(
            error_type,
            "MCP Beta features not enabled",
            hints(&[
                "Contact your Databricks admin",
                "Request MCP Beta feature enablement",
                "Ensure serverless compute is enabled",
            ]),
        ),
        ConnectionErrorType::Unknown | ConnectionErrorType::InitializationFailed => {
            ConnectionStatus::failed(
                ConnectionErrorType::Unknown,
                format!("Connection test failed: {}", message),
                hints(&[
                    "Check Databricks workspace connectivity",
                    "Verify MCP service is running",
                    "Review error details for specific issues",
                ]),
            )
        },
    }
}

fn hints(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_order() {
        assert_eq!(classify("HTTP 404 Not Found"), ConnectionErrorType::GenieSpaceNotFound);
        assert_eq!(classify("resource NOT FOUND"), ConnectionErrorType::GenieSpaceNotFound);
        assert_eq!(classify("HTTP 403 Forbidden"), ConnectionErrorType::AccessDenied);
        assert_eq!(classify("Forbidden"), ConnectionErrorType::AccessDenied);
        assert_eq!(classify("HTTP 401 Unauthorized"), ConnectionErrorType::AuthenticationFailed);
        assert_eq!(classify("This is a Beta feature"), ConnectionErrorType::McpNotEnabled);
        assert_eq!(classify("feature not enabled"), ConnectionErrorType::McpNotEnabled);
        assert_eq!(classify("connection reset by peer"), ConnectionErrorType::Unknown);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(classify("got 403 then 404"), ConnectionErrorType::GenieSpaceNotFound);
        assert_eq!(classify("401 forbidden"), ConnectionErrorType::AccessDenied);
        assert_eq!(classify("unauthorized: beta"), ConnectionErrorType::AuthenticationFailed);
    }

    #[test]
    fn test_probe_failed_interpolates_space_id() {
        let status = probe_failed("my_space", "HTTP 404 Not Found: no such space");
        assert_eq!(status.error_type, Some(ConnectionErrorType::GenieSpaceNotFound));
        assert_eq!(status.message, "Genie space 'my_space' not found");
        assert_eq!(status.troubleshooting.len(), 3);
        assert_eq!(status.troubleshooting[0], "Create Genie space with ID: my_space");
    }

    #[test]
    fn test_unknown_keeps_original_message() {
        let status = probe_failed("s", "socket hang up");
        assert_eq!(status.error_type, Some(ConnectionErrorType::Unknown));
        assert_eq!(status.message, "Connection test failed: socket hang up");
        assert!(!status.success);
    }

    #[test]
    fn test_not_initialized() {
        let status = not_initialized();
        assert_eq!(status.error_type, Some(ConnectionErrorType::InitializationFailed));
        assert_eq!(status.troubleshooting.len(), 3);
    }
}
