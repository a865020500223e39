//! Workspace credential discovery
//!
//! Resolves the workspace host and access token from the process
//! environment, falling back to values from the `[genie]` config section.

use crate::config::GenieConfig;

pub const HOST_ENV: &str = "DATABRICKS_HOST";
pub const TOKEN_ENV: &str = "DATABRICKS_TOKEN";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("workspace host not configured (set DATABRICKS_HOST or genie.host)")]
    MissingHost,

    #[error("access token not configured (set DATABRICKS_TOKEN or genie.token)")]
    MissingToken,
}

/// Authenticated workspace session parameters
#[derive(Clone)]
pub struct WorkspaceCredentials {
    pub host: String,
    token: String,
}

impl std::fmt::Debug for WorkspaceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceCredentials")
            .field("host", &self.host)
            .field("token", &"****")
            .finish()
    }
}

impl WorkspaceCredentials {
    pub fn new(host: &str, token: impl Into<String>) -> Self {
        Self { host: normalize_host(host), token: token.into() }
    }

    /// Discover credentials: environment first, then config
    pub fn discover(config: &GenieConfig) -> Result<Self, CredentialsError> {
        Self::resolve(
            std::env::var(HOST_ENV).ok(),
            std::env::var(TOKEN_ENV).ok(),
            config,
        )
    }

    fn resolve(
        env_host: Option<String>,
        env_token: Option<String>,
        config: &GenieConfig,
    ) -> Result<Self, CredentialsError> {
        let host = non_empty(env_host)
            .or_else(|| non_empty(config.host.clone()))
            .ok_or(CredentialsError::MissingHost)?;
        let token = non_empty(env_token)
            .or_else(|| non_empty(config.token.clone()))
            .ok_or(CredentialsError::MissingToken)?;

        Ok(Self::new(&host, token))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// MCP endpoint of a Genie space on this workspace
    pub fn genie_url(&self, space_id: &str) -> String {
        format!("{}/api/2.0/mcp/genie/{}", self.host, urlencoding::encode(space_id))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_wins_over_config() {
        let config = GenieConfig {
            host: Some("https://from-config.example.com".into()),
            token: Some("config-token".into()),
            ..Default::default()
        };
        let creds = WorkspaceCredentials::resolve(
            Some("env.example.com/".into()),
            Some("env-token".into()),
            &config,
        )
        .unwrap();

        assert_eq!(creds.host, "https://env.example.com");
        assert_eq!(creds.token(), "env-token");
    }

    #[test]
    fn test_falls_back_to_config() {
        let config = GenieConfig {
            host: Some("https://ws.example.com".into()),
            token: Some("t".into()),
            ..Default::default()
        };
        let creds = WorkspaceCredentials::resolve(Some("  ".into()), None, &config).unwrap();
        assert_eq!(creds.host, "https://ws.example.com");
        assert_eq!(creds.token(), "t");
    }

    #[test]
    fn test_missing_values() {
        let config = GenieConfig::default();
        assert_eq!(
            WorkspaceCredentials::resolve(None, Some("t".into()), &config).unwrap_err(),
            CredentialsError::MissingHost
        );
        assert_eq!(
            WorkspaceCredentials::resolve(Some("h".into()), None, &config).unwrap_err(),
            CredentialsError::MissingToken
        );
    }

    #[test]
    fn test_genie_url() {
        let creds = WorkspaceCredentials::new("https://ws.example.com/", "t");
        assert_eq!(
            creds.genie_url("system_table_mcp_test"),
            "https://ws.example.com/api/2.0/mcp/genie/system_table_mcp_test"
        );
        assert!(!format!("{:?}", creds).contains("\"t\""));
    }
}
