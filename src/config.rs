use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::fmt::MakeWriter;

use crate::services::genie::DEFAULT_GENIE_SPACE_ID;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub genie: GenieConfig,
    pub static_config: StaticConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Genie space connection settings
///
/// `host` and `token` are fallbacks only; DATABRICKS_HOST and
/// DATABRICKS_TOKEN take precedence when set.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GenieConfig {
    pub space_id: String,
    pub host: Option<String>,
    pub token: Option<String>,
    /// Per-request timeout in seconds (default: 120, accepts "90s", "2m")
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub request_timeout_secs: u64,
}

// Hand-written so the workspace token never reaches the logs
impl std::fmt::Debug for GenieConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenieConfig")
            .field("space_id", &self.space_id)
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Serve the embedded dashboard for non-API paths
    pub enabled: bool,
}

/// Command line arguments for configuration overrides
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "genie-advisor")]
#[command(version, about = "Genie Advisor - Databricks query performance analysis over Genie MCP")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Server host (overrides config file)
    #[arg(long, value_name = "HOST")]
    pub server_host: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Logging level (overrides config file, e.g., "info,genie_advisor=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Genie space identifier (overrides config file)
    #[arg(long, value_name = "SPACE_ID")]
    pub genie_space_id: Option<String>,

    /// Databricks workspace host, used when DATABRICKS_HOST is unset
    #[arg(long, value_name = "HOST")]
    pub genie_host: Option<String>,

    /// Genie request timeout (overrides config file, e.g., "120s", "2m")
    #[arg(long, value_name = "DURATION")]
    pub request_timeout: Option<String>,

    /// Run the connection smoke check, print the results and exit
    #[arg(long)]
    pub check: bool,
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load(cli_args: &CommandLineArgs) -> Result<Self, anyhow::Error> {
        // 1. Load from config file (use CLI --config if provided, otherwise find default)
        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        // 2. Override with environment variables
        config.apply_env_overrides();

        // 3. Override with command line arguments (highest priority)
        config.apply_cli_overrides(cli_args);

        // 4. Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load configuration before the real subscriber exists
    ///
    /// A temporary console subscriber is installed for the duration of the
    /// load so override and missing-file messages are not dropped.
    pub fn load_logged(cli_args: &CommandLineArgs) -> Result<Self, anyhow::Error> {
        Self::load_logged_to(cli_args, std::io::stdout)
    }

    fn load_logged_to<W>(cli_args: &CommandLineArgs, writer: W) -> Result<Self, anyhow::Error>
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let bootstrap = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
            .with_writer(writer)
            .finish();
        tracing::subscriber::with_default(bootstrap, || Self::load(cli_args))
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_SERVER_HOST: Server host (default: 0.0.0.0)
    /// - APP_SERVER_PORT: Server port (default: 8080)
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,genie_advisor=debug")
    /// - APP_GENIE_SPACE_ID: Genie space identifier (default: system_table_mcp_test)
    /// - APP_GENIE_REQUEST_TIMEOUT_SECS: Request timeout (accepts "120", "90s", "2m")
    ///
    /// Workspace credentials are read separately from DATABRICKS_HOST and
    /// DATABRICKS_TOKEN when the connection is built.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Ok(port) = std::env::var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Ok(space_id) = std::env::var("APP_GENIE_SPACE_ID") {
            self.genie.space_id = space_id;
            tracing::info!("Override genie.space_id from env: {}", self.genie.space_id);
        }

        if let Ok(timeout) = std::env::var("APP_GENIE_REQUEST_TIMEOUT_SECS") {
            match parse_duration_to_secs(&timeout) {
                Ok(val) => {
                    self.genie.request_timeout_secs = val;
                    tracing::info!(
                        "Override genie.request_timeout_secs from env: {}",
                        self.genie.request_timeout_secs
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_GENIE_REQUEST_TIMEOUT_SECS '{}': {} (keep {})",
                    timeout,
                    e,
                    self.genie.request_timeout_secs
                ),
            }
        }
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(host) = &args.server_host {
            self.server.host = host.clone();
            tracing::info!("Override server.host from CLI: {}", self.server.host);
        }

        if let Some(port) = args.server_port {
            self.server.port = port;
            tracing::info!("Override server.port from CLI: {}", self.server.port);
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }

        if let Some(space_id) = &args.genie_space_id {
            self.genie.space_id = space_id.clone();
            tracing::info!("Override genie.space_id from CLI: {}", self.genie.space_id);
        }

        if let Some(host) = &args.genie_host {
            self.genie.host = Some(host.clone());
            tracing::info!("Override genie.host from CLI: {}", host);
        }

        if let Some(timeout) = &args.request_timeout {
            match parse_duration_to_secs(timeout) {
                Ok(val) => {
                    self.genie.request_timeout_secs = val;
                    tracing::info!(
                        "Override genie.request_timeout_secs from CLI: {}",
                        self.genie.request_timeout_secs
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid --request-timeout '{}': {} (keep {})",
                    timeout,
                    e,
                    self.genie.request_timeout_secs
                ),
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.genie.space_id.trim().is_empty() {
            anyhow::bail!("genie.space_id cannot be empty");
        }

        if self.genie.request_timeout_secs == 0 {
            anyhow::bail!("genie.request_timeout_secs must be > 0");
        }

        if self.genie.token.is_some() {
            tracing::warn!("⚠️  genie.token is set in the configuration file");
            tracing::warn!("⚠️  Prefer the DATABRICKS_TOKEN environment variable");
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,genie_advisor=debug".to_string(),
            file: Some("logs/genie-advisor.log".to_string()),
        }
    }
}

impl Default for GenieConfig {
    fn default() -> Self {
        Self {
            space_id: DEFAULT_GENIE_SPACE_ID.to_string(),
            host: None,
            token: None,
            request_timeout_secs: 120,
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

// Accepts numeric seconds or human-friendly strings
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '90s', '2m'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(&v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
