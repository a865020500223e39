use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode, Uri, header},
    response::IntoResponse,
    routing::get,
};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use genie_advisor::config::{CommandLineArgs, Config};
use genie_advisor::embedded::WebAssets;
use genie_advisor::services::genie::{self, GenieService, QueryDescriptor, QueryResult};
use genie_advisor::{AppState, handlers};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::genie::get_status,
        handlers::genie::ask,
        handlers::genie::get_worst_queries,
        handlers::genie::get_expensive_queries,
        handlers::genie::get_query_details,
        handlers::genie::get_query_patterns,
        handlers::genie::analyze_query,
    ),
    components(
        schemas(
            genie::ConnectionStatus,
            genie::ConnectionErrorType,
            genie::StatusKind,
            genie::ToolInfo,
            genie::QueryResult,
            genie::ErrorKind,
            genie::QueryDescriptor,
            genie::AnalysisReport,
            handlers::genie::AskRequest,
            handlers::genie::AnalyzeRequest,
        )
    ),
    tags(
        (name = "Genie", description = "Query performance analysis through a Genie space"),
    ),
    info(title = "Genie Advisor API")
)]
struct ApiDoc;

const CHECK_QUESTION: &str = "How many queries were executed in the last hour?";

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Workspace credentials may live in a local .env file
    dotenvy::dotenv().ok();

    let cli_args = CommandLineArgs::parse();
    let config = Config::load_logged(&cli_args)?;

    // Initialize logging
    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    // Held until shutdown so buffered file output is flushed
    let mut _log_guard = None;
    if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("genie-advisor.log");
        // Rolling appender adds its own date suffix
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        _log_guard = Some(guard);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    tracing::info!("Genie Advisor starting up");
    tracing::info!("Configuration loaded: {:?}", config.genie);

    let genie_service = Arc::new(GenieService::connect(&config.genie));

    if cli_args.check {
        let connected = run_check(&genie_service).await?;
        genie_service.close().await;
        return Ok(if connected { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let app_state = Arc::new(AppState::new(Arc::clone(&genie_service)));

    // Static file serving from embedded assets
    let static_routes = if config.static_config.enabled {
        tracing::info!("Static file serving enabled, serving from embedded assets");
        Router::new().fallback(serve_static_files)
    } else {
        Router::new()
    };

    let app = Router::new()
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(handlers::api_router(app_state))
        .merge(static_routes) // Must be last to serve as fallback
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("OpenAPI document available at http://{}/api-docs/openapi.json", addr);
    tracing::info!("Genie Advisor is ready to serve requests");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    genie_service.close().await;
    tracing::info!("Genie Advisor stopped");

    Ok(ExitCode::SUCCESS)
}

/// Connection smoke check: diagnostics, one simple question, one canned analysis
async fn run_check(service: &GenieService) -> Result<bool, serde_json::Error> {
    let status = service.test_connection().await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if !status.is_success() {
        tracing::error!("Genie space {} is not reachable", service.space_id());
        return Ok(false);
    }

    let answer = QueryResult::from(service.query_genie_space(CHECK_QUESTION).await);
    println!("{}", serde_json::to_string_pretty(&answer)?);

    let descriptor = QueryDescriptor { limit: 3, ..Default::default() };
    let worst = QueryResult::from(service.get_worst_queries(&descriptor).await);
    println!("{}", serde_json::to_string_pretty(&worst)?);

    Ok(true)
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

/// Serve the embedded dashboard; unknown non-API paths fall back to index.html
async fn serve_static_files(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    // Don't serve static files for API routes
    if path.starts_with("api/") || path.starts_with("api-docs/") {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let asset_path = if path.is_empty() { "index.html" } else { path };

    if let Some(file) = WebAssets::get(asset_path) {
        let content_type = get_content_type(asset_path);
        return ([(header::CONTENT_TYPE, content_type)], file.data.into_owned()).into_response();
    }

    if let Some(index) = WebAssets::get("index.html") {
        return (
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))],
            index.data.into_owned(),
        )
            .into_response();
    }

    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Get content type based on file extension
fn get_content_type(path: &str) -> HeaderValue {
    let ext = path.rsplit('.').next().unwrap_or("");
    let content_type = match ext {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    };
    HeaderValue::from_static(content_type)
}
