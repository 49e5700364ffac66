//! analyst HTTP Server
//!
//! Axum-based server: upload a CSV, chat with the analysis agent about it,
//! then preview the data or download the plots and exports it produced.

mod handlers;
mod state;
mod storage;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use analyst_core::AgentConfig;

use crate::handlers::{chat, download, health_check, preview, upload};
use crate::state::AppState;
use crate::storage::Storage;

const DEFAULT_UPLOAD_LIMIT: usize = 50 * 1024 * 1024;
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Log filter from RUST_LOG, read after the `.env` file is loaded
fn log_filter() -> EnvFilter {
    EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
}

/// Build the router over shared state
fn app(state: AppState) -> Router {
    let upload_limit = std::env::var("ANALYST_MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_UPLOAD_LIMIT);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/upload", post(upload))
        .route("/api/chat", post(chat))
        .route("/api/download/{file_id}", get(download))
        .route("/api/preview/{file_id}", get(preview))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize LLM provider
    let provider = match analyst_runtime::provider_from_env() {
        Ok(provider) => {
            let info = provider.info();
            tracing::info!("✓ Using {} ({})", info.name, info.model);
            Some(provider)
        }
        Err(e) => {
            tracing::warn!("⚠ {}", e.user_message());
            tracing::warn!("  Uploads and previews work; chat requests will fail");
            None
        }
    };

    let tools = analyst_tools::default_registry();
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent_config = AgentConfig::from_env();
    tracing::info!("Iteration limit: {}", agent_config.max_iterations);

    let state = AppState {
        provider,
        tools: Arc::new(tools),
        storage: Arc::new(Storage::new()),
        agent_config,
    };

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 analyst server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /healthz                 - Health check");
    tracing::info!("  POST /api/upload?filename=    - Upload a CSV dataset");
    tracing::info!("  POST /api/chat                - Ask about a dataset");
    tracing::info!("  GET  /api/download/{{file_id}} - Download a file");
    tracing::info!("  GET  /api/preview/{{file_id}}  - Preview a dataset");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_reaches_log_filter() {
        let path = std::env::temp_dir().join(format!("analyst-{}.env", uuid::Uuid::new_v4()));
        std::fs::write(&path, "RUST_LOG=warn,analyst_server=trace\n").unwrap();
        dotenvy::from_path_override(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(log_filter().to_string().to_lowercase().contains("analyst_server=trace"));
    }
}
