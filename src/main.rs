//! Sidequest Backend
//!
//! API server for the Sidequest experience discovery platform. A single
//! endpoint drives five Gemini-backed agents through a fixed dependency
//! graph and returns a narrative itinerary with a full execution trace.

mod agents;
mod api;
mod config;
mod coordinator;
mod error;
mod gemini;
mod state;

use api::ApiContext;
use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use config::Settings;
use coordinator::Coordinator;
use gemini::GeminiClient;
use serde::Serialize;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
struct HelloResponse {
    message: String,
    status: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    service: String,
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let settings = Settings::from_env();
    info!(
        addr = %settings.server_addr(),
        flash_model = %settings.flash_model,
        pro_model = %settings.pro_model,
        agent_timeout_secs = settings.agent_timeout_secs,
        "Configuration loaded"
    );
    if settings.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY not set - generation calls will fail");
    }

    // Wire up the coordinator with its injected collaborators
    let client = GeminiClient::new(settings.gemini_api_key.clone());
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(client),
        settings.agent_models(),
        settings.agent_timeout(),
    ));
    let ctx = ApiContext {
        coordinator,
        state: Arc::new(RwLock::new(AppState::new())),
    };

    // Build our application with routes
    let app = Router::new()
        .route("/", get(hello_world))
        .route("/api/health", get(health_check))
        .route("/api/generate-itinerary", post(api::generate_itinerary))
        .route("/api/agent-trace/:session_id", get(api::get_agent_trace))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Allow CORS for frontend dev server
        .with_state(ctx);

    let addr: SocketAddr = settings
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from Sidequest Backend!".to_string(),
        status: "ok".to_string(),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "sidequest-api".to_string(),
    })
}
