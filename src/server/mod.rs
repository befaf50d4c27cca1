//! HTTP server exposing the workflow to browsers and scripts
//!
//! Every workflow operation goes through the `/api/invoke` command proxy.

mod auth;
mod proxy;
pub mod routes;
pub mod state;

pub use auth::{generate_auth_token, AuthLayer};
pub use proxy::{invoke_handler, InvokeRequest, InvokeResponse};
pub use state::ServerAppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue,
    },
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Version information for the server
#[derive(serde::Serialize)]
struct VersionInfo {
    name: String,
    version: String,
}

/// Build the application router.
///
/// Layer order is cors (outer) -> auth -> handler, so preflight requests are
/// answered before the token check.
pub fn build_router(state: ServerAppState, cors_origins: Option<&[String]>) -> Router {
    let cors = match cors_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed_origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods(Any)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        }
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]),
    };

    Router::new()
        .route("/api/invoke", post(proxy::invoke_handler))
        .route("/api/version", get(version_handler))
        .route("/health", get(health_handler))
        .layer(AuthLayer::new(state.auth_token.clone()))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until shutdown is requested
pub async fn run_server(port: u16, bind: &str, state: ServerAppState) -> Result<(), String> {
    let cors_origins = state.config.server.cors_origins.clone();
    let app = build_router(state.clone(), cors_origins.as_deref());

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let cors_display = match &cors_origins {
        Some(origins) if !origins.is_empty() => origins.join(", "),
        _ => "*".to_string(),
    };

    println!();
    println!("  Testcase Workbench server");
    println!("  Server URL:   http://{}", addr);
    println!("  Auth Token:   {}", state.auth_token);
    println!("  Generator:    {}", state.client.base_url());
    println!("  Exports:      {}", state.config.export.output_dir.display());
    println!("  CORS Origins: {}", cors_display);
    println!();
    println!("  POST /api/invoke   - Command proxy");
    println!("  GET  /api/version  - Server version info");
    println!("  GET  /health       - Health check");
    println!();

    log::info!("Server listening on http://{}", addr);

    let shutdown_state = state.shutdown_state.clone();
    let shutdown_signal = async move {
        shutdown_state.wait().await;
        log::info!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

async fn version_handler() -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
