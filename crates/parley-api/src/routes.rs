//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, and the
//! chat endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/chat/query", post(handlers::chat_query))
        .route("/chat/clear-session", post(handlers::clear_session))
        .route("/chat/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(64 * 1024)) // questions are small
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given port.
///
/// Binds to 127.0.0.1 (localhost only).
pub async fn start_server(
    port: u16,
    state: AppState,
) -> Result<(), parley_core::error::CoreError> {
    let addr = format!("127.0.0.1:{}", port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| parley_core::error::CoreError::Api(format!("bind failed: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| parley_core::error::CoreError::Api(format!("server error: {}", e)))?;

    Ok(())
}
