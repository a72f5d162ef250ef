//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use leasa_core::config::LeasaConfig;
use leasa_core::error::LeasaError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // The tenant frontend is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/properties",
            get(handlers::list_properties).post(handlers::create_property),
        )
        .route("/chat", axum::routing::post(handlers::chat))
        .route("/chat/sessions", get(handlers::list_sessions))
        .route(
            "/chat/{session_id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `general.host:general.port` and serve until the process exits.
pub async fn start_server(config: &LeasaConfig, state: AppState) -> Result<(), LeasaError> {
    let addr = format!("{}:{}", config.general.host, config.general.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeasaError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Leasa API listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| LeasaError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
