//! Route handler functions for all API endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use leasa_chat::{ChatRequest, ChatResponse};
use leasa_core::types::{Listing, NewListing, Session, SessionSummary};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub listing_count: u64,
    pub session_count: u64,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET / - service banner.
pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to Leasa - AI Real Estate Agent API".to_string(),
    })
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let listing_count = state.listings.count()?;
    let session_count = state.engine.list_sessions().await?.len() as u64;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        listing_count,
        session_count,
    }))
}

/// GET /properties - every stored listing, oldest first.
pub async fn list_properties(
    State(state): State<AppState>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    Ok(Json(state.listings.list()?))
}

/// POST /properties - store a listing and refresh the catalog.
pub async fn create_property(
    State(state): State<AppState>,
    Json(body): Json<NewListing>,
) -> Result<Json<Listing>, ApiError> {
    let (listing, count) = state.add_listing(body)?;
    tracing::debug!(listing_id = %listing.id, catalog_size = count, "Catalog refreshed");
    Ok(Json(listing))
}

/// POST /chat - handle one tenant message.
///
/// Completion failures still return 200 with an apology in `message`.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.engine.handle_turn(body).await?;
    Ok(Json(response))
}

/// GET /chat/sessions - summaries, most recent first.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    Ok(Json(state.engine.list_sessions().await?))
}

/// GET /chat/{session_id} - transcript and current recommendations.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.engine.session(&session_id).await?))
}

/// DELETE /chat/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_session(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
