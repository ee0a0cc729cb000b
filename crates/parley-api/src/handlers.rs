//! Route handler functions for the chat API.
//!
//! Each handler extracts parameters via axum extractors, calls into the
//! orchestrator, and returns JSON responses.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatQueryRequest {
    /// The user's free-text question.
    pub question: String,
    /// Session to continue; a fresh session is created when absent.
    pub session_id: Option<String>,
    /// List request the conversation is about, if any.
    pub request_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatQueryResponse {
    pub answer: String,
    pub generated_sql: Option<String>,
    pub row_count: usize,
    pub query_type: Option<String>,
    /// Echoed (or newly generated) session key for follow-up turns.
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearSessionParams {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearSessionResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    pub uptime_secs: u64,
    pub timestamp: String,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /chat/query - process one conversational turn.
pub async fn chat_query(
    State(state): State<AppState>,
    Json(request): Json<ChatQueryRequest>,
) -> Result<Json<ChatQueryResponse>, ApiError> {
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = state
        .orchestrator
        .process_turn(&session_id, &request.question, request.request_id)
        .await?;

    Ok(Json(ChatQueryResponse {
        answer: outcome.answer,
        generated_sql: outcome.generated_query,
        row_count: outcome.row_count,
        query_type: outcome.category,
        session_id,
    }))
}

/// POST /chat/clear-session - drop a session's memory. Idempotent.
pub async fn clear_session(
    State(state): State<AppState>,
    Query(params): Query<ClearSessionParams>,
) -> Result<Json<ClearSessionResponse>, ApiError> {
    let session_id = params.session_id.unwrap_or_else(|| "default".to_string());
    state.orchestrator.clear_session(&session_id)?;
    Ok(Json(ClearSessionResponse {
        message: format!("Session {} cleared", session_id),
    }))
}

/// GET /chat/health - service status and active session count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.orchestrator.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        active_sessions: stats.active_sessions,
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
