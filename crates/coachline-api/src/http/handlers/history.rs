//! Conversation history handler.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use coachline_types::message::HistoryEntry;
use coachline_types::user::Identity;
use serde::Deserialize;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::response::{ApiResponse, request_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// The other party of the conversation.
    #[serde(default)]
    pub with: String,
}

/// GET /api/v1/history?with=<name> - Messages between the caller and `with`,
/// oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>, AppError> {
    let start = Instant::now();

    let other = query.with.trim();
    if other.is_empty() {
        return Err(AppError::Validation(
            "query parameter 'with' is required".to_string(),
        ));
    }

    let entries = state
        .history_service
        .conversation(&user.session.identity, &Identity::new(other))
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(entries, request_id(), elapsed)))
}
