//! User directory handler.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use coachline_types::user::Role;
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::response::{ApiResponse, request_id};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct UserListQuery {
    /// Filter by role (coach, client).
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
    pub online: bool,
}

/// GET /api/v1/users - List accounts with their live connection status.
pub async fn list_users(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, AppError> {
    let start = Instant::now();

    let role = match &query.role {
        Some(r) => Some(r.parse::<Role>().map_err(AppError::Validation)?),
        None => None,
    };

    let users = state.account_service.list_users(role).await?;
    let registry = state.relay.registry();
    let summaries: Vec<UserSummary> = users
        .into_iter()
        .map(|u| UserSummary {
            online: registry.is_online(&u.username),
            username: u.username.to_string(),
            role: u.role,
        })
        .collect();
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(
        ApiResponse::success(summaries, request_id(), elapsed).with_link("self", "/api/v1/users"),
    ))
}
