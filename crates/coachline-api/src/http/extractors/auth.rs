//! Session token authentication extractor.
//!
//! Extracts the session token from, in order:
//! - `Authorization: Bearer <token>` header
//! - `X-Session-Token: <token>` header
//! - `?token=<token>` query parameter (browsers cannot set headers on a
//!   WebSocket upgrade)
//!
//! The token is resolved through the account service; only its SHA-256
//! digest is ever looked up in the database.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use coachline_types::error::AccountError;
use coachline_types::user::ResolvedSession;
use serde::Deserialize;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated principal of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session: ResolvedSession,
    /// The raw token, needed to log out.
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let session = state.account_service.resolve(&token).await?;
        Ok(CurrentUser { session, token })
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extract the session token from headers or the query string.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth
            .to_str()
            .map_err(|_| AppError::Validation("Invalid Authorization header encoding".to_string()))?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(token) = parts.headers.get("x-session-token") {
        let token_str = token
            .to_str()
            .map_err(|_| AppError::Validation("Invalid X-Session-Token header encoding".to_string()))?;
        return Ok(token_str.trim().to_string());
    }

    if let Ok(Query(TokenQuery { token: Some(token) })) =
        Query::<TokenQuery>::try_from_uri(&parts.uri)
    {
        return Ok(token);
    }

    Err(AccountError::Unauthenticated.into())
}
