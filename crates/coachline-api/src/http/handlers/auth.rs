//! Account handlers: register, login, logout.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use coachline_core::service::account::Registration;
use coachline_types::user::Role;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::response::{ApiResponse, request_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub expires_at: String,
}

/// POST /api/v1/auth/register - Create an account.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let start = Instant::now();

    let role = match body.role.as_deref() {
        Some(r) => r.parse::<Role>().map_err(AppError::Validation)?,
        None => Role::default(),
    };

    let user = state
        .account_service
        .register(Registration {
            username: body.username,
            email: body.email,
            password: body.password,
            role,
        })
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::json!({
        "id": user.id.to_string(),
        "username": user.username,
        "email": user.email,
        "role": user.role,
        "created_at": user.created_at.to_rfc3339(),
    });
    let resp = ApiResponse::success(data, request_id(), elapsed)
        .with_link("login", "/api/v1/auth/login");

    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /api/v1/auth/login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let start = Instant::now();

    let session = state
        .account_service
        .login(&body.username, &body.password)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = LoginResponse {
        token: session.token,
        username: session.user.username.to_string(),
        role: session.user.role,
        expires_at: session.expires_at.to_rfc3339(),
    };

    Ok(Json(
        ApiResponse::success(data, request_id(), elapsed).with_link("ws", "/ws"),
    ))
}

/// POST /api/v1/auth/logout - End the current session.
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();

    let removed = state.account_service.logout(&user.token).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "logged_out": removed }),
        request_id(),
        elapsed,
    )))
}
