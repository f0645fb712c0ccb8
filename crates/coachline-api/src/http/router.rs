//! Axum router configuration with middleware.
//!
//! REST routes are under `/api/v1/`; the relay WebSocket is at `/ws`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Accounts
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        // Directory
        .route("/users", get(handlers::users::list_users))
        // Stored conversations
        .route("/history", get(handlers::history::get_history));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws", get(handlers::ws::relay_ws))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness plus the number of live relay connections (no auth required).
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "online": state.relay.registry().len(),
    }))
}
