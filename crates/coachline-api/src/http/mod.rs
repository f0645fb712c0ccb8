//! HTTP/REST API layer for Coachline.
//!
//! Axum-based REST API at `/api/v1/` with session-token authentication,
//! envelope response format, and CORS support, plus the `/ws` relay endpoint.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
