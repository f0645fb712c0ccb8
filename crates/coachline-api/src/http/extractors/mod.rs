//! Custom Axum extractors.

pub mod auth;
