//! HTTP request handlers for the REST API and the relay WebSocket.

pub mod auth;
pub mod history;
pub mod users;
pub mod ws;
