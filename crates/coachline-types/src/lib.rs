//! Shared domain types for Coachline.
//!
//! Users and identities, the chat wire frame, stored messages and history
//! entries, configuration, and the error enums shared across crates.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod message;
pub mod user;
