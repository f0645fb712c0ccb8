//! Infrastructure layer for Coachline.
//!
//! Contains implementations of the traits defined in `coachline-core`:
//! SQLite storage for accounts, messages and sessions, Argon2 password
//! hashing, SHA-256 session token digests, and the `config.toml` loader.

pub mod config;
pub mod crypto;
pub mod sqlite;
