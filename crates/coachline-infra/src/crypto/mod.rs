//! Cryptographic operations for Coachline.
//!
//! - `password`: Argon2id password hashing (PHC strings)
//! - `token`: random session tokens, stored only as SHA-256 digests

pub mod password;
pub mod token;
