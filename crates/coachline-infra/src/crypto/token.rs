//! Session tokens.
//!
//! A token is 32 random bytes, hex encoded. The sessions table holds only the
//! lowercase hex SHA-256 of the token string.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use coachline_core::service::credentials::{IssuedToken, TokenIssuer};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256TokenIssuer;

impl Sha256TokenIssuer {
    pub fn new() -> Self {
        Self
    }
}

impl TokenIssuer for Sha256TokenIssuer {
    fn issue(&self) -> IssuedToken {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = hex_encode(&bytes);
        IssuedToken {
            digest: self.digest(&token),
            token,
        }
    }

    fn digest(&self, token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
