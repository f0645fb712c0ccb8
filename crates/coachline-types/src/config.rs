//! Configuration types for Coachline.
//!
//! `RelayConfig` represents the top-level `config.toml`. Every field has a
//! default so an empty or missing file yields a working server.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.coachline/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Listener address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Behaviour of the message relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Send an ack frame back to the sender after each delivery attempt.
    #[serde(default)]
    pub acknowledge_delivery: bool,

    /// Inbound frames with longer content are rejected and end the connection.
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,
}

fn default_max_content_bytes() -> usize {
    4096
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            acknowledge_delivery: false,
            max_content_bytes: default_max_content_bytes(),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
}

fn default_session_ttl_hours() -> u32 {
    24
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}
