//! Configuration loader for Coachline.
//!
//! Reads `config.toml` from the data directory (`~/.coachline/` in production)
//! and deserializes it into [`RelayConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use coachline_types::config::RelayConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "COACHLINE_DATA_DIR";

/// Resolve the data directory: `COACHLINE_DATA_DIR`, else `~/.coachline`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn data_dir_from(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".coachline")
        })
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RelayConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_relay_config(data_dir: &Path) -> RelayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RelayConfig::default()
        }
    }
}
