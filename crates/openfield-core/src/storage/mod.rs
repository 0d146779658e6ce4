mod config;

pub use config::{Config, DisplayConfig, ExportConfig, TrialDefaults};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/openfield[-dev]/` based on OPENFIELD_ENV.
///
/// Set OPENFIELD_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("OPENFIELD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("openfield-dev")
    } else {
        base_dir.join("openfield")
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::NoDataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
