//! Configuration file loading and parsing.

use crate::errors::Error;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration loaded from TOML file.
///
/// Absent keys keep the built-in defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub memory_file: PathBuf,

    #[serde(default)]
    pub embedding_model: String,

    #[serde(default)]
    pub chunking_mode: String,

    #[serde(default)]
    pub window_size: Option<usize>,

    #[serde(default)]
    pub overlap: Option<usize>,

    #[serde(default)]
    pub embed_at_search: Option<bool>,
}

/// Location of the user config file: `<config_dir>/vectormem/config.toml`.
pub fn config_file_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let config_dir = dirs::config_dir().unwrap_or_else(|| home.join(".config"));
    config_dir.join("vectormem/config.toml")
}

/// Load configuration from the user config file, if present.
pub fn load_from_file() -> Result<Option<ConfigFile>, Error> {
    load_from_path(&config_file_path())
}

/// Load configuration from `config_path`; a missing file is not an error.
pub fn load_from_path(config_path: &Path) -> Result<Option<ConfigFile>, Error> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(config_path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {e}",
            config_path.display()
        ))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file {}: {e}",
            config_path.display()
        ))
    })?;

    Ok(Some(config))
}
