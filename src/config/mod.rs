//! Configuration system for vectormem.

mod env_parser;
mod loader;
mod overrides;
mod paths;
mod validation;

#[cfg(test)]
mod tests_utils;

use crate::chunking::{ChunkingStrategy, DEFAULT_OVERLAP, DEFAULT_WINDOW_SIZE};
use crate::embedding::DEFAULT_MODEL;
use crate::errors::Error;
use crate::memory::{EmbeddingMode, MemoryOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use loader::{ConfigFile, config_file_path};

/// Configuration values with priority: defaults < config file < env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the memory file.
    #[serde(default)]
    pub memory_file: PathBuf,

    /// HuggingFace embedding model identifier or alias (`normal`, `best`).
    #[serde(default)]
    pub embedding_model: String,

    /// `paragraph` or `sliding_window`.
    #[serde(default)]
    pub chunking_mode: String,

    /// Sliding window size, in tokens.
    #[serde(default)]
    pub window_size: usize,

    /// Tokens shared by consecutive windows.
    #[serde(default)]
    pub overlap: usize,

    /// Store bare fragments and embed everything at search time.
    #[serde(default)]
    pub embed_at_search: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_file: paths::data_dir().join("memory.bin"),
            embedding_model: DEFAULT_MODEL.to_string(),
            chunking_mode: "sliding_window".to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
            overlap: DEFAULT_OVERLAP,
            embed_at_search: false,
        }
    }
}

impl Config {
    /// Load configuration with defaults, file values, and environment overrides.
    pub fn load() -> Result<Self, Error> {
        Self::layered(loader::load_from_file()?)
    }

    /// Like [`Config::load`], reading the config file at `config_path` instead
    /// of the user config directory.
    pub fn load_from(config_path: &Path) -> Result<Self, Error> {
        Self::layered(loader::load_from_path(config_path)?)
    }

    fn layered(file_config: Option<ConfigFile>) -> Result<Self, Error> {
        let mut config = Config::default();

        if let Some(mut file) = file_config {
            paths::expand_tilde(&mut file.memory_file);
            config.merge_from_file(file);
        }

        overrides::apply_env_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Merge configuration from a file into this config.
    fn merge_from_file(&mut self, file: ConfigFile) {
        if !file.memory_file.as_os_str().is_empty() {
            self.memory_file = file.memory_file;
        }
        if !file.embedding_model.is_empty() {
            self.embedding_model = file.embedding_model;
        }
        if !file.chunking_mode.is_empty() {
            self.chunking_mode = file.chunking_mode;
        }
        if let Some(window_size) = file.window_size {
            self.window_size = window_size;
        }
        if let Some(overlap) = file.overlap {
            self.overlap = overlap;
        }
        if let Some(embed_at_search) = file.embed_at_search {
            self.embed_at_search = embed_at_search;
        }
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), Error> {
        let validator = validation::ConfigValidator {
            memory_file: self.memory_file.clone(),
            embedding_model: self.embedding_model.clone(),
            chunking_mode: self.chunking_mode.clone(),
            window_size: self.window_size,
            overlap: self.overlap,
        };

        validator.validate()
    }

    /// The segmentation strategy named by `chunking_mode`.
    pub fn chunking_strategy(&self) -> Result<ChunkingStrategy, Error> {
        ChunkingStrategy::from_mode(&self.chunking_mode, self.window_size, self.overlap)
    }

    pub fn embedding_mode(&self) -> EmbeddingMode {
        if self.embed_at_search {
            EmbeddingMode::Lazy
        } else {
            EmbeddingMode::Eager
        }
    }

    /// Construction options for a [`crate::Memory`] backed by `memory_file`.
    pub fn memory_options(&self) -> Result<MemoryOptions, Error> {
        Ok(MemoryOptions {
            memory_file: Some(self.memory_file.clone()),
            chunking: self.chunking_strategy()?,
            embedding_mode: self.embedding_mode(),
        })
    }

    /// Ensure the memory file's parent directory exists.
    pub fn ensure_directories(&self) -> Result<(), Error> {
        if let Some(parent) = self.memory_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!(
                        "Failed to create memory directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        Ok(())
    }
}
