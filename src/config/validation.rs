//! Configuration validation logic.

use crate::chunking::ChunkingStrategy;
use crate::errors::Error;
use std::path::PathBuf;

/// Validates configuration values.
pub struct ConfigValidator {
    /// Path to the memory file.
    pub memory_file: PathBuf,
    /// HuggingFace embedding model identifier or alias.
    pub embedding_model: String,
    /// `paragraph` or `sliding_window`.
    pub chunking_mode: String,
    pub window_size: usize,
    pub overlap: usize,
}

impl ConfigValidator {
    /// Validate all configuration values for correctness and constraints.
    ///
    /// Checks that:
    /// - Memory file path is not empty
    /// - Embedding model is not empty
    /// - Chunking mode is known and its window parameters are usable
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any validation check fails.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_memory_file()?;
        self.validate_embedding_model()?;
        self.validate_chunking()?;

        Ok(())
    }

    fn validate_memory_file(&self) -> Result<(), Error> {
        if self.memory_file.as_os_str().is_empty() {
            return Err(Error::Config("Memory file path cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_embedding_model(&self) -> Result<(), Error> {
        if self.embedding_model.trim().is_empty() {
            return Err(Error::Config("Embedding model cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_chunking(&self) -> Result<(), Error> {
        ChunkingStrategy::from_mode(&self.chunking_mode, self.window_size, self.overlap)
            .map(|_| ())
    }
}
