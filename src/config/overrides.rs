//! Environment variable overrides for configuration.

use crate::errors::Error;

use super::Config;
use super::env_parser;

/// Apply environment variable overrides to configuration.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), Error> {
    env_parser::apply_memory_file_override(&mut config.memory_file)?;
    env_parser::apply_embedding_model_override(&mut config.embedding_model)?;
    env_parser::apply_chunking_mode_override(&mut config.chunking_mode)?;
    env_parser::apply_window_size_override(&mut config.window_size)?;
    env_parser::apply_overlap_override(&mut config.overlap)?;
    env_parser::apply_embed_at_search_override(&mut config.embed_at_search)?;
    Ok(())
}
