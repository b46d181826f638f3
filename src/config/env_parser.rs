//! Environment variable parsing utilities for configuration.

use crate::errors::Error;
use std::path::PathBuf;

use super::paths;

pub const MEMORY_FILE_VAR: &str = "VECTORMEM_MEMORY_FILE";
pub const EMBEDDING_MODEL_VAR: &str = "VECTORMEM_EMBEDDING_MODEL";
pub const CHUNKING_MODE_VAR: &str = "VECTORMEM_CHUNKING_MODE";
pub const WINDOW_SIZE_VAR: &str = "VECTORMEM_WINDOW_SIZE";
pub const OVERLAP_VAR: &str = "VECTORMEM_OVERLAP";
pub const EMBED_AT_SEARCH_VAR: &str = "VECTORMEM_EMBED_AT_SEARCH";

fn non_empty<'a>(name: &str, value: &'a str) -> Result<&'a str, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(trimmed)
}

/// Parse environment variable value or return error if empty/whitespace.
fn parse_env_string(name: &str, value: &str) -> Result<String, Error> {
    non_empty(name, value)?;
    Ok(value.to_string())
}

/// Parse environment variable as a path, expanding tilde.
fn parse_env_path(name: &str, value: &str) -> Result<PathBuf, Error> {
    non_empty(name, value)?;
    Ok(paths::expand_tilde_path(&PathBuf::from(value)))
}

/// Parse environment variable as a non-negative integer.
fn parse_env_usize(name: &str, value: &str) -> Result<usize, Error> {
    non_empty(name, value)?
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {name} value: {e}")))
}

/// Parse environment variable as a boolean (`true`/`false`, `1`/`0`, `yes`/`no`).
fn parse_env_bool(name: &str, value: &str) -> Result<bool, Error> {
    match non_empty(name, value)?.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "Invalid {name} value: '{other}' is not a boolean"
        ))),
    }
}

fn read(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Apply VECTORMEM_MEMORY_FILE environment variable override.
pub fn apply_memory_file_override(memory_file: &mut PathBuf) -> Result<(), Error> {
    if let Some(val) = read(MEMORY_FILE_VAR) {
        *memory_file = parse_env_path(MEMORY_FILE_VAR, &val)?;
    }
    Ok(())
}

/// Apply VECTORMEM_EMBEDDING_MODEL environment variable override.
pub fn apply_embedding_model_override(embedding_model: &mut String) -> Result<(), Error> {
    if let Some(val) = read(EMBEDDING_MODEL_VAR) {
        *embedding_model = parse_env_string(EMBEDDING_MODEL_VAR, &val)?;
    }
    Ok(())
}

/// Apply VECTORMEM_CHUNKING_MODE environment variable override.
pub fn apply_chunking_mode_override(chunking_mode: &mut String) -> Result<(), Error> {
    if let Some(val) = read(CHUNKING_MODE_VAR) {
        *chunking_mode = parse_env_string(CHUNKING_MODE_VAR, &val)?;
    }
    Ok(())
}

/// Apply VECTORMEM_WINDOW_SIZE environment variable override.
pub fn apply_window_size_override(window_size: &mut usize) -> Result<(), Error> {
    if let Some(val) = read(WINDOW_SIZE_VAR) {
        *window_size = parse_env_usize(WINDOW_SIZE_VAR, &val)?;
    }
    Ok(())
}

/// Apply VECTORMEM_OVERLAP environment variable override.
pub fn apply_overlap_override(overlap: &mut usize) -> Result<(), Error> {
    if let Some(val) = read(OVERLAP_VAR) {
        *overlap = parse_env_usize(OVERLAP_VAR, &val)?;
    }
    Ok(())
}

/// Apply VECTORMEM_EMBED_AT_SEARCH environment variable override.
pub fn apply_embed_at_search_override(embed_at_search: &mut bool) -> Result<(), Error> {
    if let Some(val) = read(EMBED_AT_SEARCH_VAR) {
        *embed_at_search = parse_env_bool(EMBED_AT_SEARCH_VAR, &val)?;
    }
    Ok(())
}
