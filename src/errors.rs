//! Error types for vectormem.

use thiserror::Error;

/// Main error type for vectormem operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (reading or writing the memory file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Memory file could not be encoded or decoded.
    #[error("Storage error: {0}")]
    Storage(#[from] bincode::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (unknown chunking mode, unsupported model, bad window).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query and candidate vectors disagree on dimensionality.
    #[error("Dimension mismatch: expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding backend produced unusable output.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Approximate search backend could not be built.
    ///
    /// Never returned from public search calls; the engine downgrades to
    /// exact search when it sees this.
    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Tokenization error.
    #[cfg(feature = "onnx")]
    #[error("Tokenization error: {0}")]
    Tokenization(#[from] tokenizers::Error),

    /// ONNX session error.
    #[cfg(feature = "onnx")]
    #[error("ONNX session error: {0}")]
    Onnx(#[from] ort::Error),

    /// HuggingFace Hub error.
    #[cfg(feature = "onnx")]
    #[error("HuggingFace Hub error: {0}")]
    HfHub(#[from] hf_hub::api::sync::ApiError),
}
