//! Text-to-vector conversion.
//!
//! The [`Embedder`] trait is the seam the memory store embeds through. With the
//! `onnx` feature enabled, [`OnnxEmbedder`] provides a synchronous ONNX engine
//! (mean pooling and L2 normalization over a HuggingFace sentence model).

use crate::errors::Error;

/// Default HuggingFace model used when none is configured.
pub const DEFAULT_MODEL: &str = "BAAI/bge-small-en-v1.5";

/// Converts a batch of fragments into fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input fragment, in input
/// order, and keep the same dimensionality across calls.
///
/// # Mutability Requirements
///
/// `embed` takes `&mut self` because inference engines may reuse internal
/// buffers between calls. Embedders must be `Send` so a store can move to
/// another thread or sit behind a `Mutex`.
pub trait Embedder: Send {
    /// Embed every fragment in `fragments`.
    fn embed(&mut self, fragments: &[String]) -> Result<Vec<Vec<f32>>, Error>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&mut self, fragments: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        (**self).embed(fragments)
    }
}

/// Resolve a short model alias to a HuggingFace model ID.
///
/// `normal` and `best` map to the bge family. The TensorFlow-Hub universal
/// sentence encoders (`fast`, `multilingual`) have no ONNX export and are
/// rejected.
///
/// # Errors
///
/// Returns `Error::Config` for an empty or unsupported model name.
pub fn resolve_model(name: &str) -> Result<String, Error> {
    match name.trim() {
        "" => Err(Error::Config("Embedding model cannot be empty".to_string())),
        "normal" => Ok("BAAI/bge-small-en-v1.5".to_string()),
        "best" => Ok("BAAI/bge-base-en-v1.5".to_string()),
        alias @ ("fast" | "multilingual") => Err(Error::Config(format!(
            "Embedding model '{alias}' requires TensorFlow Hub and is not supported"
        ))),
        model_id => Ok(model_id.to_string()),
    }
}

/// Scale a vector to unit length (zero vectors stay zero).
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    let norm = norm.max(1e-9);

    vec.iter().map(|&x| x / norm).collect()
}

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxEmbedder;

#[cfg(feature = "onnx")]
mod onnx {
    use hf_hub::api::sync::Api;
    use ort::inputs;
    use ort::session::Session;
    use ort::session::builder::GraphOptimizationLevel;
    use ort::value::Tensor;
    use tokenizers::{Tokenizer, TruncationParams};

    use super::{Embedder, l2_normalize, resolve_model};
    use crate::errors::Error;

    /// ONNX embedding engine for synchronous text-to-vector conversion.
    pub struct OnnxEmbedder {
        session: Session,
        tokenizer: Tokenizer,
        requires_token_type_ids: bool,
        model_id: String,
    }

    impl OnnxEmbedder {
        /// Load model from cache or download on first use.
        ///
        /// Uses `hf_hub::api::sync::Api` with the ureq backend, so loading is
        /// fully blocking. Files are cached in the HF Hub cache and only
        /// downloaded once.
        pub fn new(model: &str) -> Result<Self, Error> {
            let model_id = resolve_model(model)?;
            let api = Api::new()?;
            let repo = api.model(model_id.clone());

            let model_path = repo
                .get("onnx/model.onnx")
                .or_else(|_| repo.get("model.onnx"))?;
            let tokenizer_path = repo.get("tokenizer.json")?;

            let mut tokenizer = Tokenizer::from_file(tokenizer_path)?;
            tokenizer
                .with_padding(None)
                .with_truncation(Some(TruncationParams {
                    max_length: 512,
                    ..Default::default()
                }))?;

            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level1)
                .map_err(ort::Error::from)?
                .commit_from_file(&model_path)?;

            let requires_token_type_ids = session
                .inputs()
                .iter()
                .any(|input| input.name() == "token_type_ids");

            tracing::info!(model = %model_id, "Loaded ONNX embedding model");

            Ok(OnnxEmbedder {
                session,
                tokenizer,
                requires_token_type_ids,
                model_id,
            })
        }

        /// HuggingFace model ID this engine was loaded from.
        pub fn model_id(&self) -> &str {
            &self.model_id
        }

        /// Embed a single text: mean pooling over the attention mask, then L2
        /// normalization. Texts over 512 tokens are truncated.
        fn embed_one(&mut self, text: &str) -> Result<Vec<f32>, Error> {
            let encoding = self.tokenizer.encode(text, true)?;
            let input_ids = encoding.get_ids();
            let attention_mask = encoding.get_attention_mask();
            let seq_len = input_ids.len();

            if seq_len == 0 {
                return Err(Error::Embedding(format!(
                    "Tokenizer produced no tokens for input: {text:?}"
                )));
            }

            let input_ids_vec: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
            let attention_mask_vec: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();

            let input_ids_tensor = Tensor::from_array(([1usize, seq_len], input_ids_vec))?;
            let attention_mask_tensor =
                Tensor::from_array(([1usize, seq_len], attention_mask_vec))?;

            let outputs = if self.requires_token_type_ids {
                let token_type_ids_tensor =
                    Tensor::from_array(([1usize, seq_len], vec![0i64; seq_len]))?;
                self.session.run(inputs![
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                    "token_type_ids" => token_type_ids_tensor
                ])?
            } else {
                self.session.run(inputs![
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor
                ])?
            };

            let (shape, data) = outputs
                .get("last_hidden_state")
                .or_else(|| outputs.get("token_embeddings"))
                .ok_or_else(|| {
                    Error::Embedding(
                        "Output tensor 'last_hidden_state' or 'token_embeddings' not found"
                            .to_string(),
                    )
                })?
                .try_extract_tensor::<f32>()?;

            if shape.len() != 3 || shape[0] != 1 || shape[2] <= 0 {
                return Err(Error::Embedding(format!(
                    "Expected output shape (1, seq_len, hidden), got {shape:?}"
                )));
            }
            let hidden_dim = shape[2] as usize;

            let mut pooled = vec![0.0f32; hidden_dim];
            for (token_idx, token) in data.chunks(hidden_dim).take(seq_len).enumerate() {
                let mask_value = attention_mask.get(token_idx).copied().unwrap_or(0) as f32;
                for (pooled_value, &value) in pooled.iter_mut().zip(token) {
                    *pooled_value += value * mask_value;
                }
            }

            let mask_sum: f32 = attention_mask
                .iter()
                .take(seq_len)
                .map(|&m| m as f32)
                .sum::<f32>()
                .max(1e-9);
            for value in pooled.iter_mut() {
                *value /= mask_sum;
            }

            Ok(l2_normalize(&pooled))
        }
    }

    impl Embedder for OnnxEmbedder {
        fn embed(&mut self, fragments: &[String]) -> Result<Vec<Vec<f32>>, Error> {
            fragments.iter().map(|text| self.embed_one(text)).collect()
        }
    }

}
