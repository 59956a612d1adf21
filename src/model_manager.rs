use candle_core::{Device, Tensor};
use pylate_rs::ColBERT;
use tracing::info;

use crate::{
    embedding::{Embedder, l2_normalize},
    error::{Error, Result},
};

pub const DEFAULT_MODEL_ID: &str = "lightonai/GTE-ModernColBERT-v1";
pub const MODEL_ENV_VAR: &str = "DOCSEARCH_MODEL";

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// ColBERT-backed [`Embedder`], loaded lazily on the first `embed` call.
///
/// ColBERT yields one vector per token; they are mean-pooled into a single
/// vector and L2-normalised. Queries go through the same document encoder
/// as passages so identical text gets an identical vector.
pub struct ModelManager {
    model: Option<ColBERT>,
    model_id: String,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager`. The model ID is resolved from:
    /// 1. The `DOCSEARCH_MODEL` environment variable, if set
    /// 2. Otherwise, the default model (`lightonai/GTE-ModernColBERT-v1`)
    pub fn new() -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        Self::with_model_id(model_id)
    }

    /// Creates a `ModelManager` with an explicit model ID, bypassing
    /// environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: None,
            model_id,
        }
    }

    /// Returns `true` if the model has already been loaded into memory.
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Ensures the model is loaded, downloading from HuggingFace Hub if needed.
    fn ensure_loaded(&mut self) -> Result<&mut ColBERT> {
        if self.model.is_none() {
            info!(model = %self.model_id, "loading embedding model");
            let loaded: std::result::Result<ColBERT, _> =
                ColBERT::from(&self.model_id)
                    .with_device(default_device())
                    .try_into();
            let colbert = loaded.map_err(|e| {
                Error::EmbeddingUnavailable(format!("{}: {e}", self.model_id))
            })?;
            self.model = Some(colbert);
        }

        self.model.as_mut().ok_or_else(|| {
            Error::EmbeddingUnavailable("model not loaded".to_string())
        })
    }
}

impl Embedder for ModelManager {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let model = self.ensure_loaded()?;
        // Shape [1, tokens, dim].
        let tokens = model
            .encode(&[text.to_string()], false)
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        let mut vector = mean_pool(&tokens).map_err(map_candle_err)?;
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

/// Average a `[1, tokens, dim]` tensor over its token axis.
fn mean_pool(tokens: &Tensor) -> candle_core::Result<Vec<f32>> {
    tokens.mean(1)?.squeeze(0)?.to_vec1::<f32>()
}

fn map_candle_err(e: candle_core::Error) -> Error {
    Error::EmbeddingUnavailable(format!("tensor error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_model_id() {
        let manager = ModelManager::with_model_id("custom/model".to_string());
        assert_eq!(manager.model_id(), "custom/model");
        assert!(!manager.is_loaded());
    }

    #[test]
    fn mean_pool_averages_tokens() {
        let tokens = Tensor::from_vec(
            vec![1.0f32, 0.0, 3.0, 4.0],
            (1, 2, 2),
            &Device::Cpu,
        )
        .unwrap();
        assert_eq!(mean_pool(&tokens).unwrap(), vec![2.0, 2.0]);
    }
}
