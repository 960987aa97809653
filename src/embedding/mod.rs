//! Text-to-vector embedding for diary entries.
//!
//! [`EmbeddingProvider`] is the seam between the diary index and whatever turns
//! text into vectors. The shipped implementation runs all-MiniLM-L6-v2 locally
//! (384 dimensions, L2-normalized); see [`local`].

pub mod local;

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::config::EmbeddingConfig;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Turns diary text into L2-normalized vectors of exactly [`EMBEDDING_DIM`] dimensions.
///
/// Calls are synchronous and CPU-bound; async callers should go through
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Create an embedding provider from config.
///
/// Only `"local"` is supported. Fails if the model files are missing; run
/// `pictolog model download` first.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}

/// Builds the configured provider on first use.
///
/// Commands that only read entries by date or id never embed anything, so they
/// should not require the model to be downloaded.
pub struct DeferredProvider {
    config: EmbeddingConfig,
    inner: Mutex<Option<Arc<dyn EmbeddingProvider>>>,
}

impl DeferredProvider {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
        }
    }

    fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let mut slot = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("embedding provider lock poisoned"))?;
        if let Some(provider) = slot.as_ref() {
            return Ok(Arc::clone(provider));
        }
        let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&self.config)?);
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }
}

impl EmbeddingProvider for DeferredProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.provider()?.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.provider()?.embed_batch(texts)
    }
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
