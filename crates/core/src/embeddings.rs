use crate::error::{DocQaError, Result};
use providers::{EmbeddingProvider, ProviderError};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Order-preserving embedding front end over a provider. The first vector
/// seen (or the provider's declared dimension) pins the dimensionality for
/// the lifetime of the embedder; any later deviation is a hard error.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    dimension: Arc<OnceLock<usize>>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        if !provider.deterministic() {
            warn!("embedding provider is non-deterministic; retrieval is best-effort");
        }
        let dimension = Arc::new(OnceLock::new());
        if let Some(dim) = provider.dimension() {
            let _ = dimension.set(dim);
        }
        Self {
            provider,
            batch_size: batch_size.max(1),
            dimension,
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    pub fn deterministic(&self) -> bool {
        self.provider.deterministic()
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            DocQaError::Provider(ProviderError::InvalidResponse(
                "no vector returned".into(),
            ))
        })
    }

    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let resp = self.provider.embed(batch).await?;
            if resp.vectors.len() != batch.len() {
                return Err(DocQaError::Provider(ProviderError::InvalidResponse(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    resp.vectors.len()
                ))));
            }
            for vector in resp.vectors {
                self.check_dimension(vector.len())?;
                out.push(vector);
            }
        }
        debug!(count = out.len(), "embedded texts");
        Ok(out)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        let expected = *self.dimension.get_or_init(|| actual);
        if expected != actual {
            return Err(DocQaError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }
}
