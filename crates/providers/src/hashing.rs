//! Deterministic lexical-hash embeddings.
//!
//! Every lowercase alphanumeric token is hashed with blake3 into one of
//! `dimension` buckets with a hash-derived sign; the bucket counts are then
//! L2-normalized. Texts sharing words land close together under cosine
//! similarity, which is enough for single-document retrieval without a model.

use crate::{EmbedResponse, EmbeddingProvider, ProviderError};

#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(word) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: texts.iter().map(|t| self.embed_text(t)).collect(),
        })
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
