//! Provider abstractions for LLMs and embeddings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod gemini;
pub mod hashing;
pub mod noop;
pub mod openai;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not implemented")]
    NotImplemented,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl ProviderError {
    pub fn is_quota(&self) -> bool {
        matches!(self, ProviderError::QuotaExceeded(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError>;

    /// Output dimensionality when known up front.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Whether identical input always yields identical vectors.
    fn deterministic(&self) -> bool {
        true
    }
}

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    embeddings: HashMap<String, Arc<dyn EmbeddingProvider>>,
    llms: HashMap<String, Arc<dyn LlmProvider>>,
    pub preferred_embedding: Option<String>,
    pub preferred_llm: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, name: &str, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings.insert(name.to_string(), provider);
        self
    }

    pub fn with_llm(mut self, name: &str, provider: Arc<dyn LlmProvider>) -> Self {
        self.llms.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_embedding(mut self, name: &str) -> Self {
        self.preferred_embedding = Some(name.to_string());
        self
    }

    pub fn set_preferred_llm(mut self, name: &str) -> Self {
        self.preferred_llm = Some(name.to_string());
        self
    }

    pub fn embedding(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_embedding.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no embedding provider configured".into())
            })?;
        self.embeddings
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }

    pub fn llm(&self, name: Option<&str>) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_llm.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no llm provider configured".into()))?;
        self.llms
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingProvider;

    #[test]
    fn registry_resolves_preferred_embedding() {
        let reg = ProviderRegistry::new()
            .with_embedding("hashing", Arc::new(HashingProvider::new(32)))
            .set_preferred_embedding("hashing");
        let provider = reg.embedding(None).unwrap();
        assert_eq!(provider.dimension(), Some(32));
    }

    #[test]
    fn registry_reports_unknown_names() {
        let reg = ProviderRegistry::new();
        assert!(matches!(
            reg.llm(Some("missing")),
            Err(ProviderError::UnknownProvider(name)) if name == "missing"
        ));
        assert!(reg.embedding(None).is_err());
    }
}
