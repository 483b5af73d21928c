use crate::{LlmProvider, ProviderError};

/// Stand-in language model for commands that never generate, such as
/// retrieval inspection. Every call fails with `NotImplemented`.
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl LlmProvider for NoopProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
