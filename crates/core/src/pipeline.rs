use crate::chunker::Chunker;
use crate::config::{AppConfig, RelevanceStrategy};
use crate::confidence::ConfidenceScorer;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::generator::{AnswerGenerator, PromptTemplate};
use crate::retriever::Retriever;
use crate::session::Session;
use providers::gemini::{GeminiConfig, GeminiProvider};
use providers::hashing::HashingProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use std::sync::Arc;
use tracing::{debug, info};

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Registers the built-in hashing embedder plus every backend whose
/// credentials are present in the environment.
pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new().with_embedding(
        "hashing",
        Arc::new(HashingProvider::new(config.embeddings.dimension)),
    );

    if let Some(key) = env_value("OPENAI_API_KEY") {
        let base = env_value("OPENAI_BASE_URL")
            .unwrap_or_else(|| providers::openai::DEFAULT_BASE_URL.to_string());
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key,
            base_url: base,
            embedding_model: config.embeddings.model.clone(),
            chat_model: config.generation.model.clone(),
        });
        reg = reg
            .with_embedding("openai", Arc::new(provider.clone()))
            .with_llm("openai", Arc::new(provider));
        debug!("registered openai provider");
    }

    if let Some(key) = env_value("GEMINI_API_KEY") {
        let base = env_value("GEMINI_BASE_URL")
            .unwrap_or_else(|| providers::gemini::DEFAULT_BASE_URL.to_string());
        let model = if config.generation.provider == "gemini" {
            config.generation.model.clone()
        } else {
            "gemini-2.0-flash".to_string()
        };
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: key,
            base_url: base,
            model,
        });
        reg = reg.with_llm("gemini", Arc::new(provider));
        debug!("registered gemini provider");
    }

    reg.set_preferred_embedding(&config.embeddings.provider)
        .set_preferred_llm(&config.generation.provider)
}

/// Validates `config` and wires a session from the registry's preferred
/// providers.
pub fn build_session(config: &AppConfig, registry: &ProviderRegistry) -> Result<Session> {
    config.validate()?;

    let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
    let embedder = Embedder::new(registry.embedding(None)?, config.embeddings.batch_size);
    let retriever = Retriever::new(embedder.clone(), config.retrieval.top_k);
    let template = PromptTemplate::new(&config.generation.prompt_template)?;
    let generator = AnswerGenerator::new(registry.llm(None)?, template);

    let mut scorer = ConfidenceScorer::new(config.confidence.clone());
    if config.confidence.strategy == RelevanceStrategy::Semantic {
        scorer = scorer.with_embedder(embedder.clone());
    }

    info!(
        embeddings = %config.embeddings.provider,
        llm = %config.generation.provider,
        chunk_size = config.chunking.chunk_size,
        overlap = config.chunking.overlap,
        top_k = config.retrieval.top_k,
        "session configured"
    );
    Ok(Session::new(chunker, embedder, retriever, generator, scorer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocQaError;
    use providers::{LlmProvider, ProviderError};

    struct Echo;

    #[async_trait::async_trait]
    impl LlmProvider for Echo {
        async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn hashing_embedder_is_always_registered() {
        let cfg = AppConfig::default();
        let reg = build_registry(&cfg);
        let provider = reg.embedding(Some("hashing")).unwrap();
        assert_eq!(provider.dimension(), Some(cfg.embeddings.dimension));
    }

    #[test]
    fn missing_llm_is_a_setup_error() {
        let reg = ProviderRegistry::new()
            .with_embedding("hashing", Arc::new(HashingProvider::new(8)))
            .set_preferred_embedding("hashing")
            .set_preferred_llm("nowhere");
        let err = build_session(&AppConfig::default(), &reg).err().unwrap();
        assert!(matches!(err, DocQaError::Provider(ProviderError::UnknownProvider(_))));
    }

    #[test]
    fn invalid_config_is_rejected_before_wiring() {
        let reg = ProviderRegistry::new()
            .with_embedding("hashing", Arc::new(HashingProvider::new(8)))
            .with_llm("echo", Arc::new(Echo))
            .set_preferred_embedding("hashing")
            .set_preferred_llm("echo");
        let mut cfg = AppConfig::default();
        cfg.chunking.overlap = 500;
        assert!(matches!(
            build_session(&cfg, &reg).err().unwrap(),
            DocQaError::InvalidConfig(_)
        ));
        assert!(build_session(&AppConfig::default(), &reg).is_ok());
    }
}
