use docqa_core::chunker::Chunker;
use docqa_core::confidence::ConfidenceScorer;
use docqa_core::config::ConfidenceConfig;
use docqa_core::embeddings::Embedder;
use docqa_core::generator::{AnswerGenerator, PromptTemplate};
use docqa_core::retriever::Retriever;
use docqa_core::Session;
use providers::hashing::HashingProvider;
use providers::{LlmProvider, ProviderError};
use std::sync::Arc;

pub const PARIS: &str = "Paris is the capital of France. It has a population of over 2 million.";

/// Answers from the prompt's context.
pub struct ContextEcho;

#[async_trait::async_trait]
impl LlmProvider for ContextEcho {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        if prompt.contains("Paris is the capital of France") {
            Ok("Paris is the capital of France.".to_string())
        } else {
            Ok("I don't know.".to_string())
        }
    }
}

pub fn session() -> Session {
    let embedder = Embedder::new(Arc::new(HashingProvider::new(128)), 16);
    Session::new(
        Chunker::new(50, 10).unwrap(),
        embedder.clone(),
        Retriever::new(embedder, 4),
        AnswerGenerator::new(
            Arc::new(ContextEcho),
            PromptTemplate::new("Context: {context}\nQuestion: {question}").unwrap(),
        ),
        ConfidenceScorer::new(ConfidenceConfig::default()),
    )
}
