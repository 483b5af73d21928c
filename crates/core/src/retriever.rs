use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::ScoredFragment;
use tracing::debug;

/// Top-k retrieval over a built index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Embedder, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, index: &VectorIndex, question: &str) -> Result<Vec<ScoredFragment>> {
        if index.is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed_one(question).await?;
        let hits = index.query(&query_vector, self.top_k)?;
        debug!(
            hits = hits.len(),
            top = hits.first().map(|h| h.similarity).unwrap_or_default(),
            "retrieved fragments"
        );
        Ok(hits)
    }
}

/// Joins fragment texts in retrieval order with single spaces.
pub fn assemble_context(hits: &[ScoredFragment]) -> String {
    hits.iter()
        .map(|h| h.fragment.text())
        .collect::<Vec<_>>()
        .join(" ")
}
