//! Single-document question answering session.
//!
//! Holds at most one active index. `ingest` builds a replacement index off to
//! the side and swaps it in with one pointer write; `ask` clones the current
//! pointer and never holds a lock while talking to backends.

use crate::chunker::Chunker;
use crate::confidence::ConfidenceScorer;
use crate::embeddings::Embedder;
use crate::error::{DocQaError, Result};
use crate::generator::{AnswerGenerator, FAILURE_ANSWER};
use crate::index::VectorIndex;
use crate::models::{AnswerResult, IngestOutcome, IngestStatus, ScoredFragment};
use crate::retriever::{assemble_context, Retriever};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

pub const NO_DOCUMENT_ANSWER: &str = "No document loaded. Please upload a document first.";
pub const EMPTY_QUESTION_ANSWER: &str = "Please ask a question.";
pub const BUILT_MESSAGE: &str = "Document processed and index updated.";
pub const REUSED_MESSAGE: &str = "Same document detected. Reusing existing index.";
pub const EMPTY_DOCUMENT_MESSAGE: &str = "Document contains no text.";
pub const FAILED_MESSAGE: &str = "Error while processing the uploaded document.";

/// blake3 hex digest of the document text.
pub fn fingerprint(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Debug)]
pub struct ActiveDocument {
    pub fingerprint: String,
    pub index: VectorIndex,
}

pub struct Session {
    chunker: Chunker,
    embedder: Embedder,
    retriever: Retriever,
    generator: AnswerGenerator,
    scorer: ConfidenceScorer,
    active: RwLock<Option<Arc<ActiveDocument>>>,
    ingest_lock: Mutex<()>,
    next_version: AtomicU64,
}

impl Session {
    pub fn new(
        chunker: Chunker,
        embedder: Embedder,
        retriever: Retriever,
        generator: AnswerGenerator,
        scorer: ConfidenceScorer,
    ) -> Self {
        Self {
            chunker,
            embedder,
            retriever,
            generator,
            scorer,
            active: RwLock::new(None),
            ingest_lock: Mutex::new(()),
            next_version: AtomicU64::new(1),
        }
    }

    /// Indexes `document_text` unless it is the document already loaded.
    ///
    /// Backend failures are reported through the outcome and leave the
    /// previous index in place. Dimension mismatches and invalid settings are
    /// returned as errors.
    pub async fn ingest(&self, document_text: &str) -> Result<IngestOutcome> {
        if document_text.trim().is_empty() {
            warn!("rejected empty document");
            return Ok(IngestOutcome {
                status: IngestStatus::Rejected,
                message: EMPTY_DOCUMENT_MESSAGE.to_string(),
                success: false,
                fragments: 0,
            });
        }

        let _guard = self.ingest_lock.lock().await;
        let fp = fingerprint(document_text);
        if let Some(current) = self.active().await {
            if current.fingerprint == fp {
                info!(version = current.index.version(), "document unchanged, reusing index");
                return Ok(IngestOutcome {
                    status: IngestStatus::Reused,
                    message: REUSED_MESSAGE.to_string(),
                    success: true,
                    fragments: current.index.len(),
                });
            }
        }

        let fragments = self.chunker.split(document_text);
        let texts: Vec<String> = fragments.iter().map(|f| f.text().to_string()).collect();
        let vectors = match self.embedder.embed_many(&texts).await {
            Ok(v) => v,
            Err(e @ DocQaError::DimensionMismatch { .. }) => return Err(e),
            Err(e) => {
                error!(error = %e, "embedding document failed");
                return Ok(IngestOutcome {
                    status: IngestStatus::Failed,
                    message: FAILED_MESSAGE.to_string(),
                    success: false,
                    fragments: 0,
                });
            }
        };

        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let index = VectorIndex::build(fragments, vectors, version)?;
        let count = index.len();
        let document = Arc::new(ActiveDocument {
            fingerprint: fp,
            index,
        });
        *self.active.write().await = Some(document);
        info!(version, fragments = count, "index built");

        Ok(IngestOutcome {
            status: IngestStatus::Built,
            message: BUILT_MESSAGE.to_string(),
            success: true,
            fragments: count,
        })
    }

    pub async fn ask(&self, question: &str) -> AnswerResult {
        let Some(document) = self.active().await else {
            warn!("question asked before any document was loaded");
            return AnswerResult {
                text: NO_DOCUMENT_ANSWER.to_string(),
                confidence: 0,
                context: String::new(),
            };
        };
        if question.trim().is_empty() {
            return AnswerResult {
                text: EMPTY_QUESTION_ANSWER.to_string(),
                confidence: 0,
                context: String::new(),
            };
        }

        let hits = match self.retriever.retrieve(&document.index, question).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                let text = FAILURE_ANSWER.to_string();
                let confidence = self.scorer.score(&text, question).await;
                return AnswerResult {
                    text,
                    confidence,
                    context: String::new(),
                };
            }
        };
        let context = assemble_context(&hits);
        let text = self.generator.generate(&context, question).await;
        let confidence = self.scorer.score(&text, question).await;
        info!(confidence, fragments = hits.len(), "answered question");
        AnswerResult {
            text,
            confidence,
            context,
        }
    }

    /// Retrieval only, for inspection. Empty when no document is loaded.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredFragment>> {
        match self.active().await {
            Some(document) => self.retriever.retrieve(&document.index, question).await,
            None => Ok(Vec::new()),
        }
    }

    /// Drops the active document. Waits for any in-progress ingest.
    pub async fn reset(&self) {
        let _guard = self.ingest_lock.lock().await;
        *self.active.write().await = None;
        info!("session reset");
    }

    pub async fn active(&self) -> Option<Arc<ActiveDocument>> {
        self.active.read().await.clone()
    }

    pub async fn version(&self) -> Option<u64> {
        self.active().await.map(|d| d.index.version())
    }

    pub async fn built_at(&self) -> Option<DateTime<Utc>> {
        self.active().await.map(|d| d.index.built_at())
    }
}
