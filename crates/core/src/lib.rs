//! Core library: chunking, embeddings, retrieval, answer generation and
//! confidence scoring for single-document question answering.

pub mod chunker;
pub mod confidence;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod retriever;
pub mod session;

pub use error::{DocQaError, Result};
pub use models::{AnswerResult, Fragment, FragmentId, IngestOutcome, IngestStatus, ScoredFragment};
pub use session::Session;
