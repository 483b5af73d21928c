use providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocQaError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("unsupported document: {0}")]
    Unsupported(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DocQaError>;
