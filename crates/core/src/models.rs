use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId(pub usize);

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frag-{}", self.0)
    }
}

/// A contiguous slice of document text. `source_offset` counts characters,
/// not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    id: FragmentId,
    text: String,
    source_offset: usize,
}

impl Fragment {
    pub fn new(id: FragmentId, text: impl Into<String>, source_offset: usize) -> Self {
        Self {
            id,
            text: text.into(),
            source_offset,
        }
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_offset(&self) -> usize {
        self.source_offset
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResult {
    #[serde(rename = "answer")]
    pub text: String,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Built,
    Reused,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub status: IngestStatus,
    pub message: String,
    pub success: bool,
    pub fragments: usize,
}
