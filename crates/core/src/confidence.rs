//! Grounding confidence for generated answers.
//!
//! The score is a heuristic in `0..=100`, not a probability:
//!
//! 1. relevance between question and answer (lexical token overlap, or cosine
//!    similarity of embeddings) scaled to a base score;
//! 2. answers that are mostly refusals and carry no relevant content are
//!    pinned to a fixed floor;
//! 3. a small bonus for answers ending in sentence punctuation;
//! 4. clamp.
//!
//! Refusal phrases are cut out of the answer before measuring relevance, so
//! "I don't know" never earns overlap just because the question used the word
//! "know", while the rest of a mixed sentence still counts.

use crate::config::{ConfidenceConfig, RelevanceStrategy};
use crate::embeddings::Embedder;
use crate::error::DocQaError;
use crate::index::cosine_similarity;
use std::collections::HashSet;
use tracing::{error, warn};

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "both", "but", "by", "can", "could", "did", "do",
    "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "itself", "just", "me", "more", "most", "my", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own", "s",
    "same", "she", "should", "so", "some", "such", "t", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
    "up", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "would", "you", "your", "yours",
];

/// Lowercases and folds typographic apostrophes to `'`.
fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2018}', '\u{2019}'], "'")
}

/// Lowercased alphanumeric tokens with stop words removed.
pub fn content_tokens(text: &str) -> HashSet<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// |question ∩ answer| / |question| over content tokens; 0.0 when the
/// question has no content tokens.
pub fn lexical_overlap(question: &str, answer: &str) -> f32 {
    let q = content_tokens(question);
    if q.is_empty() {
        return 0.0;
    }
    let a = content_tokens(answer);
    q.intersection(&a).count() as f32 / q.len() as f32
}

fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct AnswerAnalysis {
    sentences: usize,
    refusals: usize,
    /// Every sentence with its refusal phrases cut out, joined.
    content: String,
}

impl AnswerAnalysis {
    fn mostly_refusal(&self) -> bool {
        if self.sentences == 0 {
            return false;
        }
        if self.sentences <= 2 {
            self.refusals == self.sentences
        } else {
            self.refusals * 2 > self.sentences
        }
    }
}

#[derive(Clone)]
pub struct ConfidenceScorer {
    cfg: ConfidenceConfig,
    phrases: Vec<String>,
    embedder: Option<Embedder>,
}

impl ConfidenceScorer {
    pub fn new(cfg: ConfidenceConfig) -> Self {
        let phrases = cfg
            .refusal_phrases
            .iter()
            .map(|p| normalize(p.trim()))
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            cfg,
            phrases,
            embedder: None,
        }
    }

    /// Embedder used by the semantic strategy. Without one, semantic mode
    /// scores lexically.
    pub fn with_embedder(mut self, embedder: Embedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn strategy(&self) -> RelevanceStrategy {
        self.cfg.strategy
    }

    pub async fn score(&self, answer_text: &str, question: &str) -> u8 {
        let analysis = self.analyze(answer_text);
        if self.cfg.strategy == RelevanceStrategy::Semantic {
            if let Some(embedder) = &self.embedder {
                match semantic_relevance(embedder, question, &analysis.content).await {
                    Ok(measure) => {
                        return self.finish(
                            answer_text,
                            &analysis,
                            measure,
                            RelevanceStrategy::Semantic,
                        )
                    }
                    Err(e @ DocQaError::DimensionMismatch { .. }) => {
                        error!(error = %e, "embedding dimension changed while scoring; scoring lexically")
                    }
                    Err(e) => warn!(error = %e, "semantic relevance failed; scoring lexically"),
                }
            }
        }
        let measure = lexical_overlap(question, &analysis.content);
        self.finish(answer_text, &analysis, measure, RelevanceStrategy::Lexical)
    }

    /// Lexical scoring regardless of the configured strategy.
    pub fn score_lexical(&self, answer_text: &str, question: &str) -> u8 {
        let analysis = self.analyze(answer_text);
        let measure = lexical_overlap(question, &analysis.content);
        self.finish(answer_text, &analysis, measure, RelevanceStrategy::Lexical)
    }

    pub fn is_refusal_sentence(&self, sentence: &str) -> bool {
        let normalized = normalize(sentence);
        self.phrases.iter().any(|p| normalized.contains(p.as_str()))
    }

    fn analyze(&self, answer_text: &str) -> AnswerAnalysis {
        let normalized = normalize(answer_text);
        let all = sentences(&normalized);
        let mut refusals = 0;
        let mut content = Vec::new();
        for s in &all {
            let mut rest = s.to_string();
            let mut refused = false;
            for p in &self.phrases {
                if rest.contains(p.as_str()) {
                    refused = true;
                    rest = rest.replace(p.as_str(), " ");
                }
            }
            if refused {
                refusals += 1;
            }
            let rest = rest.trim();
            if !rest.is_empty() {
                content.push(rest.to_string());
            }
        }
        AnswerAnalysis {
            sentences: all.len(),
            refusals,
            content: content.join(". "),
        }
    }

    fn finish(
        &self,
        answer_text: &str,
        analysis: &AnswerAnalysis,
        measure: f32,
        strategy: RelevanceStrategy,
    ) -> u8 {
        let trimmed = answer_text.trim();
        if trimmed.is_empty() {
            return 0;
        }
        let measure = if measure.is_finite() {
            measure.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let scale = match strategy {
            RelevanceStrategy::Lexical => self.cfg.lexical_scale,
            RelevanceStrategy::Semantic => self.cfg.semantic_scale,
        };
        if measure <= self.cfg.threshold_for(strategy) && analysis.mostly_refusal() {
            return self.cfg.refusal_floor.min(100);
        }

        let mut score = (measure * scale).round() as i64;
        if trimmed.ends_with(['.', '!', '?']) {
            score += i64::from(self.cfg.completeness_bonus);
        }
        score.clamp(0, 100) as u8
    }
}

async fn semantic_relevance(
    embedder: &Embedder,
    question: &str,
    content: &str,
) -> crate::error::Result<f32> {
    if content_tokens(content).is_empty() {
        return Ok(0.0);
    }
    let vectors = embedder
        .embed_many(&[question.to_string(), content.to_string()])
        .await?;
    Ok(cosine_similarity(&vectors[0], &vectors[1]).max(0.0))
}
