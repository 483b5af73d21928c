use crate::error::{DocQaError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are a smart bot that answers questions based only on the context given to you.\n\
You don't make things up.\n\
Context: {context}\n\
Question: {question}\n";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 256,
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    pub prompt_template: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceStrategy {
    #[default]
    Lexical,
    Semantic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub strategy: RelevanceStrategy,
    pub lexical_scale: f32,
    pub semantic_scale: f32,
    pub completeness_bonus: u8,
    pub refusal_floor: u8,
    /// Relevance at or below this counts as "no overlap" for refusal
    /// detection. Unset means 0.0 for lexical and 0.3 for semantic.
    pub refusal_threshold: Option<f32>,
    pub refusal_phrases: Vec<String>,
}

impl ConfidenceConfig {
    pub fn effective_threshold(&self) -> f32 {
        self.threshold_for(self.strategy)
    }

    pub fn threshold_for(&self, strategy: RelevanceStrategy) -> f32 {
        self.refusal_threshold.unwrap_or(match strategy {
            RelevanceStrategy::Lexical => 0.0,
            RelevanceStrategy::Semantic => 0.3,
        })
    }
}

pub fn default_refusal_phrases() -> Vec<String> {
    [
        "does not contain information",
        "doesn't contain information",
        "does not provide information",
        "cannot find",
        "can't find",
        "could not find",
        "i don't know",
        "i do not know",
        "no information available",
        "not mentioned",
        "not provided in the context",
        "unable to answer",
        "quota exceeded",
        "error processing",
        "no answer generated",
        "no document loaded",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            strategy: RelevanceStrategy::Lexical,
            lexical_scale: 70.0,
            semantic_scale: 100.0,
            completeness_bonus: 5,
            refusal_floor: 10,
            refusal_threshold: None,
            refusal_phrases: default_refusal_phrases(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl AppConfig {
    /// Rejects settings the pipeline cannot run with. Called once at setup.
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(DocQaError::InvalidConfig("chunk_size must be > 0".into()));
        }
        if c.overlap >= c.chunk_size {
            return Err(DocQaError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                c.overlap, c.chunk_size
            )));
        }
        if self.embeddings.dimension == 0 {
            return Err(DocQaError::InvalidConfig(
                "embeddings.dimension must be > 0".into(),
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(DocQaError::InvalidConfig(
                "embeddings.batch_size must be > 0".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(DocQaError::InvalidConfig("retrieval.top_k must be > 0".into()));
        }
        crate::generator::PromptTemplate::new(&self.generation.prompt_template)?;

        let s = &self.confidence;
        for (name, v) in [
            ("lexical_scale", s.lexical_scale),
            ("semantic_scale", s.semantic_scale),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(DocQaError::InvalidConfig(format!(
                    "confidence.{} must be a non-negative number",
                    name
                )));
            }
        }
        if s.refusal_floor > 100 {
            return Err(DocQaError::InvalidConfig(
                "confidence.refusal_floor must be within 0..=100".into(),
            ));
        }
        let t = s.effective_threshold();
        if !(0.0..=1.0).contains(&t) {
            return Err(DocQaError::InvalidConfig(
                "confidence.refusal_threshold must be within 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Loads `path` (or `config/default` when present), then `DOCQA__*`
/// environment overrides, e.g. `DOCQA__RETRIEVAL__TOP_K=6`.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("DOCQA")
            .separator("__")
            .try_parsing(true),
    );
    let cfg: AppConfig = settings.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
