use crate::openai::check_status;
use crate::{LlmProvider, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    cfg: Arc<GeminiConfig>,
}

impl GeminiProvider {
    pub fn new(cfg: GeminiConfig) -> Self {
        Self::with_client(cfg, Client::new())
    }

    pub fn with_client(cfg: GeminiConfig, client: Client) -> Self {
        Self {
            client,
            cfg: Arc::new(cfg),
        }
    }

    fn url(&self) -> String {
        // Accept both "gemini-2.0-flash" and "models/gemini-2.0-flash".
        let model = self.cfg.model.trim_start_matches("models/");
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.cfg.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

fn response_text(resp: GenerateResponse) -> String {
    resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let resp = match check_status(resp).await {
            Err(ProviderError::RequestFailed(msg)) if msg.contains("RESOURCE_EXHAUSTED") => {
                return Err(ProviderError::QuotaExceeded(msg))
            }
            other => other?,
        };

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(response_text(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, respond_once};

    #[test]
    fn url_strips_models_prefix() {
        let p = GeminiProvider::new(GeminiConfig {
            api_key: "k".into(),
            base_url: format!("{}/", DEFAULT_BASE_URL),
            model: "models/gemini-2.0-flash".into(),
        });
        assert_eq!(
            p.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    fn provider(base_url: String) -> GeminiProvider {
        GeminiProvider::with_client(
            GeminiConfig {
                api_key: "test-key".into(),
                base_url,
                model: "gemini-2.0-flash".into(),
            },
            client(),
        )
    }

    #[tokio::test]
    async fn resource_exhausted_is_a_quota_error() {
        let base = respond_once(
            "403 Forbidden",
            r#"{"error":{"code":403,"status":"RESOURCE_EXHAUSTED"}}"#,
        )
        .await;
        let err = provider(base).complete("hi").await.unwrap_err();
        assert!(err.is_quota(), "{err:?}");
    }

    #[tokio::test]
    async fn too_many_requests_is_a_quota_error() {
        let base = respond_once("429 Too Many Requests", r#"{"error":{"code":429}}"#).await;
        let err = provider(base).complete("hi").await.unwrap_err();
        assert!(err.is_quota(), "{err:?}");
    }

    #[tokio::test]
    async fn bad_requests_stay_request_errors() {
        let base = respond_once(
            "400 Bad Request",
            r#"{"error":{"code":400,"status":"INVALID_ARGUMENT"}}"#,
        )
        .await;
        let err = provider(base).complete("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::RequestFailed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn returns_candidate_text() {
        let base = respond_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Paris."}]}}]}"#,
        )
        .await;
        assert_eq!(provider(base).complete("hi").await.unwrap(), "Paris.");
    }

    #[test]
    fn joins_candidate_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Paris "},{"text":"is the capital."}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response_text(parsed), "Paris is the capital.");
    }

    #[test]
    fn missing_candidates_yield_empty_text() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response_text(parsed), "");
    }
}
