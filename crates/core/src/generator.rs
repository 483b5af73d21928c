use crate::error::{DocQaError, Result};
use providers::LlmProvider;
use std::sync::Arc;
use tracing::{error, warn};

pub const QUOTA_EXCEEDED_ANSWER: &str = "API quota exceeded, please try again later.";
pub const FAILURE_ANSWER: &str = "Error processing the request, please try again later.";
pub const EMPTY_ANSWER: &str = "No answer generated.";

/// Grounding prompt with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: &str) -> Result<Self> {
        for placeholder in ["{context}", "{question}"] {
            if !template.contains(placeholder) {
                return Err(DocQaError::InvalidConfig(format!(
                    "prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Substitutes in a single pass so placeholder-looking text inside the
    /// context is never expanded a second time.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix("{context}") {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{question}") {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    template: PromptTemplate,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, template: PromptTemplate) -> Self {
        Self { llm, template }
    }

    /// One backend call per question. Backend failures come back as
    /// sentinel answers rather than errors.
    pub async fn generate(&self, context: &str, question: &str) -> String {
        let prompt = self.template.render(context, question);
        match self.llm.complete(&prompt).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("language model returned an empty answer");
                EMPTY_ANSWER.to_string()
            }
            Ok(text) => text.trim().to_string(),
            Err(e) if e.is_quota() => {
                error!(error = %e, "language model quota exceeded");
                QUOTA_EXCEEDED_ANSWER.to_string()
            }
            Err(e) => {
                error!(error = %e, "language model call failed");
                FAILURE_ANSWER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::ProviderError;
    use std::sync::Mutex;

    struct Scripted {
        reply: fn() -> std::result::Result<String, ProviderError>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for Scripted {
        async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.reply)()
        }
    }

    fn generator(reply: fn() -> std::result::Result<String, ProviderError>) -> (AnswerGenerator, Arc<Scripted>) {
        let llm = Arc::new(Scripted {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        let template = PromptTemplate::new("C={context} Q={question}").unwrap();
        (AnswerGenerator::new(llm.clone(), template), llm)
    }

    #[test]
    fn template_requires_both_placeholders() {
        assert!(PromptTemplate::new("{context}").is_err());
        assert!(PromptTemplate::new("{question}").is_err());
        assert!(PromptTemplate::new(crate::config::DEFAULT_PROMPT_TEMPLATE).is_ok());
    }

    #[test]
    fn render_does_not_expand_placeholders_in_values() {
        let t = PromptTemplate::new("[{context}] [{question}] {other}").unwrap();
        assert_eq!(
            t.render("ctx with {question}", "why?"),
            "[ctx with {question}] [why?] {other}"
        );
    }

    #[tokio::test]
    async fn passes_rendered_prompt_and_trims_answer() {
        let (gen, llm) = generator(|| Ok("  Paris.\n".to_string()));
        let answer = gen.generate("Paris is the capital.", "Capital?").await;
        assert_eq!(answer, "Paris.");
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.as_slice(), ["C=Paris is the capital. Q=Capital?"]);
    }

    #[tokio::test]
    async fn quota_errors_become_quota_sentinel() {
        let (gen, _) = generator(|| Err(ProviderError::QuotaExceeded("429".into())));
        assert_eq!(gen.generate("c", "q").await, QUOTA_EXCEEDED_ANSWER);
    }

    #[tokio::test]
    async fn other_errors_become_failure_sentinel() {
        let (gen, _) = generator(|| Err(ProviderError::RequestFailed("boom".into())));
        assert_eq!(gen.generate("c", "q").await, FAILURE_ANSWER);
    }

    #[tokio::test]
    async fn blank_answers_are_replaced() {
        let (gen, _) = generator(|| Ok("   ".to_string()));
        assert_eq!(gen.generate("c", "q").await, EMPTY_ANSWER);
    }
}
