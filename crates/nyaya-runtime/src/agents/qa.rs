//! Question answering over a structured document.

use nyaya_core::fallback::apology;
use nyaya_core::{ChatAnswer, DocumentInfo, Language};
use std::sync::Arc;

use super::AgentKind;
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::prompts::{qa_prompt, qa_system_prompt};

/// Sampling temperature for conversational answers.
pub const QA_TEMPERATURE: f32 = 0.7;

pub struct QaAgent {
    gateway: Arc<CompletionGateway>,
}

impl QaAgent {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Answer `question` about `doc` in the language named by `language`.
    ///
    /// Unsupported codes answer in English, but `ChatAnswer.language`
    /// echoes the code as given. A failed model call returns an apology in
    /// the requested language, with the error in `error`.
    pub async fn answer(&self, question: &str, doc: &DocumentInfo, requested: &str) -> ChatAnswer {
        let language = Language::from_code_or_default(requested);
        let request = CompletionRequest::new(qa_prompt(question, doc, language))
            .with_system(qa_system_prompt(language))
            .with_temperature(QA_TEMPERATURE);

        match self.gateway.complete(AgentKind::Qa, request).await {
            Ok(answer) => ChatAnswer {
                answer: answer.trim().to_string(),
                language: requested.to_string(),
                question: question.to_string(),
                error: None,
            },
            Err(error) => {
                tracing::warn!(agent = %AgentKind::Qa, language = %language, error = %error, "Answer failed, returning apology");
                ChatAnswer {
                    answer: apology(language).to_string(),
                    language: requested.to_string(),
                    question: question.to_string(),
                    error: Some(error.to_string()),
                }
            }
        }
    }
}
