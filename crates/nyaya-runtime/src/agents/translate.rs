//! Translation between the supported languages.

use nyaya_core::Language;
use std::sync::Arc;

use super::{AgentError, AgentKind};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::prompts::translate_prompt;

/// Low temperature keeps translations literal.
pub const TRANSLATE_TEMPERATURE: f32 = 0.3;

pub struct TranslateAgent {
    gateway: Arc<CompletionGateway>,
}

impl TranslateAgent {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Translate `text` to `target`.
    ///
    /// Unknown target codes translate to English; an unknown source code is
    /// treated as absent.
    pub async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<String, AgentError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let target = Language::from_code_or_default(target);
        let source = source.and_then(|code| code.parse::<Language>().ok());
        let request = CompletionRequest::new(translate_prompt(text, target, source))
            .with_temperature(TRANSLATE_TEMPERATURE);

        let translated = self
            .gateway
            .complete(AgentKind::Translate, request)
            .await?;
        tracing::debug!(agent = %AgentKind::Translate, target = %target, chars = text.chars().count(), "Translated");
        Ok(translated.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::*;

    #[tokio::test]
    async fn test_translates_and_trims() {
        let provider = Arc::new(ScriptedProvider::constant("\nకిరాయి ప్రతి నెల 5వ తేదీలోగా చెల్లించాలి.\n"));
        let agent = TranslateAgent::new(gateway(provider.clone()));

        let translated = agent
            .translate("Rent is due by the 5th of every month.", "te", Some("en"))
            .await
            .unwrap();

        assert_eq!(translated, "కిరాయి ప్రతి నెల 5వ తేదీలోగా చెల్లించాలి.");
        let prompt = prompt_of(&provider.calls()[0]).to_string();
        assert!(prompt.contains("to Telugu"));
        assert!(prompt.contains("written in English"));
    }

    #[tokio::test]
    async fn test_unknown_codes() {
        let provider = Arc::new(ScriptedProvider::constant("Hello"));
        let agent = TranslateAgent::new(gateway(provider.clone()));

        agent.translate("नमस्ते", "xx", Some("yy")).await.unwrap();

        let prompt = prompt_of(&provider.calls()[0]).to_string();
        assert!(prompt.contains("to English"));
        assert!(prompt.contains("automatically"));
    }

    #[tokio::test]
    async fn test_empty_text_skips_model() {
        let provider = Arc::new(ScriptedProvider::constant("x"));
        let agent = TranslateAgent::new(gateway(provider.clone()));

        assert_eq!(agent.translate("  ", "hi", None).await.unwrap(), "");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_surfaced() {
        let agent = TranslateAgent::new(gateway(Arc::new(ScriptedProvider::failing())));

        let err = agent.translate("Hello", "hi", None).await.unwrap_err();
        assert!(matches!(err, AgentError::Gateway(_)));
    }
}
