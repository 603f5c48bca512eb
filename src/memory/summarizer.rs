//! Context Summarization
//!
//! Compresses the medium-term slice of the transcript into two or three
//! sentences with a single cheap-tier LLM call.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::OrchestrationError;
use crate::llm::{LlmClient, LlmRequest};
use crate::memory::store::{MessageRole, TranscriptTurn};
use crate::Result;

const SUMMARY_SYSTEM_PROMPT: &str =
    "Você é um assistente que cria resumos concisos de conversas financeiras.";

pub struct ContextSummarizer {
    llm: Arc<dyn LlmClient>,
    model: String,
    max_output_tokens: u32,
}

impl ContextSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            max_output_tokens: 300,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Summarize `turns` (chronological) into a short paragraph
    pub async fn summarize(&self, turns: &[TranscriptTurn]) -> Result<String> {
        if turns.is_empty() {
            return Err(OrchestrationError::LlmError(
                "Cannot summarize empty transcript".to_string(),
            ));
        }

        let prompt = format!(
            r#"Resuma esta conversa em 2-3 frases, focando em:
1. O que o usuário perguntou/pediu
2. Decisões tomadas
3. Informações importantes mencionadas

Conversa:
{}

Resumo conciso:"#,
            Self::format_turns_for_summary(turns)
        );

        info!(model = %self.model, turns = turns.len(), "Summarizing older conversation turns");

        let request = LlmRequest::new(self.model.clone(), SUMMARY_SYSTEM_PROMPT, prompt)
            .with_max_output_tokens(self.max_output_tokens);

        let summary = self.llm.complete(&request).await.map_err(|e| {
            warn!("Failed to summarize context: {}", e);
            e
        })?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(OrchestrationError::LlmError("Empty summary".to_string()));
        }

        Ok(summary.to_string())
    }

    /// One line per turn, labelled by speaker
    pub fn format_turns_for_summary(turns: &[TranscriptTurn]) -> String {
        turns
            .iter()
            .map(|turn| format!("{}: {}", speaker_label(turn.role), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub(crate) fn speaker_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "Usuário",
        MessageRole::Assistant => "Zeni",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn sample_turns() -> Vec<TranscriptTurn> {
        vec![
            TranscriptTurn::user("Quanto gastei com mercado?"),
            TranscriptTurn::assistant("Você gastou R$ 850 com mercado.", Some("cfo".to_string())),
        ]
    }

    #[test]
    fn test_format_turns_for_summary() {
        let formatted = ContextSummarizer::format_turns_for_summary(&sample_turns());
        assert_eq!(
            formatted,
            "Usuário: Quanto gastei com mercado?\nZeni: Você gastou R$ 850 com mercado."
        );
    }

    #[tokio::test]
    async fn test_summarize_uses_configured_model() {
        let llm = Arc::new(MockLlmClient::new("  O usuário revisou gastos com mercado.  "));
        let summarizer = ContextSummarizer::new(llm.clone(), "gemini-2.0-flash");

        let summary = summarizer.summarize(&sample_turns()).await.unwrap();
        assert_eq!(summary, "O usuário revisou gastos com mercado.");

        let requests = llm.requests().await;
        assert_eq!(requests[0].model, "gemini-2.0-flash");
        assert!(requests[0].user_message.contains("Usuário: Quanto gastei"));
    }

    #[tokio::test]
    async fn test_summarize_empty_is_error() {
        let llm = Arc::new(MockLlmClient::new("x"));
        let summarizer = ContextSummarizer::new(llm.clone(), "fast");

        assert!(summarizer.summarize(&[]).await.is_err());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_reply_is_error() {
        let summarizer = ContextSummarizer::new(Arc::new(MockLlmClient::new("   ")), "fast");
        assert!(summarizer.summarize(&sample_turns()).await.is_err());
    }
}
