//! Turn orchestrator - runs one chat turn end to end
//!
//! STATE → MEMORY → PERSONA → ROUTE → RESOLVE → PROMPT → LLM → EXTRACT → PERSIST
//!
//! Only contract violations are returned as errors. Store, memory and LLM
//! failures degrade the turn and are logged.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{DecisionLog, RoutingInputs};
use crate::classifier::{PersonaClassifier, TurnSignals};
use crate::config::OrchestratorConfig;
use crate::dialogue::{extract, state_instruction, ShortReplyResolver};
use crate::error::{with_timeout, OrchestrationError};
use crate::llm::{ChatMessage, ImageInput, LlmClient, LlmRequest};
use crate::memory::{ContextSummarizer, MemoryStore, TieredMemoryManager};
use crate::models::{ConversationState, FinancialContext, Persona, ResolvedIntent, RouterDecision};
use crate::prompts::build_system_prompt;
use crate::router::ModelRouter;
use crate::state::{ConversationStateStore, ConversationStore};
use crate::Result;

/// Reply used when the LLM call fails or times out
pub const APOLOGY_REPLY: &str =
    "Desculpe, tive um problema para responder agora. Pode tentar de novo em instantes?";

/// Sent to the model when the user only attached an image
const IMAGE_ONLY_MESSAGE: &str = "Analise esta imagem";

/// Transcript placeholder for image-only turns
const IMAGE_TRANSCRIPT_MARKER: &str = "[imagem]";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub message: Option<String>,
    /// Caller-selected persona; classified from the message when absent
    #[serde(default)]
    pub persona_hint: Option<String>,
    #[serde(default)]
    pub image: Option<ImageInput>,
    #[serde(default)]
    pub financial_context: FinancialContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub persona: Persona,
    pub response: String,
    pub decision: RouterDecision,
    /// State persisted for the next turn
    pub state: ConversationState,
    pub resolved_intent: Option<ResolvedIntent>,
    pub audit_id: Option<Uuid>,
    /// True when the reply is the fallback apology
    pub degraded: bool,
}

pub struct ChatOrchestrator {
    llm: Arc<dyn LlmClient>,
    router: ModelRouter,
    resolver: ShortReplyResolver,
    state_store: ConversationStateStore,
    memory: TieredMemoryManager,
    decisions: DecisionLog,
    completion_timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(
        config: &OrchestratorConfig,
        llm: Arc<dyn LlmClient>,
        conversation_store: Arc<dyn ConversationStore>,
        memory_store: Arc<dyn MemoryStore>,
    ) -> Self {
        let summarizer = ContextSummarizer::new(llm.clone(), config.router.fast_model.clone());

        Self {
            router: ModelRouter::with_config(config.router.clone()),
            resolver: ShortReplyResolver::new(),
            state_store: ConversationStateStore::new(conversation_store, config.timeouts.store),
            memory: TieredMemoryManager::new(
                memory_store,
                summarizer,
                config.memory.clone(),
                config.timeouts.clone(),
            ),
            decisions: DecisionLog::new(),
            completion_timeout: config.timeouts.completion,
            llm,
        }
    }

    /// Replace the built-in short-reply vocabulary
    pub fn with_resolver(mut self, resolver: ShortReplyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn memory(&self) -> &TieredMemoryManager {
        &self.memory
    }

    pub fn state_store(&self) -> &ConversationStateStore {
        &self.state_store
    }

    pub fn decisions(&self) -> &DecisionLog {
        &self.decisions
    }

    /// Run one chat turn
    pub async fn handle_turn(&self, request: ChatTurnRequest) -> Result<ChatTurnResponse> {
        let start_time = Instant::now();
        validate(&request)?;

        let user_id = request.user_id;
        let message = request
            .message
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        info!(
            user_id = %user_id,
            has_image = request.image.is_some(),
            "Chat turn received"
        );

        // === STATE & MEMORY ===
        let previous = self.state_store.get(user_id).await;
        let memory = self.memory.assemble(user_id, &message).await;

        // === PERSONA & ROUTE ===
        let persona_hint = match request.persona_hint.as_deref().map(str::trim) {
            Some(hint) if !hint.is_empty() => hint.to_string(),
            _ => {
                let signals = TurnSignals::new(request.image.is_some(), &request.financial_context);
                PersonaClassifier::classify(&message, &signals).as_str().to_string()
            }
        };

        let context_turns = memory.short_term.len();
        let decision = self
            .router
            .route(Some(persona_hint.as_str()), &message, context_turns, &previous)?;

        // === RESOLVE ===
        let resolved_intent = self.resolver.resolve(&message, &previous);
        if let Some(intent) = &resolved_intent {
            debug!(user_id = %user_id, action = %intent.action, "Short reply resolved");
        }

        // === PROMPT ===
        let instruction = state_instruction(&previous, resolved_intent.as_ref());
        let system_prompt = build_system_prompt(
            &decision.persona,
            &request.financial_context,
            &TieredMemoryManager::format_long_term(&memory),
            &instruction,
            Utc::now().date_naive(),
        );

        let history = memory
            .short_term
            .iter()
            .map(|turn| ChatMessage {
                role: turn.role,
                content: turn.content.clone(),
            })
            .collect();

        let user_text = if message.is_empty() {
            IMAGE_ONLY_MESSAGE.to_string()
        } else {
            message.clone()
        };

        let llm_request = LlmRequest::new(decision.model_id.clone(), system_prompt, user_text)
            .with_history(history)
            .with_image(request.image.clone());

        // === LLM ===
        let (response, degraded) = match with_timeout(
            self.completion_timeout,
            "LLM completion",
            self.llm.complete(&llm_request),
        )
        .await
        {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    persona = %decision.persona,
                    model = %decision.model_id,
                    error = %e,
                    "LLM call failed, replying with apology"
                );
                (APOLOGY_REPLY.to_string(), true)
            }
        };

        // === EXTRACT & PERSIST ===
        let mut state = extract(&response, decision.persona.as_str());
        state.turn_count = previous.turn_count + 1;
        self.state_store.put(user_id, &state).await;

        if !degraded {
            let transcript_text = if message.is_empty() {
                IMAGE_TRANSCRIPT_MARKER
            } else {
                message.as_str()
            };

            if let Err(e) = self
                .memory
                .record_exchange(user_id, transcript_text, &response, Some(decision.persona.as_str()))
                .await
            {
                warn!(user_id = %user_id, error = %e, "Failed to record transcript");
            }
        }

        if !message.is_empty() {
            self.memory.extract_and_save_facts(user_id, &message).await;
        }

        let audit_id = match self
            .decisions
            .record(
                user_id,
                RoutingInputs {
                    persona_hint,
                    message,
                    context_turns,
                },
                decision.clone(),
            )
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to record routing decision");
                None
            }
        };

        info!(
            user_id = %user_id,
            persona = %decision.persona,
            tier = %decision.model_tier,
            pending_action = %state.pending_action,
            turn = state.turn_count,
            degraded,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Chat turn complete"
        );

        Ok(ChatTurnResponse {
            persona: decision.persona.clone(),
            response,
            decision,
            state,
            resolved_intent,
            audit_id,
            degraded,
        })
    }

    /// Forget any pending exchange for the user
    pub async fn reset_state(&self, user_id: Uuid) -> Result<()> {
        if user_id.is_nil() {
            return Err(OrchestrationError::ContractViolation(
                "user_id must not be empty".to_string(),
            ));
        }

        self.state_store.reset(user_id).await;
        info!(user_id = %user_id, "Conversation state reset");
        Ok(())
    }
}

fn validate(request: &ChatTurnRequest) -> Result<()> {
    if request.user_id.is_nil() {
        return Err(OrchestrationError::ContractViolation(
            "user_id must not be empty".to_string(),
        ));
    }

    let has_text = request
        .message
        .as_deref()
        .map(|m| !m.trim().is_empty())
        .unwrap_or(false);

    if !has_text && request.image.is_none() {
        return Err(OrchestrationError::ContractViolation(
            "a turn needs a message or an image".to_string(),
        ));
    }

    Ok(())
}
