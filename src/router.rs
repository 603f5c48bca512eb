//! Agent/model router
//!
//! Accepts the caller's persona as-is and only decides the model tier.
//! Policy precedence:
//! 1. narrow extraction personas → FAST, no scoring
//! 2. reasoning personas → FAST when score ≤ threshold, else CAPABLE
//! 3. unrecognized hints fall back to the extraction policy

use tracing::{debug, info};

use crate::audit::{compute_input_hash, RoutingInputs};
use crate::complexity;
use crate::config::RouterConfig;
use crate::error::OrchestrationError;
use crate::models::{ConversationState, ModelTier, Persona, RouterDecision, TierPolicy};
use crate::Result;

pub struct ModelRouter {
    config: RouterConfig,
}

impl ModelRouter {
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
        }
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Pick the model tier for this turn.
    ///
    /// A missing or blank hint is a caller bug and is the only error path.
    /// The previous turn's state never changes the tier; the decision
    /// depends only on the hashed inputs.
    pub fn route(
        &self,
        persona_hint: Option<&str>,
        message: &str,
        context_turns: usize,
        _state: &ConversationState,
    ) -> Result<RouterDecision> {
        let hint = match persona_hint.map(str::trim) {
            Some(h) if !h.is_empty() => h,
            _ => {
                return Err(OrchestrationError::ContractViolation(
                    "router requires a persona hint".to_string(),
                ))
            }
        };

        let persona = Persona::from_hint(hint);

        let (model_tier, complexity_score) = match persona.tier_policy() {
            TierPolicy::AlwaysFast => (ModelTier::Fast, None),
            TierPolicy::ScoreDependent => {
                let score = complexity::score(message, context_turns);
                let tier = if score <= self.config.complexity_threshold {
                    ModelTier::Fast
                } else {
                    ModelTier::Capable
                };
                (tier, Some(score))
            }
        };

        if !persona.is_recognized() {
            info!(hint = %hint, "Unrecognized persona hint, using extraction policy");
        }

        let input_hash = compute_input_hash(&RoutingInputs {
            persona_hint: hint.to_string(),
            message: message.to_string(),
            context_turns,
        });

        let decision = RouterDecision {
            model_id: model_tier.model_id(&self.config).to_string(),
            persona,
            model_tier,
            complexity_score,
            input_hash,
        };

        debug!(
            persona = %decision.persona,
            tier = %decision.model_tier,
            score = ?decision.complexity_score,
            "Routing decision"
        );

        Ok(decision)
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PendingAction;

    const SIMPLE: &str = "como estou?";
    const ANALYTICAL: &str = "Compare meus gastos de restaurante e mercado dos últimos três meses, \
        analise a tendência e faça uma projeção de quanto vou gastar até dezembro considerando \
        que recebi um aumento de salário em março e quero guardar mais dinheiro";

    fn route(hint: &str, message: &str) -> RouterDecision {
        ModelRouter::new()
            .route(Some(hint), message, 2, &ConversationState::default())
            .unwrap()
    }

    #[test]
    fn test_narrow_personas_always_fast() {
        for hint in ["registrar", "registrar_vision"] {
            for message in [SIMPLE, ANALYTICAL, ""] {
                let decision = route(hint, message);
                assert_eq!(decision.model_tier, ModelTier::Fast);
                assert!(decision.complexity_score.is_none());
            }
        }
    }

    #[test]
    fn test_reasoning_personas_follow_score() {
        let router = ModelRouter::new();
        for hint in ["cfo", "guardian"] {
            for message in [SIMPLE, ANALYTICAL] {
                let decision = router
                    .route(Some(hint), message, 2, &ConversationState::default())
                    .unwrap();
                let expected = if complexity::score(message, 2) > 0.5 {
                    ModelTier::Capable
                } else {
                    ModelTier::Fast
                };
                assert_eq!(decision.model_tier, expected);
                assert_eq!(decision.complexity_score, Some(complexity::score(message, 2)));
            }
        }

        assert_eq!(route("cfo", SIMPLE).model_tier, ModelTier::Fast);
        assert_eq!(route("cfo", ANALYTICAL).model_tier, ModelTier::Capable);
    }

    #[test]
    fn test_persona_is_never_switched() {
        let decision = route("guardian", "50 mercado");
        assert_eq!(decision.persona, Persona::Guardian);
    }

    #[test]
    fn test_unrecognized_hint_falls_back_to_fast() {
        let decision = route("fortune_teller", ANALYTICAL);
        assert_eq!(decision.model_tier, ModelTier::Fast);
        assert_eq!(decision.persona.as_str(), "fortune_teller");
    }

    #[test]
    fn test_missing_hint_is_contract_violation() {
        let router = ModelRouter::new();
        let state = ConversationState::default();

        let err = router.route(None, SIMPLE, 0, &state).unwrap_err();
        assert!(err.is_contract_violation());

        let err = router.route(Some("  "), SIMPLE, 0, &state).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_decision_is_reproducible() {
        let a = route("cfo", ANALYTICAL);
        let b = route("cfo", ANALYTICAL);
        assert_eq!(a, b);
        assert_eq!(a.model_id, "gemini-2.5-pro");
    }

    #[test]
    fn test_custom_threshold() {
        let router = ModelRouter::with_config(RouterConfig {
            complexity_threshold: 0.0,
            ..RouterConfig::default()
        });
        let decision = router
            .route(Some("cfo"), SIMPLE, 0, &ConversationState::default())
            .unwrap();
        assert_eq!(decision.model_tier, ModelTier::Capable);
    }

    #[test]
    fn test_previous_state_does_not_change_decision() {
        let router = ModelRouter::new();
        let mut follow_up = ConversationState {
            pending_action: PendingAction::CreateBudget,
            last_agent: Some("cfo".to_string()),
            last_question: Some("Quer que eu crie um orçamento?".to_string()),
            awaiting_confirmation: true,
            turn_count: 9,
            ..Default::default()
        };
        follow_up.context.last_mentioned_value = Some(1200.0);

        for (hint, message) in [("cfo", SIMPLE), ("cfo", ANALYTICAL), ("registrar", "50 mercado")] {
            let fresh = router
                .route(Some(hint), message, 2, &ConversationState::default())
                .unwrap();
            let continued = router.route(Some(hint), message, 2, &follow_up).unwrap();
            assert_eq!(fresh, continued, "{}", hint);
        }
    }
}
