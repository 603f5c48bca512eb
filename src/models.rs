//! Core data models for the conversation orchestrator

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::RouterConfig;

//
// ================= Pending Action =================
//

/// Action the assistant is waiting for the user to confirm or cancel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    #[default]
    None,
    CreateBudget,
    ConfirmTransaction,
    ChooseCategory,
    ReallocateBudget,
    SetGoal,
    ExplainMore,
}

impl PendingAction {
    pub fn is_none(&self) -> bool {
        matches!(self, PendingAction::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PendingAction::None => "none",
            PendingAction::CreateBudget => "create_budget",
            PendingAction::ConfirmTransaction => "confirm_transaction",
            PendingAction::ChooseCategory => "choose_category",
            PendingAction::ReallocateBudget => "reallocate_budget",
            PendingAction::SetGoal => "set_goal",
            PendingAction::ExplainMore => "explain_more",
        }
    }
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Conversation State =================
//

/// Slots extracted from dialogue text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StateContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mentioned_value: Option<f64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub last_mentioned_categories: BTreeSet<String>,
    /// 1–12
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mentioned_month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mentioned_year: Option<i32>,
}

impl StateContext {
    pub fn is_empty(&self) -> bool {
        self.last_mentioned_value.is_none()
            && self.last_mentioned_categories.is_empty()
            && self.last_mentioned_month.is_none()
            && self.last_mentioned_year.is_none()
    }
}

/// Per-user dialogue state, fully replaced at the end of every turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationState {
    /// `null` and unrecognised actions read back as `None`
    #[serde(deserialize_with = "lenient_pending_action")]
    pub pending_action: PendingAction,
    pub last_agent: Option<String>,
    pub last_question: Option<String>,
    pub awaiting_confirmation: bool,
    pub context: StateContext,
    pub turn_count: u64,
}

impl ConversationState {
    /// `awaiting_confirmation` implies a recorded question
    pub fn is_consistent(&self) -> bool {
        !self.awaiting_confirmation || self.last_question.is_some()
    }
}

fn lenient_pending_action<'de, D>(deserializer: D) -> Result<PendingAction, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default())
}

//
// ================= Short-Reply Resolution =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "action")]
pub enum ResolvedAction {
    /// Confirmation of the pending action
    Pending(PendingAction),
    Cancel,
    Recommend,
}

impl fmt::Display for ResolvedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAction::Pending(action) => write!(f, "{}", action),
            ResolvedAction::Cancel => write!(f, "cancel"),
            ResolvedAction::Recommend => write!(f, "recommend"),
        }
    }
}

/// A terse user reply tied back to the previous turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedIntent {
    pub action: ResolvedAction,
    /// `None` for help requests, which neither confirm nor cancel
    pub confirmed: Option<bool>,
    pub context: StateContext,
}

//
// ================= Personas & Routing =================
//

/// How a persona picks its model tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierPolicy {
    AlwaysFast,
    ScoreDependent,
}

/// Named dialogue role with its own prompt template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// Transaction capture from text
    Registrar,
    /// Transaction capture from a receipt image
    RegistrarVision,
    /// Financial summarizer
    Cfo,
    /// Spending viability advice
    Guardian,
    Educator,
    /// Hint the core does not know, kept verbatim
    Unrecognized(String),
}

impl Persona {
    /// Parse a caller-supplied hint. Unknown names are kept, never rejected.
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().to_lowercase().as_str() {
            "registrar" => Persona::Registrar,
            "registrar_vision" => Persona::RegistrarVision,
            "cfo" => Persona::Cfo,
            "guardian" => Persona::Guardian,
            "educator" => Persona::Educator,
            _ => Persona::Unrecognized(hint.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Persona::Registrar => "registrar",
            Persona::RegistrarVision => "registrar_vision",
            Persona::Cfo => "cfo",
            Persona::Guardian => "guardian",
            Persona::Educator => "educator",
            Persona::Unrecognized(name) => name.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Persona::Unrecognized(_))
    }

    pub fn is_narrow_extraction(&self) -> bool {
        matches!(self, Persona::Registrar | Persona::RegistrarVision)
    }

    pub fn tier_policy(&self) -> TierPolicy {
        match self {
            Persona::Cfo | Persona::Guardian => TierPolicy::ScoreDependent,
            // Unrecognized hints get the extraction policy
            Persona::Registrar
            | Persona::RegistrarVision
            | Persona::Educator
            | Persona::Unrecognized(_) => TierPolicy::AlwaysFast,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelTier {
    Fast,
    Capable,
}

impl ModelTier {
    pub fn model_id<'a>(&self, config: &'a RouterConfig) -> &'a str {
        match self {
            ModelTier::Fast => &config.fast_model,
            ModelTier::Capable => &config.capable_model,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelTier::Fast => "FAST",
            ModelTier::Capable => "CAPABLE",
        };
        write!(f, "{}", s)
    }
}

/// Per-turn routing outcome, reproducible from its inputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterDecision {
    pub persona: Persona,
    pub model_tier: ModelTier,
    pub model_id: String,
    /// Present only when the persona's policy is score-dependent
    pub complexity_score: Option<f32>,
    /// SHA-256 of the routing inputs
    pub input_hash: String,
}

//
// ================= Financial Context (read-only input) =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CategorySpend {
    pub name: String,
    pub spent: f64,
    pub budget: Option<f64>,
}

/// Snapshot assembled by the ledger subsystem before each turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FinancialContext {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
    pub by_category: Vec<CategorySpend>,
    pub recent_transactions: Vec<serde_json::Value>,
    pub active_goals: Vec<serde_json::Value>,
}

impl FinancialContext {
    /// Categories whose spend exceeds their budget
    pub fn over_budget(&self) -> impl Iterator<Item = &CategorySpend> {
        self.by_category
            .iter()
            .filter(|c| matches!(c.budget, Some(budget) if c.spent > budget))
    }

    pub fn has_budget_alerts(&self) -> bool {
        self.over_budget().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_or_unknown_pending_action_loads_as_none() {
        for raw in ["null", "\"confirm_goal\"", "42"] {
            let json = format!(
                r#"{{"pendingAction": {}, "lastAgent": "cfo", "turnCount": 7,
                    "context": {{"lastMentionedValue": 500.0}}}}"#,
                raw
            );
            let state: ConversationState = serde_json::from_str(&json).unwrap();

            assert!(state.pending_action.is_none(), "{}", raw);
            assert_eq!(state.last_agent.as_deref(), Some("cfo"));
            assert_eq!(state.turn_count, 7);
            assert_eq!(state.context.last_mentioned_value, Some(500.0));
        }

        let state: ConversationState =
            serde_json::from_str(r#"{"pendingAction": "set_goal"}"#).unwrap();
        assert_eq!(state.pending_action, PendingAction::SetGoal);
    }

    #[test]
    fn test_default_state_is_consistent() {
        let state = ConversationState::default();
        assert!(state.pending_action.is_none());
        assert!(!state.awaiting_confirmation);
        assert_eq!(state.turn_count, 0);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_state_json_uses_camel_case() {
        let mut state = ConversationState::default();
        state.pending_action = PendingAction::CreateBudget;
        state.context.last_mentioned_value = Some(1500.0);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["pendingAction"], "create_budget");
        assert_eq!(json["context"]["lastMentionedValue"], 1500.0);
        assert!(json["context"].get("lastMentionedMonth").is_none());
    }

    #[test]
    fn test_state_tolerates_partial_blob() {
        let state: ConversationState =
            serde_json::from_str(r#"{"lastAgent":"cfo","awaitingConfirmation":false}"#).unwrap();
        assert_eq!(state.last_agent.as_deref(), Some("cfo"));
        assert_eq!(state.pending_action, PendingAction::None);
    }

    #[test]
    fn test_persona_hint_parsing() {
        assert_eq!(Persona::from_hint(" CFO "), Persona::Cfo);
        assert_eq!(Persona::from_hint("registrar_vision"), Persona::RegistrarVision);

        let unknown = Persona::from_hint("astrologer");
        assert!(!unknown.is_recognized());
        assert_eq!(unknown.as_str(), "astrologer");
        assert_eq!(unknown.tier_policy(), TierPolicy::AlwaysFast);
    }

    #[test]
    fn test_over_budget_categories() {
        let context = FinancialContext {
            by_category: vec![
                CategorySpend { name: "Mercado".into(), spent: 900.0, budget: Some(800.0) },
                CategorySpend { name: "Lazer".into(), spent: 100.0, budget: Some(300.0) },
                CategorySpend { name: "Casa".into(), spent: 50.0, budget: None },
            ],
            ..Default::default()
        };

        let over: Vec<_> = context.over_budget().map(|c| c.name.as_str()).collect();
        assert_eq!(over, vec!["Mercado"]);
        assert!(context.has_budget_alerts());
    }
}
