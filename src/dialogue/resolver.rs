//! Short-reply resolution
//!
//! Ties a terse user message ("sim", "não", "me ajuda") back to the action
//! the assistant left pending. Tokens are matched against the whole
//! normalized message, never as substrings.

use lazy_static::lazy_static;
use regex::Regex;

use super::rules::{Rule, RuleSet};
use crate::models::{ConversationState, ResolvedAction, ResolvedIntent};

/// Classification of a short reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortReply {
    Affirmative,
    Negative,
    HelpRequest,
}

/// Token sets recognized as short replies
#[derive(Debug, Clone)]
pub struct ShortReplyVocabulary {
    pub affirmative: Vec<String>,
    pub negative: Vec<String>,
    pub help: Vec<String>,
}

impl Default for ShortReplyVocabulary {
    fn default() -> Self {
        let owned = |tokens: &[&str]| tokens.iter().map(|t| t.to_string()).collect();

        Self {
            affirmative: owned(&[
                "sim", "quero", "ok", "isso", "pode", "claro", "bora", "vamos",
                "por favor", "afirmativo", "yes", "s", "confirma", "confirmo", "aceito",
            ]),
            negative: owned(&[
                "não", "nao", "n", "nunca", "jamais", "deixa", "cancela", "esquece",
            ]),
            help: owned(&[
                "ajuda",
                "me ajuda",
                "o que (vc|você) (indica|sugere|recomenda)",
                "indica",
                "sugere",
                "recomenda",
            ]),
        }
    }
}

lazy_static! {
    static ref DEFAULT_RESOLVER: ShortReplyResolver = ShortReplyResolver::new();
}

pub struct ShortReplyResolver {
    rules: RuleSet<ShortReply>,
}

impl ShortReplyResolver {
    pub fn new() -> Self {
        Self::with_vocabulary(&ShortReplyVocabulary::default())
    }

    pub fn with_vocabulary(vocabulary: &ShortReplyVocabulary) -> Self {
        Self {
            rules: RuleSet::new(vec![
                anchored_rule(ShortReply::Affirmative, &vocabulary.affirmative),
                anchored_rule(ShortReply::Negative, &vocabulary.negative),
                anchored_rule(ShortReply::HelpRequest, &vocabulary.help),
            ]),
        }
    }

    pub fn classify(&self, user_message: &str) -> Option<ShortReply> {
        self.rules.first_match(&normalize(user_message))
    }

    /// Resolve a short reply against the previous turn's state.
    ///
    /// `None` means the message must be treated as a fresh utterance.
    pub fn resolve(&self, user_message: &str, state: &ConversationState) -> Option<ResolvedIntent> {
        match self.classify(user_message)? {
            ShortReply::Affirmative if !state.pending_action.is_none() => Some(ResolvedIntent {
                action: ResolvedAction::Pending(state.pending_action),
                confirmed: Some(true),
                context: state.context.clone(),
            }),
            ShortReply::Negative if !state.pending_action.is_none() => Some(ResolvedIntent {
                action: ResolvedAction::Cancel,
                confirmed: Some(false),
                context: state.context.clone(),
            }),
            ShortReply::HelpRequest => Some(ResolvedIntent {
                action: ResolvedAction::Recommend,
                confirmed: None,
                context: state.context.clone(),
            }),
            _ => None,
        }
    }
}

impl Default for ShortReplyResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve with the built-in vocabulary
pub fn resolve(user_message: &str, state: &ConversationState) -> Option<ResolvedIntent> {
    DEFAULT_RESOLVER.resolve(user_message, state)
}

/// Trimmed, lower-cased, trailing sentence punctuation dropped ("Sim!" → "sim")
fn normalize(message: &str) -> String {
    message
        .trim()
        .to_lowercase()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?') || c.is_whitespace())
        .to_string()
}

/// One alternation anchored at both ends. Tokens are regex fragments.
fn anchored_rule(label: ShortReply, tokens: &[String]) -> Rule<ShortReply> {
    let alternation = tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("|");

    if alternation.is_empty() {
        return Rule::new(label, |_: &str| false);
    }

    match Regex::new(&format!(r"^(?:{})$", alternation)) {
        Ok(re) => Rule::new(label, move |text| re.is_match(text)),
        Err(e) => {
            tracing::warn!(?label, error = %e, "Invalid short-reply vocabulary, rule disabled");
            Rule::new(label, |_: &str| false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PendingAction;

    fn state_with(action: PendingAction) -> ConversationState {
        let mut state = ConversationState {
            pending_action: action,
            awaiting_confirmation: true,
            last_question: Some("Quer que eu crie um orçamento?".to_string()),
            ..Default::default()
        };
        state.context.last_mentioned_value = Some(1000.0);
        state
    }

    #[test]
    fn test_affirmative_confirms_pending_action() {
        let state = state_with(PendingAction::CreateBudget);

        for reply in ["sim", "quero", "ok", "pode", "claro", "bora", "  Sim! ", "por favor"] {
            let resolved = resolve(reply, &state).unwrap_or_else(|| panic!("{:?}", reply));
            assert_eq!(resolved.action, ResolvedAction::Pending(PendingAction::CreateBudget));
            assert_eq!(resolved.confirmed, Some(true));
            assert_eq!(resolved.context.last_mentioned_value, Some(1000.0));
        }
    }

    #[test]
    fn test_negative_cancels() {
        let state = state_with(PendingAction::CreateBudget);

        for reply in ["não", "nao", "cancela", "deixa", "N"] {
            let resolved = resolve(reply, &state).unwrap();
            assert_eq!(resolved.action, ResolvedAction::Cancel);
            assert_eq!(resolved.confirmed, Some(false));
        }
    }

    #[test]
    fn test_help_request_independent_of_pending_action() {
        for state in [state_with(PendingAction::CreateBudget), ConversationState::default()] {
            for reply in ["me ajuda", "o que você sugere?", "o que vc recomenda", "indica"] {
                let resolved = resolve(reply, &state).unwrap();
                assert_eq!(resolved.action, ResolvedAction::Recommend);
                assert_eq!(resolved.confirmed, None);
            }
        }
    }

    #[test]
    fn test_nothing_to_confirm_without_pending_action() {
        let state = ConversationState::default();
        assert!(resolve("sim", &state).is_none());
        assert!(resolve("não", &state).is_none());
    }

    #[test]
    fn test_longer_sentences_are_not_short_replies() {
        let state = state_with(PendingAction::CreateBudget);
        for message in [
            "quanto gastei ontem?",
            "ok mas quanto sobrou?",
            "sim, e o mercado?",
            "me ajuda a entender meus gastos com mercado",
            "não sei",
        ] {
            assert!(resolve(message, &state).is_none(), "{:?}", message);
        }
    }

    #[test]
    fn test_classify_token_sets_are_disjoint() {
        let resolver = ShortReplyResolver::new();
        let vocab = ShortReplyVocabulary::default();

        for token in &vocab.affirmative {
            assert_eq!(resolver.classify(token), Some(ShortReply::Affirmative), "{}", token);
        }
        for token in &vocab.negative {
            assert_eq!(resolver.classify(token), Some(ShortReply::Negative), "{}", token);
        }
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut vocabulary = ShortReplyVocabulary::default();
        vocabulary.affirmative.push("manda ver".to_string());
        let resolver = ShortReplyResolver::with_vocabulary(&vocabulary);

        let resolved = resolver
            .resolve("manda ver", &state_with(PendingAction::SetGoal))
            .unwrap();
        assert_eq!(resolved.action, ResolvedAction::Pending(PendingAction::SetGoal));
        assert!(resolve("manda ver", &state_with(PendingAction::SetGoal)).is_none());
    }
}
