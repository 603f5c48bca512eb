//! State extraction from the assistant's outgoing response
//!
//! Pure function of the response text: the previous state is never read,
//! a fresh [`ConversationState`] is built for the next turn.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

use super::rules::{compile, Rule, RuleSet};
use crate::models::{ConversationState, PendingAction, StateContext};

/// Fixed category vocabulary scanned in responses
pub const CATEGORY_VOCABULARY: &[&str] = &[
    "mercado", "restaurante", "casa", "carro", "saúde", "lazer",
    "educação", "vestuário", "transporte", "alimentação", "moradia",
    "entretenimento", "viagem", "investimento", "salário", "cartão",
    "financiamento", "farmácia", "uber", "ifood",
];

const MONTH_NAMES: &[&str] = &[
    "janeiro", "fevereiro", "março", "abril", "maio", "junho",
    "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
];

lazy_static! {
    /// Confirmation phrasing that counts as a question even without `?`
    static ref QUESTION_PHRASES: Vec<Regex> = compile(&[
        r"(?i)quer que eu",
        r"(?i)gostaria de",
        r"(?i)prefere",
        r"(?i)o que acha",
        r"(?i)pode confirmar",
        r"(?i)posso (criar|definir|registrar)",
        r"(?i)devo (continuar|prosseguir)",
    ]);

    static ref ACTION_RULES: RuleSet<PendingAction> = RuleSet::new(vec![
        Rule::any_pattern(PendingAction::CreateBudget, &[
            r"criar.*or[çc]amento",
            r"definir.*limite",
            r"montar.*or[çc]amento",
            r"configurar.*or[çc]amento",
            r"quer que eu defina",
            r"quer que eu crie.*or[çc]amento",
        ]),
        Rule::any_pattern(PendingAction::ConfirmTransaction, &[
            r"registr(ar|o|ei)",
            r"anotar",
            r"quer que eu registre",
            r"posso registrar",
            r"salvar.*transa[çc][ãa]o",
        ]),
        Rule::any_pattern(PendingAction::ChooseCategory, &[
            r"qual categoria",
            r"escolher categoria",
            r"categoria certa",
            r"em qual categoria",
        ]),
        Rule::any_pattern(PendingAction::ReallocateBudget, &[
            r"realocar",
            r"transferir.*or[çc]amento",
            r"mover.*verba",
            r"redistribuir",
        ]),
        Rule::any_pattern(PendingAction::SetGoal, &[
            r"criar.*meta",
            r"criar.*objetivo",
            r"definir.*objetivo",
            r"estabelecer.*meta",
        ]),
        Rule::any_pattern(PendingAction::ExplainMore, &[
            r"quer saber mais",
            r"explicar mais",
            r"posso detalhar",
            r"quer que eu explique",
            r"quer mais detalhes",
        ]),
    ]);

    static ref CURRENCY_VALUE: Regex =
        Regex::new(r"r\$\s*(\d+(?:\.\d{3})*(?:,\d{1,2})?)").unwrap();
    static ref REAIS_VALUE: Regex =
        Regex::new(r"(\d+(?:\.\d{3})*(?:,\d{1,2})?)\s*reais").unwrap();
    static ref THOUSANDS_VALUE: Regex =
        Regex::new(r"\b(\d+)\s*(?:mil|k)\b").unwrap();

    static ref MONTH: Regex = Regex::new(&format!(r"\b({})\b", MONTH_NAMES.join("|"))).unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(20[2-3][0-9])\b").unwrap();
}

/// Build the next-turn state from the assistant's response.
///
/// A pending action is only recorded when the response ends up asking
/// something; statements never leave anything to confirm.
pub fn extract(response: &str, persona: &str) -> ConversationState {
    let lowered = response.to_lowercase();

    let last_question = last_question(response);
    let pending_action = match last_question {
        Some(_) => ACTION_RULES.first_match(&lowered).unwrap_or(PendingAction::None),
        None => PendingAction::None,
    };

    ConversationState {
        pending_action,
        last_agent: Some(persona.to_string()).filter(|p| !p.is_empty()),
        awaiting_confirmation: last_question.is_some(),
        last_question,
        context: extract_context(&lowered),
        turn_count: 0,
    }
}

/// Slot extraction on its own, for callers that already lower-cased
pub fn extract_context(lowered: &str) -> StateContext {
    StateContext {
        last_mentioned_value: extract_value(lowered),
        last_mentioned_categories: extract_categories(lowered),
        last_mentioned_month: MONTH
            .captures(lowered)
            .and_then(|c| MONTH_NAMES.iter().position(|m| *m == &c[1]))
            .map(|idx| idx as u8 + 1),
        last_mentioned_year: YEAR
            .captures(lowered)
            .and_then(|c| c[1].parse::<i32>().ok()),
    }
}

fn is_question(clause: &str) -> bool {
    clause.trim_end().ends_with('?') || QUESTION_PHRASES.iter().any(|re| re.is_match(clause))
}

/// Last interrogative clause, in the response's original casing
fn last_question(response: &str) -> Option<String> {
    split_clauses(response)
        .into_iter()
        .filter(|clause| is_question(clause))
        .last()
        .map(|clause| clause.trim().to_string())
        .filter(|clause| !clause.is_empty())
}

/// Split on sentence terminators. `?` always ends a clause; `.` and `!`
/// only when followed by whitespace, so "R$1.500,00" stays intact.
fn split_clauses(text: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let end = idx + ch.len_utf8();
        let boundary = match ch {
            '?' => true,
            '.' | '!' => chars.peek().map_or(true, |(_, next)| next.is_whitespace()),
            _ => false,
        };

        if boundary {
            clauses.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        clauses.push(&text[start..]);
    }

    clauses
}

/// First currency amount, Brazilian convention ("1.234,56" → 1234.56)
fn extract_value(lowered: &str) -> Option<f64> {
    if let Some(caps) = CURRENCY_VALUE.captures(lowered) {
        return parse_brl(&caps[1]);
    }

    if let Some(caps) = REAIS_VALUE.captures(lowered) {
        return parse_brl(&caps[1]);
    }

    THOUSANDS_VALUE
        .captures(lowered)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .map(|v| v * 1000.0)
}

fn parse_brl(raw: &str) -> Option<f64> {
    raw.replace('.', "").replace(',', ".").parse::<f64>().ok()
}

fn extract_categories(lowered: &str) -> BTreeSet<String> {
    CATEGORY_VOCABULARY
        .iter()
        .filter(|cat| lowered.contains(**cat))
        .map(|cat| cat.to_string())
        .collect()
}
