//! Persona Classifier
//!
//! Picks the persona for a turn when the caller does not supply one:
//! - RegistrarVision: an image is attached
//! - Registrar: transaction phrasing ("50 mercado", "paguei 100 de luz")
//! - Guardian: spending viability ("posso gastar 200?") or any budget alert
//! - Educator: concept questions ("o que é CDI?")
//! - Cfo: everything else

use lazy_static::lazy_static;

use crate::dialogue::Rule;
use crate::models::{FinancialContext, Persona};

/// Static pattern lists, checked case-insensitively on trimmed input
const TRANSACTION_PATTERNS: &[&str] = &[
    r"\d+.*reais?",
    r"r\$\s*\d+",
    r"gastei|paguei|comprei|recebi|gasto|pagamento",
    // "50 mercado"
    r"^\d+\s+\w+",
    // "mercado 50"
    r"^\w+\s+\d+",
];

const GUARDIAN_PATTERNS: &[&str] = &[r"posso (gastar|comprar)"];

const EDUCATIONAL_PATTERNS: &[&str] = &[
    r"o que [eé]",
    r"como funciona",
    r"me explica",
    r"qual a diferen[cç]a",
    r"significa",
];

lazy_static! {
    static ref TRANSACTION: Rule<Persona> =
        Rule::any_pattern(Persona::Registrar, TRANSACTION_PATTERNS);
    static ref GUARDIAN: Rule<Persona> = Rule::any_pattern(Persona::Guardian, GUARDIAN_PATTERNS);
    static ref EDUCATIONAL: Rule<Persona> =
        Rule::any_pattern(Persona::Educator, EDUCATIONAL_PATTERNS);
}

/// Non-text facts about the turn that affect persona choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnSignals {
    pub has_image: bool,
    pub has_budget_alerts: bool,
}

impl TurnSignals {
    pub fn new(has_image: bool, financial_context: &FinancialContext) -> Self {
        Self {
            has_image,
            has_budget_alerts: financial_context.has_budget_alerts(),
        }
    }
}

pub struct PersonaClassifier;

impl PersonaClassifier {
    pub fn classify(message: &str, signals: &TurnSignals) -> Persona {
        if signals.has_image {
            return Persona::RegistrarVision;
        }

        let input = message.trim().to_lowercase();

        if TRANSACTION.matches(&input) {
            Persona::Registrar
        } else if GUARDIAN.matches(&input) || signals.has_budget_alerts {
            Persona::Guardian
        } else if EDUCATIONAL.matches(&input) {
            Persona::Educator
        } else {
            Persona::Cfo
        }
    }
}
