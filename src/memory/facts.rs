//! Long-term fact extraction from user messages

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_FACT_CHARS: usize = 100;

lazy_static! {
    static ref PREFERENCE: Regex =
        Regex::new(r"(?i)prefiro|gosto de|sempre (compro|gasto) em").unwrap();
    static ref GOAL: Regex =
        Regex::new(r"(?i)quero (economizar|juntar|guardar|investir)\s+(\d+)").unwrap();
    static ref INCOME: Regex =
        Regex::new(r"(?i)(ganho|recebo|meu salário é|trabalho como)\s+(.{5,50})").unwrap();
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Preference,
    Goal,
    IncomeInfo,
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::Preference => "preference",
            FactType::Goal => "goal",
            FactType::IncomeInfo => "income_info",
        }
    }
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub fact_type: FactType,
    pub fact_value: String,
}

/// Best-effort scanner for preference, goal and income phrasing
pub struct FactExtractor;

impl FactExtractor {
    pub fn extract(user_message: &str) -> Vec<ExtractedFact> {
        let mut facts = Vec::new();

        if PREFERENCE.is_match(user_message) {
            facts.push(ExtractedFact {
                fact_type: FactType::Preference,
                fact_value: truncate_chars(user_message.trim(), MAX_FACT_CHARS),
            });
        }

        if let Some(caps) = GOAL.captures(user_message) {
            facts.push(ExtractedFact {
                fact_type: FactType::Goal,
                fact_value: format!("Quer {} R${}", caps[1].to_lowercase(), &caps[2]),
            });
        }

        if let Some(found) = INCOME.find(user_message) {
            facts.push(ExtractedFact {
                fact_type: FactType::IncomeInfo,
                fact_value: truncate_chars(found.as_str(), MAX_FACT_CHARS),
            });
        }

        facts
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference() {
        let facts = FactExtractor::extract("Eu prefiro pagar tudo no débito");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].fact_type, FactType::Preference);
        assert_eq!(facts[0].fact_value, "Eu prefiro pagar tudo no débito");
    }

    #[test]
    fn test_goal_value() {
        let facts = FactExtractor::extract("Quero Economizar 5000 até dezembro");
        assert_eq!(
            facts,
            vec![ExtractedFact {
                fact_type: FactType::Goal,
                fact_value: "Quer economizar R$5000".to_string(),
            }]
        );
    }

    #[test]
    fn test_income_info() {
        let facts = FactExtractor::extract("trabalho como desenvolvedor em SP");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].fact_type, FactType::IncomeInfo);
        assert_eq!(facts[0].fact_value, "trabalho como desenvolvedor em SP");
    }

    #[test]
    fn test_preference_truncated_to_100_chars() {
        let message = format!("gosto de {}", "á".repeat(200));
        let facts = FactExtractor::extract(&message);
        assert_eq!(facts[0].fact_value.chars().count(), 100);
    }

    #[test]
    fn test_plain_question_has_no_facts() {
        assert!(FactExtractor::extract("quanto gastei ontem?").is_empty());
    }

    #[test]
    fn test_multiple_facts_in_one_message() {
        let facts = FactExtractor::extract("ganho 8 mil por mês e quero guardar 1000");
        let types: Vec<_> = facts.iter().map(|f| f.fact_type).collect();
        assert_eq!(types, vec![FactType::Goal, FactType::IncomeInfo]);
    }
}
