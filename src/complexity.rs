//! Message complexity scoring
//!
//! Pure weighted-sum heuristic in [0, 1] used to pick a model tier for
//! reasoning personas. Each factor is non-decreasing in its own signal:
//!
//! | Factor      | Signal                               | Max share |
//! |-------------|--------------------------------------|-----------|
//! | Length      | chars, saturating at 200             | 0.40      |
//! | Analytical  | comparison / analysis vocabulary     | 0.30      |
//! | Questions   | each `?` beyond the first            | 0.20      |
//! | Context     | prior conversation turns, up to 10   | 0.10      |

use serde_json::Value;

const LENGTH_SATURATION_CHARS: usize = 200;
const LENGTH_WEIGHT: f32 = 0.4;

const ANALYTICAL_WEIGHT: f32 = 0.3;

const EXTRA_QUESTION_STEP: f32 = 0.1;
const EXTRA_QUESTION_CAP: f32 = 0.2;

const CONTEXT_SATURATION_TURNS: usize = 10;
const CONTEXT_WEIGHT: f32 = 0.1;

/// Stems, so inflections ("comparar", "comparação", "compare") all match
const ANALYTICAL_KEYWORDS: &[&str] = &[
    // English
    "compar", "analy", "project", "trend", "forecast", "simulat",
    // Portuguese
    "analis", "análise", "projeç", "projet", "tendência", "tendencia",
    "previs", "simul", "planej", "evoluç", "evoluc",
];

/// Score a message given how many prior turns the conversation has
pub fn score(message: &str, context_turns: usize) -> f32 {
    let text = message.trim();
    if text.is_empty() {
        return 0.0;
    }

    let lowered = text.to_lowercase();

    let total = length_factor(text)
        + analytical_factor(&lowered)
        + question_factor(text)
        + context_factor(context_turns);

    total.clamp(0.0, 1.0)
}

/// Score loosely-typed input; anything that is not a string scores as empty
pub fn score_value(message: &Value, context_turns: usize) -> f32 {
    score(message.as_str().unwrap_or_default(), context_turns)
}

fn length_factor(text: &str) -> f32 {
    let chars = text.chars().count().min(LENGTH_SATURATION_CHARS);
    LENGTH_WEIGHT * chars as f32 / LENGTH_SATURATION_CHARS as f32
}

fn analytical_factor(lowered: &str) -> f32 {
    if ANALYTICAL_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        ANALYTICAL_WEIGHT
    } else {
        0.0
    }
}

fn question_factor(text: &str) -> f32 {
    let extra = text.matches('?').count().saturating_sub(1);
    (extra as f32 * EXTRA_QUESTION_STEP).min(EXTRA_QUESTION_CAP)
}

fn context_factor(context_turns: usize) -> f32 {
    let turns = context_turns.min(CONTEXT_SATURATION_TURNS);
    CONTEXT_WEIGHT * turns as f32 / CONTEXT_SATURATION_TURNS as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_scores_zero() {
        assert_eq!(score("", 0), 0.0);
        assert_eq!(score("   ", 0), 0.0);
        assert_eq!(score("", 30), 0.0);
    }

    #[test]
    fn test_non_string_input_scores_as_empty() {
        assert_eq!(score_value(&serde_json::json!(42), 0), 0.0);
        assert_eq!(score_value(&Value::Null, 5), 0.0);
        assert!(score_value(&serde_json::json!("compare meus gastos"), 0) > 0.0);
    }

    #[test]
    fn test_length_monotonic_for_prefixes() {
        let full = "quanto eu gastei com restaurante e mercado nos ultimos meses e como isso se compara com o que planejei";
        let chars: Vec<char> = full.chars().collect();

        let mut previous = 0.0;
        for end in 1..=chars.len() {
            let prefix: String = chars[..end].iter().collect();
            let current = score(&prefix, 2);
            assert!(
                current >= previous,
                "score dropped at prefix {:?}: {} < {}",
                prefix,
                current,
                previous
            );
            previous = current;
        }
    }

    #[test]
    fn test_length_saturates() {
        let long = "a".repeat(LENGTH_SATURATION_CHARS);
        let longer = "a".repeat(LENGTH_SATURATION_CHARS * 3);
        assert_eq!(score(&long, 0), score(&longer, 0));
        assert!((score(&long, 0) - LENGTH_WEIGHT).abs() < 1e-6);
    }

    #[test]
    fn test_analytical_keyword_adds_increment() {
        let plain = score("meus gastos do mes", 0);
        let analytical = score("compare meus gastos", 0);
        assert!(analytical > plain);
        assert!(score("qual a tendência dos gastos", 0) >= ANALYTICAL_WEIGHT);
    }

    #[test]
    fn test_extra_questions_are_capped() {
        let one = score("a?", 0);
        let two = score("a??", 0);
        let many = score("a??????????", 0);
        assert!(two > one);
        assert!(many - one <= EXTRA_QUESTION_CAP + 0.05);
    }

    #[test]
    fn test_context_factor_monotonic_and_capped() {
        let mut previous = 0.0;
        for turns in 0..=30 {
            let current = score("oi", turns);
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(score("oi", 10), score("oi", 500));
    }

    #[test]
    fn test_score_is_clamped() {
        let message = format!(
            "{} compare e analise a tendência? projeção? simulação? mais?",
            "x".repeat(400)
        );
        let value = score(&message, 100);
        assert!(value <= 1.0);
        assert!(value > 0.9);
    }
}
