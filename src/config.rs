//! Runtime configuration
//!
//! Defaults mirror the production constants; every value can be
//! overridden from the environment (a `.env` file is honoured).

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Tiered memory limits
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Turns kept verbatim (K)
    pub short_term_limit: usize,
    /// Transcript lookback loaded per turn (M)
    pub lookback_limit: usize,
    /// Older turns needed before a summary is worth generating
    pub min_turns_to_summarize: usize,
    /// How long a generated summary is reused
    pub summary_ttl: Duration,
    /// Durable facts handed to the prompt
    pub max_facts: usize,
    /// Summaries older than this are removed by cleanup
    pub summary_retention_days: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_limit: 6,
            lookback_limit: 20,
            min_turns_to_summarize: 3,
            summary_ttl: Duration::from_secs(60 * 60),
            max_facts: 10,
            summary_retention_days: 7,
        }
    }
}

/// Model tier selection
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Score above which reasoning personas get the capable tier
    pub complexity_threshold: f32,
    pub fast_model: String,
    pub capable_model: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: 0.5,
            fast_model: "gemini-2.0-flash".to_string(),
            capable_model: "gemini-2.5-pro".to_string(),
        }
    }
}

/// Upper bounds for every external call
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub store: Duration,
    pub summarization: Duration,
    pub completion: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store: Duration::from_millis(5_000),
            summarization: Duration::from_millis(15_000),
            completion: Duration::from_millis(30_000),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub memory: MemoryConfig,
    pub router: RouterConfig,
    pub timeouts: TimeoutConfig,
    pub database_url: Option<String>,
    pub llm_api_key: Option<String>,
}

impl OrchestratorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let memory = MemoryConfig {
            short_term_limit: parse_var("MEMORY_SHORT_TERM_LIMIT", defaults.memory.short_term_limit),
            lookback_limit: parse_var("MEMORY_LOOKBACK_LIMIT", defaults.memory.lookback_limit),
            min_turns_to_summarize: parse_var(
                "MEMORY_MIN_TURNS_TO_SUMMARIZE",
                defaults.memory.min_turns_to_summarize,
            ),
            summary_ttl: Duration::from_secs(parse_var(
                "SUMMARY_TTL_SECS",
                defaults.memory.summary_ttl.as_secs(),
            )),
            max_facts: parse_var("MEMORY_MAX_FACTS", defaults.memory.max_facts),
            summary_retention_days: parse_var(
                "SUMMARY_RETENTION_DAYS",
                defaults.memory.summary_retention_days,
            ),
        };

        let router = RouterConfig {
            complexity_threshold: parse_var(
                "COMPLEXITY_THRESHOLD",
                defaults.router.complexity_threshold,
            ),
            fast_model: env::var("FAST_MODEL").unwrap_or(defaults.router.fast_model),
            capable_model: env::var("CAPABLE_MODEL").unwrap_or(defaults.router.capable_model),
        };

        let timeouts = TimeoutConfig {
            store: Duration::from_millis(parse_var(
                "IO_TIMEOUT_MS",
                defaults.timeouts.store.as_millis() as u64,
            )),
            summarization: Duration::from_millis(parse_var(
                "LLM_SUMMARY_TIMEOUT_MS",
                defaults.timeouts.summarization.as_millis() as u64,
            )),
            completion: Duration::from_millis(parse_var(
                "LLM_TIMEOUT_MS",
                defaults.timeouts.completion.as_millis() as u64,
            )),
        };

        let database_url = env::var("POSTGRES_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());

        let llm_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty() && key != "your_gemini_api_key_here");

        Self {
            memory,
            router,
            timeouts,
            database_url,
            llm_api_key,
        }
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, fallback = %default, "Unparseable config value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_memory_constants() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.memory.short_term_limit, 6);
        assert_eq!(config.memory.lookback_limit, 20);
        assert_eq!(config.memory.max_facts, 10);
        assert_eq!(config.memory.summary_ttl, Duration::from_secs(3600));
        assert!((config.router.complexity_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_var_falls_back_on_garbage() {
        env::set_var("CONVORCH_TEST_GARBAGE", "not-a-number");
        assert_eq!(parse_var("CONVORCH_TEST_GARBAGE", 42usize), 42);

        env::set_var("CONVORCH_TEST_VALID", " 12 ");
        assert_eq!(parse_var("CONVORCH_TEST_VALID", 42usize), 12);

        assert_eq!(parse_var("CONVORCH_TEST_MISSING", 3u64), 3);
    }
}
