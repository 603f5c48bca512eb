//! Error types for the conversation orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Caller Errors
    // =============================

    /// Misuse of the core's API. The only class that reaches callers.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // Environment Errors (absorbed by the core)
    // =============================

    #[error("State persistence error: {0}")]
    StateError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Contract violations propagate; everything else is degraded locally.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, OrchestrationError::ContractViolation(_))
    }
}

/// Bound an external call by `limit`, mapping elapsed time to [`OrchestrationError::Timeout`].
pub async fn with_timeout<T, F>(limit: std::time::Duration, what: &str, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(OrchestrationError::Timeout(format!(
            "{} exceeded {} ms",
            what,
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_only_contract_violation_propagates() {
        assert!(OrchestrationError::ContractViolation("x".into()).is_contract_violation());
        assert!(!OrchestrationError::Timeout("x".into()).is_contract_violation());
        assert!(!OrchestrationError::DatabaseError("x".into()).is_contract_violation());
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(OrchestrationError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let result = with_timeout(Duration::from_secs(1), "fast call", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
