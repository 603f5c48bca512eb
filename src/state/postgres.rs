//! Postgres conversation state backend
//!
//! One JSONB blob per user, written with an atomic upsert.

use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use super::ConversationStore;
use crate::error::OrchestrationError;
use crate::models::ConversationState;
use crate::Result;

pub struct PgConversationStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversation_state (
                      user_id UUID PRIMARY KEY,
                      state_data JSONB NOT NULL DEFAULT '{}',
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_conversation_state_updated
                    ON conversation_state (updated_at);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                info!("Conversation state schema ready");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                OrchestrationError::DatabaseError(format!(
                    "Failed to initialize conversation state schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ConversationStore for PgConversationStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<ConversationState>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT state_data FROM conversation_state WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                OrchestrationError::DatabaseError(format!(
                    "Failed to load conversation state: {}",
                    e
                ))
            })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let blob: serde_json::Value = row.try_get("state_data")?;
        let state = serde_json::from_value(blob).map_err(|e| {
            OrchestrationError::StateError(format!("Stored conversation state is malformed: {}", e))
        })?;

        Ok(Some(state))
    }

    async fn save(&self, user_id: Uuid, state: &ConversationState) -> Result<()> {
        self.ensure_schema().await?;

        let blob = serde_json::to_value(state)?;

        sqlx::query(
            r#"
            INSERT INTO conversation_state (user_id, state_data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET state_data = EXCLUDED.state_data, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(blob)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            OrchestrationError::DatabaseError(format!("Failed to save conversation state: {}", e))
        })?;

        Ok(())
    }
}
