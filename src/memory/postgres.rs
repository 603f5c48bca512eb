//! Postgres memory backend
//!
//! Tables: `chat_history`, `conversation_summaries`, `user_facts`.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use super::store::{ConversationSummary, MemoryStore, MessageRole, TranscriptTurn, UserFact};
use crate::error::OrchestrationError;
use crate::Result;

pub struct PgMemoryStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgMemoryStore {
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
                    CREATE TABLE IF NOT EXISTS chat_history (
                      id BIGSERIAL PRIMARY KEY,
                      user_id UUID NOT NULL,
                      role TEXT NOT NULL,
                      content TEXT NOT NULL,
                      agent TEXT,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_chat_history_user_created
                    ON chat_history (user_id, created_at DESC);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversation_summaries (
                      id BIGSERIAL PRIMARY KEY,
                      user_id UUID NOT NULL,
                      summary TEXT NOT NULL,
                      message_count INTEGER NOT NULL DEFAULT 0,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_conversation_summaries_user_created
                    ON conversation_summaries (user_id, created_at DESC);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS user_facts (
                      id BIGSERIAL PRIMARY KEY,
                      user_id UUID NOT NULL,
                      fact_type TEXT NOT NULL,
                      fact_value TEXT NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                      UNIQUE (user_id, fact_type)
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                info!("Memory schema ready");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                OrchestrationError::DatabaseError(format!(
                    "Failed to initialize memory schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

fn db_err(what: &'static str) -> impl FnOnce(sqlx::Error) -> OrchestrationError {
    move |e| OrchestrationError::DatabaseError(format!("{}: {}", what, e))
}

#[async_trait::async_trait]
impl MemoryStore for PgMemoryStore {
    async fn recent_turns(&self, user_id: Uuid, limit: usize) -> Result<Vec<TranscriptTurn>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT role, content, agent, created_at
            FROM chat_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load chat history"))?;

        rows.into_iter()
            .map(|row| -> Result<TranscriptTurn> {
                let role: String = row.try_get("role")?;
                Ok(TranscriptTurn {
                    role: MessageRole::parse(&role),
                    content: row.try_get("content")?,
                    persona: row.try_get("agent")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn append_turn(&self, user_id: Uuid, turn: &TranscriptTurn) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_history (user_id, role, content, agent, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(&turn.persona)
        .bind(turn.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to append chat history"))?;

        Ok(())
    }

    async fn latest_summary_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<ConversationSummary>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT summary, message_count, created_at
            FROM conversation_summaries
            WHERE user_id = $1 AND created_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load conversation summary"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let message_count: i32 = row.try_get("message_count")?;
        Ok(Some(ConversationSummary {
            summary: row.try_get("summary")?,
            message_count: message_count.max(0) as usize,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn save_summary(&self, user_id: Uuid, summary: &str, message_count: usize) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO conversation_summaries (user_id, summary, message_count)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(summary)
        .bind(message_count as i32)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to save conversation summary"))?;

        Ok(())
    }

    async fn load_facts(&self, user_id: Uuid, limit: usize) -> Result<Vec<UserFact>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT fact_type, fact_value, updated_at
            FROM user_facts
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load user facts"))?;

        rows.into_iter()
            .map(|row| -> Result<UserFact> {
                Ok(UserFact {
                    fact_type: row.try_get("fact_type")?,
                    fact_value: row.try_get("fact_value")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    async fn upsert_fact(&self, user_id: Uuid, fact_type: &str, fact_value: &str) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO user_facts (user_id, fact_type, fact_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, fact_type)
            DO UPDATE SET fact_value = EXCLUDED.fact_value, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(fact_type)
        .bind(fact_value)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to upsert user fact"))?;

        Ok(())
    }

    async fn delete_turns_before(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM chat_history WHERE user_id = $1 AND created_at < $2")
            .bind(user_id)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to clean chat history"))?;

        Ok(result.rows_affected())
    }

    async fn delete_summaries_before(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        self.ensure_schema().await?;

        let result = sqlx::query(
            "DELETE FROM conversation_summaries WHERE user_id = $1 AND created_at < $2",
        )
        .bind(user_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to clean conversation summaries"))?;

        Ok(result.rows_affected())
    }
}
