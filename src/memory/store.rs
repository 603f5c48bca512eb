//! Memory storage
//!
//! Transcript turns, cached summaries and per-user facts behind one
//! [`MemoryStore`] trait, plus the in-process backend used in tests and
//! offline runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Result;

/// Role of a transcript turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Unknown roles from storage are read as assistant text
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("user") {
            MessageRole::User
        } else {
            MessageRole::Assistant
        }
    }
}

/// One message in the transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptTurn {
    pub role: MessageRole,
    pub content: String,
    /// Persona that produced an assistant turn
    pub persona: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TranscriptTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            persona: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, persona: Option<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            persona,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    pub summary: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Durable fact; at most one current value per `fact_type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserFact {
    pub fact_type: String,
    pub fact_value: String,
    pub updated_at: DateTime<Utc>,
}

/// Memory assembled for one turn
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    /// Chronological, most recent last
    pub short_term: Vec<TranscriptTurn>,
    pub summary: Option<String>,
    pub facts: Vec<UserFact>,
}

impl MemorySnapshot {
    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty() && self.summary.is_none() && self.facts.is_empty()
    }
}

#[async_trait::async_trait]
pub trait MemoryStore: Send + Sync {
    /// Up to `limit` most recent turns, newest first
    async fn recent_turns(&self, user_id: Uuid, limit: usize) -> Result<Vec<TranscriptTurn>>;

    async fn append_turn(&self, user_id: Uuid, turn: &TranscriptTurn) -> Result<()>;

    /// Newest summary created after `since`
    async fn latest_summary_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<ConversationSummary>>;

    async fn save_summary(&self, user_id: Uuid, summary: &str, message_count: usize) -> Result<()>;

    /// Up to `limit` facts, most recently updated first
    async fn load_facts(&self, user_id: Uuid, limit: usize) -> Result<Vec<UserFact>>;

    /// Insert or replace the value for `(user_id, fact_type)`
    async fn upsert_fact(&self, user_id: Uuid, fact_type: &str, fact_value: &str) -> Result<()>;

    /// Returns the number of removed turns
    async fn delete_turns_before(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Returns the number of removed summaries
    async fn delete_summaries_before(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64>;
}

// =============================
// In-memory backend
// =============================

#[derive(Default)]
struct UserMemory {
    /// Append order is chronological
    turns: Vec<TranscriptTurn>,
    summaries: Vec<ConversationSummary>,
    facts: HashMap<String, UserFact>,
}

pub struct InMemoryMemoryStore {
    users: Arc<RwLock<HashMap<Uuid, UserMemory>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn recent_turns(&self, user_id: Uuid, limit: usize) -> Result<Vec<TranscriptTurn>> {
        let users = self.users.read().await;
        Ok(users
            .get(&user_id)
            .map(|m| m.turns.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_turn(&self, user_id: Uuid, turn: &TranscriptTurn) -> Result<()> {
        let mut users = self.users.write().await;
        users.entry(user_id).or_default().turns.push(turn.clone());
        Ok(())
    }

    async fn latest_summary_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<ConversationSummary>> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).and_then(|m| {
            m.summaries
                .iter()
                .filter(|s| s.created_at > since)
                .max_by_key(|s| s.created_at)
                .cloned()
        }))
    }

    async fn save_summary(&self, user_id: Uuid, summary: &str, message_count: usize) -> Result<()> {
        let mut users = self.users.write().await;
        users.entry(user_id).or_default().summaries.push(ConversationSummary {
            summary: summary.to_string(),
            message_count,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn load_facts(&self, user_id: Uuid, limit: usize) -> Result<Vec<UserFact>> {
        let users = self.users.read().await;
        let mut facts: Vec<UserFact> = users
            .get(&user_id)
            .map(|m| m.facts.values().cloned().collect())
            .unwrap_or_default();

        facts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        facts.truncate(limit);
        Ok(facts)
    }

    async fn upsert_fact(&self, user_id: Uuid, fact_type: &str, fact_value: &str) -> Result<()> {
        let mut users = self.users.write().await;
        users.entry(user_id).or_default().facts.insert(
            fact_type.to_string(),
            UserFact {
                fact_type: fact_type.to_string(),
                fact_value: fact_value.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_turns_before(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut users = self.users.write().await;
        let Some(memory) = users.get_mut(&user_id) else {
            return Ok(0);
        };

        let before = memory.turns.len();
        memory.turns.retain(|t| t.created_at >= cutoff);
        Ok((before - memory.turns.len()) as u64)
    }

    async fn delete_summaries_before(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut users = self.users.write().await;
        let Some(memory) = users.get_mut(&user_id) else {
            return Ok(0);
        };

        let before = memory.summaries.len();
        memory.summaries.retain(|s| s.created_at >= cutoff);
        Ok((before - memory.summaries.len()) as u64)
    }
}
