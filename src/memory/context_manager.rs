//! Tiered memory assembly
//!
//! Short-term: the last K turns verbatim. Medium-term: a cached summary of
//! the older turns inside the lookback window. Long-term: per-user facts.
//! Every I/O step is timeout-bounded; any failure yields an empty snapshot.

use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{MemoryConfig, TimeoutConfig};
use crate::error::with_timeout;
use crate::memory::facts::{ExtractedFact, FactExtractor};
use crate::memory::store::{MemorySnapshot, MemoryStore, TranscriptTurn, UserFact};
use crate::memory::summarizer::{speaker_label, ContextSummarizer};
use crate::Result;

/// Rows removed by [`TieredMemoryManager::cleanup`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCleanup {
    pub turns_removed: u64,
    pub summaries_removed: u64,
}

pub struct TieredMemoryManager {
    store: Arc<dyn MemoryStore>,
    summarizer: ContextSummarizer,
    config: MemoryConfig,
    timeouts: TimeoutConfig,
}

impl TieredMemoryManager {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        summarizer: ContextSummarizer,
        config: MemoryConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            store,
            summarizer,
            config,
            timeouts,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    // =============================
    // Assembly
    // =============================

    /// Memory for the turn about to run. Never fails.
    pub async fn assemble(&self, user_id: Uuid, current_message: &str) -> MemorySnapshot {
        debug!(
            user_id = %user_id,
            message_chars = current_message.chars().count(),
            "Assembling memory"
        );

        match self.try_assemble(user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Memory unavailable, continuing without it");
                MemorySnapshot::default()
            }
        }
    }

    async fn try_assemble(&self, user_id: Uuid) -> Result<MemorySnapshot> {
        let mut turns = with_timeout(
            self.timeouts.store,
            "transcript load",
            self.store.recent_turns(user_id, self.config.lookback_limit),
        )
        .await?;
        turns.reverse();

        let k = self.config.short_term_limit;
        if turns.len() <= k {
            let facts = self.load_facts(user_id).await?;
            return Ok(MemorySnapshot {
                short_term: turns,
                summary: None,
                facts,
            });
        }

        let short_term = turns.split_off(turns.len() - k);
        let summary = self.summary_for(user_id, &turns).await?;
        let facts = self.load_facts(user_id).await?;

        Ok(MemorySnapshot {
            short_term,
            summary,
            facts,
        })
    }

    /// Cached summary within the TTL, else a fresh one
    async fn summary_for(&self, user_id: Uuid, older: &[TranscriptTurn]) -> Result<Option<String>> {
        if older.len() < self.config.min_turns_to_summarize {
            return Ok(None);
        }

        let ttl = chrono::Duration::from_std(self.config.summary_ttl).ok();

        let cached = with_timeout(
            self.timeouts.store,
            "summary cache lookup",
            self.store.latest_summary_since(user_id, cutoff_before(Utc::now(), ttl)),
        )
        .await?;

        if let Some(cached) = cached {
            debug!(user_id = %user_id, "Summary cache hit");
            return Ok(Some(cached.summary));
        }

        let summary = with_timeout(
            self.timeouts.summarization,
            "conversation summarization",
            self.summarizer.summarize(older),
        )
        .await?;

        if let Err(e) = with_timeout(
            self.timeouts.store,
            "summary save",
            self.store.save_summary(user_id, &summary, older.len()),
        )
        .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to cache conversation summary");
        }

        info!(user_id = %user_id, turns = older.len(), "Conversation summary generated");
        Ok(Some(summary))
    }

    async fn load_facts(&self, user_id: Uuid) -> Result<Vec<UserFact>> {
        with_timeout(
            self.timeouts.store,
            "user facts load",
            self.store.load_facts(user_id, self.config.max_facts),
        )
        .await
    }

    // =============================
    // Writes
    // =============================

    /// Append the user message and the assistant reply to the transcript
    pub async fn record_exchange(
        &self,
        user_id: Uuid,
        user_text: &str,
        assistant_text: &str,
        persona: Option<&str>,
    ) -> Result<()> {
        let user_turn = TranscriptTurn::user(user_text);
        let assistant_turn = TranscriptTurn::assistant(assistant_text, persona.map(str::to_string));

        for turn in [&user_turn, &assistant_turn] {
            with_timeout(
                self.timeouts.store,
                "transcript append",
                self.store.append_turn(user_id, turn),
            )
            .await?;
        }

        Ok(())
    }

    /// Scan a user message for durable facts and upsert each one.
    ///
    /// Returns what was found, whether or not it was persisted.
    pub async fn extract_and_save_facts(&self, user_id: Uuid, user_message: &str) -> Vec<ExtractedFact> {
        let facts = FactExtractor::extract(user_message);

        for fact in &facts {
            let saved = with_timeout(
                self.timeouts.store,
                "user fact upsert",
                self.store
                    .upsert_fact(user_id, fact.fact_type.as_str(), &fact.fact_value),
            )
            .await;

            match saved {
                Ok(()) => info!(user_id = %user_id, fact_type = %fact.fact_type, "User fact saved"),
                Err(e) => {
                    warn!(user_id = %user_id, fact_type = %fact.fact_type, error = %e, "Failed to save user fact")
                }
            }
        }

        facts
    }

    /// Drop transcript older than `days_to_keep` and summaries past retention
    pub async fn cleanup(&self, user_id: Uuid, days_to_keep: u32) -> MemoryCleanup {
        let now = Utc::now();
        let mut report = MemoryCleanup::default();

        match with_timeout(
            self.timeouts.store,
            "transcript cleanup",
            self.store.delete_turns_before(
                user_id,
                cutoff_before(now, chrono::Duration::try_days(i64::from(days_to_keep))),
            ),
        )
        .await
        {
            Ok(removed) => report.turns_removed = removed,
            Err(e) => error!(user_id = %user_id, error = %e, "Error cleaning up transcript"),
        }

        match with_timeout(
            self.timeouts.store,
            "summary cleanup",
            self.store.delete_summaries_before(
                user_id,
                cutoff_before(now, chrono::Duration::try_days(self.config.summary_retention_days)),
            ),
        )
        .await
        {
            Ok(removed) => report.summaries_removed = removed,
            Err(e) => error!(user_id = %user_id, error = %e, "Error cleaning up summaries"),
        }

        info!(
            user_id = %user_id,
            days_to_keep,
            turns_removed = report.turns_removed,
            summaries_removed = report.summaries_removed,
            "Old memory cleaned up"
        );

        report
    }

    // =============================
    // Prompt rendering
    // =============================

    /// Facts and summary, for prompts that carry recent turns separately
    pub fn format_long_term(snapshot: &MemorySnapshot) -> String {
        let mut out = String::new();

        if !snapshot.facts.is_empty() {
            out.push_str("\n\n## Informações conhecidas sobre o usuário:\n");
            for fact in &snapshot.facts {
                let _ = writeln!(out, "- {}: {}", fact.fact_type, fact.fact_value);
            }
        }

        if let Some(summary) = &snapshot.summary {
            out.push_str("\n\n## Resumo da conversa anterior:\n");
            out.push_str(summary);
        }

        out
    }

    /// All three tiers as one context block
    pub fn format_for_prompt(snapshot: &MemorySnapshot) -> String {
        let mut out = Self::format_long_term(snapshot);

        if !snapshot.short_term.is_empty() {
            out.push_str("\n\n## Mensagens recentes:\n");
            for turn in &snapshot.short_term {
                let _ = writeln!(out, "{}: {}", speaker_label(turn.role), turn.content);
            }
        }

        out
    }
}

/// `now - ago`, clamped to the earliest representable instant on overflow
fn cutoff_before(now: DateTime<Utc>, ago: Option<chrono::Duration>) -> DateTime<Utc> {
    ago.and_then(|ago| now.checked_sub_signed(ago))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
