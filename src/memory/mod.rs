//! Tiered conversation memory
//!
//! Recent turns verbatim, older turns as a cached summary, and durable
//! per-user facts, assembled into LLM context for each turn.

pub mod context_manager;
pub mod facts;
pub mod postgres;
pub mod store;
pub mod summarizer;

pub use context_manager::{MemoryCleanup, TieredMemoryManager};
pub use facts::{ExtractedFact, FactExtractor, FactType};
pub use postgres::PgMemoryStore;
pub use store::{
    ConversationSummary, InMemoryMemoryStore, MemorySnapshot, MemoryStore, MessageRole,
    TranscriptTurn, UserFact,
};
pub use summarizer::ContextSummarizer;
