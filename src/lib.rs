//! Conversation Orchestrator
//!
//! The dialogue layer of the Zeni personal-finance assistant:
//! - Picks a persona for each turn and routes it to a fast or capable model
//! - Remembers what the assistant last offered, so "sim" or "pode" can be tied back to it
//! - Assembles tiered memory (recent turns, a cached summary, durable user facts)
//! - Degrades instead of failing when storage or the LLM misbehaves
//!
//! TURN LOOP:
//! STATE → MEMORY → PERSONA → ROUTE → RESOLVE → PROMPT → LLM → EXTRACT → PERSIST

pub mod agent;
pub mod api;
pub mod audit;
pub mod backend;
pub mod classifier;
pub mod complexity;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod llm;
pub mod memory;
pub mod models;
pub mod prompts;
pub mod router;
pub mod state;

pub use error::{OrchestrationError, Result};

// Re-export common types
pub use agent::{ChatOrchestrator, ChatTurnRequest, ChatTurnResponse};
pub use classifier::{PersonaClassifier, TurnSignals};
pub use config::OrchestratorConfig;
pub use dialogue::ShortReplyResolver;
pub use memory::{MemorySnapshot, TieredMemoryManager};
pub use models::*;
pub use router::ModelRouter;
pub use state::ConversationStateStore;
