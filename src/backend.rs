//! Storage backend selection
//!
//! Postgres when a database URL is configured and the pool can be created,
//! in-memory otherwise. Both stores share one lazily-connected pool.

use std::sync::Arc;
use tracing::{info, warn};

use crate::memory::{InMemoryMemoryStore, MemoryStore, PgMemoryStore};
use crate::state::{ConversationStore, InMemoryConversationStore, PgConversationStore};

pub struct Backends {
    pub conversation: Arc<dyn ConversationStore>,
    pub memory: Arc<dyn MemoryStore>,
    /// `"postgres"` or `"in-memory"`
    pub kind: &'static str,
}

impl Backends {
    pub fn in_memory() -> Self {
        Self {
            conversation: Arc::new(InMemoryConversationStore::new()),
            memory: Arc::new(InMemoryMemoryStore::new()),
            kind: "in-memory",
        }
    }
}

pub fn build_backends(database_url: Option<&str>) -> Backends {
    if let Some(url) = database_url {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
        {
            Ok(pool) => {
                info!("Conversation backend: postgres");
                return Backends {
                    conversation: Arc::new(PgConversationStore::new(pool.clone())),
                    memory: Arc::new(PgMemoryStore::new(pool)),
                    kind: "postgres",
                };
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Conversation backend: in-memory");
    Backends::in_memory()
}
