//! Conversation state persistence
//!
//! Backends return `Result`; [`ConversationStateStore`] is the boundary
//! that turns every environmental failure into defaults so a chat turn
//! never fails because continuity state is unavailable.

pub mod postgres;

pub use postgres::PgConversationStore;

use crate::error::with_timeout;
use crate::models::ConversationState;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Durable per-user state backing
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// `Ok(None)` when the user has no stored state yet
    async fn load(&self, user_id: Uuid) -> Result<Option<ConversationState>>;

    /// Insert-or-replace by user id
    async fn save(&self, user_id: Uuid, state: &ConversationState) -> Result<()>;
}

/// In-memory backend for development and tests
pub struct InMemoryConversationStore {
    states: Arc<RwLock<HashMap<Uuid, ConversationState>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<ConversationState>> {
        let states = self.states.read().await;
        Ok(states.get(&user_id).cloned())
    }

    async fn save(&self, user_id: Uuid, state: &ConversationState) -> Result<()> {
        let mut states = self.states.write().await;
        states.insert(user_id, state.clone());
        Ok(())
    }
}

/// Never-failing facade over a [`ConversationStore`]
#[derive(Clone)]
pub struct ConversationStateStore {
    backend: Arc<dyn ConversationStore>,
    timeout: Duration,
}

impl ConversationStateStore {
    pub fn new(backend: Arc<dyn ConversationStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Current state, or all-defaults when missing or unreachable
    pub async fn get(&self, user_id: Uuid) -> ConversationState {
        match with_timeout(self.timeout, "conversation state load", self.backend.load(user_id)).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(user_id = %user_id, "No conversation state yet, using defaults");
                ConversationState::default()
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Conversation state unavailable, using defaults");
                ConversationState::default()
            }
        }
    }

    /// Persist, surfacing the error to callers that want it
    pub async fn try_put(&self, user_id: Uuid, state: &ConversationState) -> Result<()> {
        with_timeout(self.timeout, "conversation state save", self.backend.save(user_id, state)).await
    }

    /// Persist; failures are logged and dropped
    pub async fn put(&self, user_id: Uuid, state: &ConversationState) {
        if let Err(e) = self.try_put(user_id, state).await {
            error!(user_id = %user_id, error = %e, "Error saving conversation state");
        }
    }

    /// Replace the state with defaults
    pub async fn reset(&self, user_id: Uuid) {
        self.put(user_id, &ConversationState::default()).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use crate::models::PendingAction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that fails every call
    pub(crate) struct UnavailableStore {
        pub saves: AtomicUsize,
    }

    impl UnavailableStore {
        pub(crate) fn new() -> Self {
            Self {
                saves: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ConversationStore for UnavailableStore {
        async fn load(&self, _user_id: Uuid) -> Result<Option<ConversationState>> {
            Err(OrchestrationError::DatabaseError(
                "relation \"conversation_state\" does not exist".to_string(),
            ))
        }

        async fn save(&self, _user_id: Uuid, _state: &ConversationState) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Err(OrchestrationError::DatabaseError("connection refused".to_string()))
        }
    }

    /// Backend that never answers in time
    struct HangingStore;

    #[async_trait::async_trait]
    impl ConversationStore for HangingStore {
        async fn load(&self, _user_id: Uuid) -> Result<Option<ConversationState>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn save(&self, _user_id: Uuid, _state: &ConversationState) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn store(backend: Arc<dyn ConversationStore>) -> ConversationStateStore {
        ConversationStateStore::new(backend, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_missing_state_returns_defaults() {
        let store = store(Arc::new(InMemoryConversationStore::new()));
        assert_eq!(store.get(Uuid::new_v4()).await, ConversationState::default());
    }

    #[tokio::test]
    async fn test_put_then_get_replaces_state() {
        let store = store(Arc::new(InMemoryConversationStore::new()));
        let user_id = Uuid::new_v4();

        let mut first = ConversationState::default();
        first.pending_action = PendingAction::CreateBudget;
        first.context.last_mentioned_value = Some(10.0);
        store.put(user_id, &first).await;

        let mut second = ConversationState::default();
        second.turn_count = 2;
        store.put(user_id, &second).await;

        let loaded = store.get(user_id).await;
        assert_eq!(loaded, second);
        assert!(loaded.context.last_mentioned_value.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_backend_degrades() {
        let backend = Arc::new(UnavailableStore::new());
        let store = store(backend.clone());
        let user_id = Uuid::new_v4();

        assert_eq!(store.get(user_id).await, ConversationState::default());
        store.put(user_id, &ConversationState::default()).await;
        assert_eq!(backend.saves.load(Ordering::SeqCst), 1);
        assert!(store.try_put(user_id, &ConversationState::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_to_defaults() {
        let store = store(Arc::new(HangingStore));
        let user_id = Uuid::new_v4();

        assert_eq!(store.get(user_id).await, ConversationState::default());
        let err = store
            .try_put(user_id, &ConversationState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let store = store(Arc::new(InMemoryConversationStore::new()));
        let user_id = Uuid::new_v4();

        let mut state = ConversationState::default();
        state.turn_count = 9;
        store.put(user_id, &state).await;
        store.reset(user_id).await;

        assert_eq!(store.get(user_id).await.turn_count, 0);
    }
}
