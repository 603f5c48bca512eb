//! Routing decision audit trail
//!
//! Every router decision carries a hash of its inputs so the tier choice
//! can be reproduced and checked later. Only the most recent decisions are
//! kept in process.

use crate::models::RouterDecision;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Inputs that fully determine a routing decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingInputs {
    pub persona_hint: String,
    pub message: String,
    pub context_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub audit_id: Uuid,
    pub user_id: Uuid,
    pub inputs: RoutingInputs,
    pub decision: RouterDecision,
    pub created_at: DateTime<Utc>,
}

/// Records kept by [`DecisionLog::new`]
pub const DEFAULT_DECISION_CAPACITY: usize = 1024;

/// In-process decision storage, bounded: the oldest record is evicted
/// once `capacity` is reached.
pub struct DecisionLog {
    records: Arc<RwLock<VecDeque<DecisionRecord>>>,
    capacity: usize,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DECISION_CAPACITY)
    }

    /// A zero capacity keeps nothing; `record` still returns an audit ID.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(VecDeque::new())),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a decision and return its audit ID
    pub async fn record(
        &self,
        user_id: Uuid,
        inputs: RoutingInputs,
        decision: RouterDecision,
    ) -> Result<Uuid> {
        let record = DecisionRecord {
            audit_id: Uuid::new_v4(),
            user_id,
            inputs,
            decision,
            created_at: Utc::now(),
        };
        let audit_id = record.audit_id;

        if self.capacity == 0 {
            return Ok(audit_id);
        }

        let mut records = self.records.write().await;
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(audit_id)
    }

    pub async fn get(&self, audit_id: Uuid) -> Result<Option<DecisionRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.audit_id == audit_id).cloned())
    }

    /// Retained audit IDs for a user, oldest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let records = self.records.read().await;

        Ok(records
            .iter()
            .filter(|record| record.user_id == user_id)
            .map(|record| record.audit_id)
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Recompute the input hash and compare with the stored decision
    pub async fn verify_integrity(&self, audit_id: Uuid) -> Result<bool> {
        let records = self.records.read().await;

        if let Some(record) = records.iter().find(|r| r.audit_id == audit_id) {
            Ok(compute_input_hash(&record.inputs) == record.decision.input_hash)
        } else {
            Ok(false)
        }
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 (hex) of the routing inputs, streamed straight into the hasher
pub fn compute_input_hash(inputs: &RoutingInputs) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), inputs).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelTier, Persona};

    fn inputs(message: &str) -> RoutingInputs {
        RoutingInputs {
            persona_hint: "cfo".to_string(),
            message: message.to_string(),
            context_turns: 4,
        }
    }

    fn decision_for(inputs: &RoutingInputs) -> RouterDecision {
        RouterDecision {
            persona: Persona::Cfo,
            model_tier: ModelTier::Fast,
            model_id: "fast".to_string(),
            complexity_score: Some(0.2),
            input_hash: compute_input_hash(inputs),
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = compute_input_hash(&inputs("como estou?"));
        let b = compute_input_hash(&inputs("como estou?"));
        let c = compute_input_hash(&inputs("como estou??"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_unknown_audit_id() {
        let log = DecisionLog::default();
        let missing = tokio_test::block_on(log.get(Uuid::new_v4())).unwrap();
        assert!(missing.is_none());
        assert!(tokio_test::block_on(log.list_for_user(Uuid::new_v4()))
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_record_and_verify() {
        let log = DecisionLog::new();
        let user_id = Uuid::new_v4();
        let routing = inputs("resume meu mês");

        let audit_id = log
            .record(user_id, routing.clone(), decision_for(&routing))
            .await
            .unwrap();

        assert!(log.get(audit_id).await.unwrap().is_some());
        assert!(log.verify_integrity(audit_id).await.unwrap());
        assert!(!log.verify_integrity(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_tampered_record_fails_verification() {
        let log = DecisionLog::new();
        let user_id = Uuid::new_v4();
        let routing = inputs("resume meu mês");
        let mut decision = decision_for(&routing);
        decision.input_hash = compute_input_hash(&inputs("outra coisa"));

        let audit_id = log.record(user_id, routing, decision).await.unwrap();
        assert!(!log.verify_integrity(audit_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_for_user_is_chronological() {
        let log = DecisionLog::new();
        let user_id = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut expected = Vec::new();
        for i in 0..3 {
            let routing = inputs(&format!("mensagem {}", i));
            let id = log
                .record(user_id, routing.clone(), decision_for(&routing))
                .await
                .unwrap();
            expected.push(id);
        }
        let routing = inputs("outro usuário");
        log.record(other, routing.clone(), decision_for(&routing))
            .await
            .unwrap();

        assert_eq!(log.list_for_user(user_id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_oldest_records_are_evicted_at_capacity() {
        let log = DecisionLog::with_capacity(3);
        let user_id = Uuid::new_v4();

        let mut ids = Vec::new();
        for i in 0..5 {
            let routing = inputs(&format!("mensagem {}", i));
            ids.push(
                log.record(user_id, routing.clone(), decision_for(&routing))
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(log.len().await, 3);
        assert!(log.get(ids[0]).await.unwrap().is_none());
        assert!(!log.verify_integrity(ids[1]).await.unwrap());
        assert_eq!(log.list_for_user(user_id).await.unwrap(), ids[2..].to_vec());
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_nothing() {
        let log = DecisionLog::with_capacity(0);
        let routing = inputs("oi");

        let audit_id = log
            .record(Uuid::new_v4(), routing.clone(), decision_for(&routing))
            .await
            .unwrap();

        assert!(log.is_empty().await);
        assert!(log.get(audit_id).await.unwrap().is_none());
    }
}
