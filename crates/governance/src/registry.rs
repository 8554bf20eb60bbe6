//! Collaborator interfaces consumed by the assembly engine
//!
//! Membership and proposal lifecycles live outside this crate. The engine
//! only needs to ask who the delegate is, record a newly elected delegate,
//! and read the outcome of approved proposals.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use icn_core::{JsonStorage, Storage};

use crate::error::{GovernanceError, GovernanceResult};
use crate::types::{Identity, StatuteHash, Timestamp};

/// Storage key holding the delegate of a storage-backed access registry
pub const DELEGATE_PATH: &str = "access/delegate";
/// Storage prefix of proposals in a storage-backed proposal registry
pub const PROPOSALS_PATH: &str = "proposals";

/// Access control: who holds the delegate role
#[async_trait]
pub trait AccessRegistry: Send + Sync {
    async fn check_is_delegate(&self, identity: &Identity) -> GovernanceResult<bool>;

    /// Install a newly elected delegate
    async fn set_delegate(&self, identity: &Identity) -> GovernanceResult<()>;
}

/// Read-only view of proposal outcomes
#[async_trait]
pub trait ProposalRegistry: Send + Sync {
    /// Whether the proposal was approved
    async fn get_proposal_final_result(&self, id: &str) -> GovernanceResult<bool>;

    /// Whether the proposal's action convenes an extraordinary GA
    async fn check_action_is_successful_ga(&self, id: &str) -> GovernanceResult<bool>;

    /// Whether the proposal's action replaces the statute
    async fn check_action_is_statute(&self, id: &str) -> GovernanceResult<bool>;

    /// Date the proposal puts forward (GA start for extraordinary GAs)
    async fn get_proposal_proposed_date(&self, id: &str) -> GovernanceResult<Timestamp>;

    /// Statute hash carried by a statute proposal
    async fn get_proposal_statute(&self, id: &str) -> GovernanceResult<StatuteHash>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalAction {
    ExtraordinaryGa,
    Statute,
    Other,
}

/// What a proposal registry knows about one proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: String,
    pub approved: bool,
    pub action: ProposalAction,
    #[serde(default)]
    pub proposed_date: Timestamp,
    #[serde(default)]
    pub statute: Option<StatuteHash>,
}

impl ProposalRecord {
    fn statute_hash(&self) -> GovernanceResult<StatuteHash> {
        self.statute.ok_or_else(|| {
            GovernanceError::InvalidProposal(format!("proposal {} carries no statute", self.id))
        })
    }
}

fn unknown_proposal(id: &str) -> GovernanceError {
    GovernanceError::InvalidProposal(format!("unknown proposal {}", id))
}

/// Access registry held in memory
#[derive(Debug, Default)]
pub struct MemoryAccessRegistry {
    delegate: RwLock<Option<Identity>>,
}

impl MemoryAccessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delegate(delegate: Identity) -> Self {
        Self {
            delegate: RwLock::new(Some(delegate)),
        }
    }

    pub async fn delegate(&self) -> Option<Identity> {
        self.delegate.read().await.clone()
    }
}

#[async_trait]
impl AccessRegistry for MemoryAccessRegistry {
    async fn check_is_delegate(&self, identity: &Identity) -> GovernanceResult<bool> {
        Ok(self.delegate.read().await.as_ref() == Some(identity))
    }

    async fn set_delegate(&self, identity: &Identity) -> GovernanceResult<()> {
        *self.delegate.write().await = Some(identity.clone());
        info!("Delegate set to {}", identity);
        Ok(())
    }
}

/// Proposal registry held in memory
#[derive(Debug, Default)]
pub struct MemoryProposalRegistry {
    proposals: RwLock<HashMap<String, ProposalRecord>>,
}

impl MemoryProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: ProposalRecord) {
        self.proposals.write().await.insert(record.id.clone(), record);
    }

    async fn record(&self, id: &str) -> GovernanceResult<ProposalRecord> {
        self.proposals
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| unknown_proposal(id))
    }
}

#[async_trait]
impl ProposalRegistry for MemoryProposalRegistry {
    async fn get_proposal_final_result(&self, id: &str) -> GovernanceResult<bool> {
        Ok(self.record(id).await?.approved)
    }

    async fn check_action_is_successful_ga(&self, id: &str) -> GovernanceResult<bool> {
        Ok(self.record(id).await?.action == ProposalAction::ExtraordinaryGa)
    }

    async fn check_action_is_statute(&self, id: &str) -> GovernanceResult<bool> {
        Ok(self.record(id).await?.action == ProposalAction::Statute)
    }

    async fn get_proposal_proposed_date(&self, id: &str) -> GovernanceResult<Timestamp> {
        Ok(self.record(id).await?.proposed_date)
    }

    async fn get_proposal_statute(&self, id: &str) -> GovernanceResult<StatuteHash> {
        self.record(id).await?.statute_hash()
    }
}

/// Access registry persisted in a [`Storage`] under [`DELEGATE_PATH`]
pub struct StoredAccessRegistry {
    storage: Arc<dyn Storage>,
}

impl StoredAccessRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn delegate(&self) -> GovernanceResult<Option<Identity>> {
        Ok(self.storage.try_get_json(DELEGATE_PATH).await?)
    }
}

#[async_trait]
impl AccessRegistry for StoredAccessRegistry {
    async fn check_is_delegate(&self, identity: &Identity) -> GovernanceResult<bool> {
        Ok(self.delegate().await?.as_ref() == Some(identity))
    }

    async fn set_delegate(&self, identity: &Identity) -> GovernanceResult<()> {
        self.storage.put_json(DELEGATE_PATH, identity).await?;
        info!("Delegate set to {}", identity);
        Ok(())
    }
}

/// Proposal registry persisted in a [`Storage`], one key per proposal
pub struct StoredProposalRegistry {
    storage: Arc<dyn Storage>,
}

impl StoredProposalRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn key(id: &str) -> String {
        format!("{}/{}", PROPOSALS_PATH, id)
    }

    pub async fn insert(&self, record: &ProposalRecord) -> GovernanceResult<()> {
        self.storage.put_json(&Self::key(&record.id), record).await?;
        Ok(())
    }

    pub async fn list(&self) -> GovernanceResult<Vec<ProposalRecord>> {
        let keys = self.storage.list(&format!("{}/", PROPOSALS_PATH)).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            records.push(self.storage.get_json(&key).await?);
        }
        Ok(records)
    }

    async fn record(&self, id: &str) -> GovernanceResult<ProposalRecord> {
        self.storage
            .try_get_json(&Self::key(id))
            .await?
            .ok_or_else(|| unknown_proposal(id))
    }
}

#[async_trait]
impl ProposalRegistry for StoredProposalRegistry {
    async fn get_proposal_final_result(&self, id: &str) -> GovernanceResult<bool> {
        Ok(self.record(id).await?.approved)
    }

    async fn check_action_is_successful_ga(&self, id: &str) -> GovernanceResult<bool> {
        Ok(self.record(id).await?.action == ProposalAction::ExtraordinaryGa)
    }

    async fn check_action_is_statute(&self, id: &str) -> GovernanceResult<bool> {
        Ok(self.record(id).await?.action == ProposalAction::Statute)
    }

    async fn get_proposal_proposed_date(&self, id: &str) -> GovernanceResult<Timestamp> {
        Ok(self.record(id).await?.proposed_date)
    }

    async fn get_proposal_statute(&self, id: &str) -> GovernanceResult<StatuteHash> {
        self.record(id).await?.statute_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icn_core::MemoryStorage;

    fn statute_proposal() -> ProposalRecord {
        ProposalRecord {
            id: "p-statute".to_string(),
            approved: true,
            action: ProposalAction::Statute,
            proposed_date: 0,
            statute: Some(StatuteHash::digest("v2")),
        }
    }

    #[tokio::test]
    async fn test_memory_access_registry() {
        let registry = MemoryAccessRegistry::with_delegate("did:icn:alice".into());
        assert!(registry.check_is_delegate(&"did:icn:alice".into()).await.unwrap());
        assert!(!registry.check_is_delegate(&"did:icn:bob".into()).await.unwrap());

        registry.set_delegate(&"did:icn:bob".into()).await.unwrap();
        assert_eq!(registry.delegate().await, Some("did:icn:bob".into()));
        assert!(!MemoryAccessRegistry::new()
            .check_is_delegate(&"did:icn:alice".into())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_memory_proposal_registry() {
        let registry = MemoryProposalRegistry::new();
        registry.insert(statute_proposal()).await;

        assert!(registry.get_proposal_final_result("p-statute").await.unwrap());
        assert!(registry.check_action_is_statute("p-statute").await.unwrap());
        assert!(!registry.check_action_is_successful_ga("p-statute").await.unwrap());
        assert_eq!(
            registry.get_proposal_statute("p-statute").await.unwrap(),
            StatuteHash::digest("v2")
        );
        assert!(matches!(
            registry.get_proposal_final_result("missing").await,
            Err(GovernanceError::InvalidProposal(_))
        ));
    }

    #[tokio::test]
    async fn test_stored_registries() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

        let access = StoredAccessRegistry::new(storage.clone());
        assert_eq!(access.delegate().await.unwrap(), None);
        access.set_delegate(&"did:icn:carol".into()).await.unwrap();
        assert!(access.check_is_delegate(&"did:icn:carol".into()).await.unwrap());

        let proposals = StoredProposalRegistry::new(storage.clone());
        proposals.insert(&statute_proposal()).await.unwrap();
        let mut ega = statute_proposal();
        ega.id = "p-ega".to_string();
        ega.action = ProposalAction::ExtraordinaryGa;
        ega.statute = None;
        ega.proposed_date = 42;
        proposals.insert(&ega).await.unwrap();

        assert_eq!(proposals.list().await.unwrap().len(), 2);
        assert!(proposals.check_action_is_successful_ga("p-ega").await.unwrap());
        assert_eq!(proposals.get_proposal_proposed_date("p-ega").await.unwrap(), 42);
        assert!(proposals.get_proposal_statute("p-ega").await.is_err());
    }
}
