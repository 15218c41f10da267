//! Persistence seam
//!
//! Components write through to a [`HierarchyStore`] on every mutation, so
//! the store always holds enough to rebuild the whole hierarchy. The
//! in-memory store is deterministic and test-friendly; a transactional
//! backend would implement the same trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use thiserror::Error;
use tumen_types::{
    ChildRef, DocumentId, HierarchyError, MemberId, MemberTrust, MembershipEdge, NotaryGrade,
    NotaryGrant, NotaryScope, QuorumDocument, SuperVerification, Unit, UnitId, VerificationRecord,
};

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for HierarchyError {
    fn from(err: StoreError) -> Self {
        HierarchyError::Storage(err.to_string())
    }
}

/// Storage interface for hierarchy state
///
/// Writes are upserts keyed by the record's natural identity.
pub trait HierarchyStore: Send + Sync {
    fn put_unit(&self, unit: &Unit) -> StoreResult<()>;

    /// Record an edge; replaces any edge for the same child
    fn put_edge(&self, edge: &MembershipEdge) -> StoreResult<()>;

    fn remove_edge(&self, child: &ChildRef) -> StoreResult<()>;

    fn put_document(&self, document: &QuorumDocument) -> StoreResult<()>;

    fn put_grant(&self, grant: &NotaryGrant) -> StoreResult<()>;

    fn remove_grant(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        scope: &NotaryScope,
    ) -> StoreResult<()>;

    fn put_member_trust(&self, trust: &MemberTrust) -> StoreResult<()>;

    fn append_verification(&self, record: &VerificationRecord) -> StoreResult<()>;

    fn append_super_verification(&self, record: &SuperVerification) -> StoreResult<()>;

    /// Record that a document's effect has reached the registry
    fn mark_effect_applied(&self, document: &DocumentId) -> StoreResult<()>;

    /// Replace the super-verification authority set
    fn put_authorities(&self, authorities: &[MemberId]) -> StoreResult<()>;

    /// Read everything back
    fn load_snapshot(&self) -> StoreResult<HierarchySnapshot>;
}

/// Complete persisted state, ordered deterministically
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HierarchySnapshot {
    pub units: Vec<Unit>,
    pub edges: Vec<MembershipEdge>,
    pub documents: Vec<QuorumDocument>,
    pub grants: Vec<NotaryGrant>,
    pub members: Vec<MemberTrust>,
    pub verifications: Vec<VerificationRecord>,
    pub super_verifications: Vec<SuperVerification>,
    pub applied_effects: Vec<DocumentId>,
    /// Authority set in force after a rotation; `None` until the first
    /// rotation, meaning the configured set applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorities: Option<Vec<MemberId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
}

impl HierarchySnapshot {
    /// blake3 digest of the snapshot content, excluding the capture time
    pub fn content_hash(&self) -> StoreResult<String> {
        let content = (
            &self.units,
            &self.edges,
            &self.documents,
            &self.grants,
            &self.members,
            &self.verifications,
            &self.super_verifications,
            &self.applied_effects,
            &self.authorities,
        );
        let bytes =
            serde_json::to_vec(&content).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == *id)
    }

    pub fn document(&self, id: &DocumentId) -> Option<&QuorumDocument> {
        self.documents.iter().find(|d| d.id == *id)
    }

    pub fn unit_mut(&mut self, id: &UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == *id)
    }

    pub fn document_mut(&mut self, id: &DocumentId) -> Option<&mut QuorumDocument> {
        self.documents.iter_mut().find(|d| d.id == *id)
    }
}

type GrantKey = (MemberId, NotaryGrade, NotaryScope);

#[derive(Default)]
struct MemoryState {
    units: BTreeMap<UnitId, Unit>,
    edges: BTreeMap<String, MembershipEdge>,
    documents: BTreeMap<DocumentId, QuorumDocument>,
    grants: Vec<(GrantKey, NotaryGrant)>,
    members: BTreeMap<MemberId, MemberTrust>,
    verifications: Vec<VerificationRecord>,
    super_verifications: Vec<SuperVerification>,
    applied_effects: BTreeSet<DocumentId>,
    authorities: Option<Vec<MemberId>>,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from a previously taken snapshot
    pub fn from_snapshot(snapshot: HierarchySnapshot) -> Self {
        let mut state = MemoryState::default();
        for unit in snapshot.units {
            state.units.insert(unit.id.clone(), unit);
        }
        for edge in snapshot.edges {
            state.edges.insert(edge.child.to_string(), edge);
        }
        for document in snapshot.documents {
            state.documents.insert(document.id.clone(), document);
        }
        for grant in snapshot.grants {
            let key = (grant.issuer.clone(), grant.grade, grant.scope.clone());
            state.grants.push((key, grant));
        }
        for trust in snapshot.members {
            state.members.insert(trust.member.clone(), trust);
        }
        state.verifications = snapshot.verifications;
        state.super_verifications = snapshot.super_verifications;
        state.applied_effects = snapshot.applied_effects.into_iter().collect();
        state.authorities = snapshot.authorities;
        Self {
            state: RwLock::new(state),
        }
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl HierarchyStore for MemoryStore {
    fn put_unit(&self, unit: &Unit) -> StoreResult<()> {
        self.write()?.units.insert(unit.id.clone(), unit.clone());
        Ok(())
    }

    fn put_edge(&self, edge: &MembershipEdge) -> StoreResult<()> {
        self.write()?
            .edges
            .insert(edge.child.to_string(), edge.clone());
        Ok(())
    }

    fn remove_edge(&self, child: &ChildRef) -> StoreResult<()> {
        self.write()?
            .edges
            .remove(&child.to_string())
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("edge for {}", child)))
    }

    fn put_document(&self, document: &QuorumDocument) -> StoreResult<()> {
        self.write()?
            .documents
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    fn put_grant(&self, grant: &NotaryGrant) -> StoreResult<()> {
        let key = (grant.issuer.clone(), grant.grade, grant.scope.clone());
        let mut state = self.write()?;
        match state.grants.iter().position(|(k, _)| *k == key) {
            Some(pos) => state.grants[pos].1 = grant.clone(),
            None => state.grants.push((key, grant.clone())),
        }
        Ok(())
    }

    fn remove_grant(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        scope: &NotaryScope,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let before = state.grants.len();
        state
            .grants
            .retain(|((i, g, s), _)| !(i == issuer && *g == grade && s == scope));
        if state.grants.len() == before {
            return Err(StoreError::NotFound(format!(
                "grant {} {} {}",
                issuer, grade, scope
            )));
        }
        Ok(())
    }

    fn put_member_trust(&self, trust: &MemberTrust) -> StoreResult<()> {
        self.write()?
            .members
            .insert(trust.member.clone(), trust.clone());
        Ok(())
    }

    fn append_verification(&self, record: &VerificationRecord) -> StoreResult<()> {
        self.write()?.verifications.push(record.clone());
        Ok(())
    }

    fn append_super_verification(&self, record: &SuperVerification) -> StoreResult<()> {
        self.write()?.super_verifications.push(record.clone());
        Ok(())
    }

    fn mark_effect_applied(&self, document: &DocumentId) -> StoreResult<()> {
        self.write()?.applied_effects.insert(document.clone());
        Ok(())
    }

    fn put_authorities(&self, authorities: &[MemberId]) -> StoreResult<()> {
        self.write()?.authorities = Some(authorities.to_vec());
        Ok(())
    }

    fn load_snapshot(&self) -> StoreResult<HierarchySnapshot> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        Ok(HierarchySnapshot {
            units: state.units.values().cloned().collect(),
            edges: state.edges.values().cloned().collect(),
            documents: state.documents.values().cloned().collect(),
            grants: state.grants.iter().map(|(_, g)| g.clone()).collect(),
            members: state.members.values().cloned().collect(),
            verifications: state.verifications.clone(),
            super_verifications: state.super_verifications.clone(),
            applied_effects: state.applied_effects.iter().cloned().collect(),
            authorities: state.authorities.clone(),
            taken_at: Some(Utc::now()),
        })
    }
}
