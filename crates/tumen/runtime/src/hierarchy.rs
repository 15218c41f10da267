//! The `Hierarchy` facade
//!
//! Wires the registry, resolver, notary gate, quorum engine and
//! verification engine around one store and one journal, and exposes the
//! operation surface a host binds to its transport.

use crate::config::HierarchyConfig;
use crate::journal::EventJournal;
use crate::notary_gate::NotaryGate;
use crate::quorum_engine::{EffectStatus, IssueRequest, QuorumEngine, SignOutcome};
use crate::signer_resolver::SignerResolver;
use crate::store::{HierarchySnapshot, HierarchyStore, MemoryStore};
use crate::unit_registry::UnitRegistry;
use crate::verification_engine::VerificationEngine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use tumen_types::{
    ChildRef, DocumentAction, DocumentId, DocumentScope, HierarchyResult, JournalEntry, MemberId,
    MemberTrust, MembershipEdge, NotaryGrade, NotaryGrant, NotaryScope, QuorumDocument,
    ThresholdPolicy, Tier, Unit, UnitId, VerificationProgress,
};

pub struct Hierarchy {
    config: HierarchyConfig,
    store: Arc<dyn HierarchyStore>,
    journal: Arc<EventJournal>,
    registry: Arc<UnitRegistry>,
    resolver: Arc<SignerResolver>,
    gate: Arc<NotaryGate>,
    engine: QuorumEngine,
    verification: VerificationEngine,
}

impl Hierarchy {
    /// An empty hierarchy backed by an in-memory store
    pub fn new(config: HierarchyConfig) -> HierarchyResult<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// An empty hierarchy writing through to `store`
    pub fn with_store(
        config: HierarchyConfig,
        store: Arc<dyn HierarchyStore>,
    ) -> HierarchyResult<Self> {
        let journal = Arc::new(EventJournal::new());
        let registry = Arc::new(UnitRegistry::new(store.clone(), journal.clone()));
        let gate = Arc::new(NotaryGate::new(
            registry.clone(),
            store.clone(),
            config.notary.grades_are_monotonic,
        ));
        let verification = VerificationEngine::new(
            config.verification.clone(),
            registry.clone(),
            store.clone(),
            journal.clone(),
        )?;
        Ok(Self::assemble(
            config,
            store,
            journal,
            registry,
            gate,
            verification,
        ))
    }

    /// Rebuild from whatever `store` holds and complete any effect that was
    /// finalized but never applied
    pub fn restore(
        config: HierarchyConfig,
        store: Arc<dyn HierarchyStore>,
    ) -> HierarchyResult<Self> {
        let snapshot = store.load_snapshot()?;
        let journal = Arc::new(EventJournal::new());
        let registry = Arc::new(UnitRegistry::restore(
            &snapshot,
            store.clone(),
            journal.clone(),
        ));
        let gate = Arc::new(NotaryGate::restore(
            &snapshot,
            registry.clone(),
            store.clone(),
            config.notary.grades_are_monotonic,
        ));
        let verification = VerificationEngine::restore(
            &snapshot,
            config.verification.clone(),
            registry.clone(),
            store.clone(),
            journal.clone(),
        )?;
        let hierarchy = Self::assemble(config, store, journal, registry, gate, verification);
        hierarchy.engine.load(&snapshot)?;

        let recovered = hierarchy.engine.retry_pending_effects()?;
        info!(
            units = snapshot.units.len(),
            documents = snapshot.documents.len(),
            recovered = recovered.len(),
            "Hierarchy restored"
        );
        Ok(hierarchy)
    }

    fn assemble(
        config: HierarchyConfig,
        store: Arc<dyn HierarchyStore>,
        journal: Arc<EventJournal>,
        registry: Arc<UnitRegistry>,
        gate: Arc<NotaryGate>,
        verification: VerificationEngine,
    ) -> Self {
        let resolver = Arc::new(SignerResolver::new(registry.clone()));
        let engine = QuorumEngine::new(
            registry.clone(),
            resolver.clone(),
            gate.clone(),
            registry.clone(),
            store.clone(),
            journal.clone(),
            config.quorum.clone(),
        );
        Self {
            config,
            store,
            journal,
            registry,
            resolver,
            gate,
            engine,
            verification,
        }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn journal(&self) -> HierarchyResult<Vec<JournalEntry>> {
        self.journal.entries()
    }

    pub fn event_log(&self) -> &EventJournal {
        &self.journal
    }

    /// Current persisted state
    pub fn snapshot(&self) -> HierarchyResult<HierarchySnapshot> {
        Ok(self.store.load_snapshot()?)
    }

    // Registry

    pub fn create_unit(
        &self,
        id: UnitId,
        tier: Tier,
        name: impl Into<String>,
    ) -> HierarchyResult<Unit> {
        self.registry.create_unit(id, tier, name)
    }

    /// Place a member into a Base unit, enrolling it for verification if
    /// it is new
    pub fn register_member(
        &self,
        unit: &UnitId,
        member: MemberId,
    ) -> HierarchyResult<MembershipEdge> {
        // enrollment first: an enrolled but unplaced member can retry the join
        if !self.verification.is_enrolled(&member)? {
            self.verification.enroll(member.clone())?;
        }
        self.registry.register_member(unit, member)
    }

    pub fn register_child(&self, parent: &UnitId, child: &UnitId) -> HierarchyResult<MembershipEdge> {
        self.registry.register_child(parent, child)
    }

    pub fn remove_member(&self, unit: &UnitId, member: &MemberId) -> HierarchyResult<()> {
        self.registry.remove_member(unit, member)
    }

    pub fn remove_child(&self, parent: &UnitId, child: &UnitId) -> HierarchyResult<()> {
        self.registry.remove_child(parent, child)
    }

    pub fn set_leader(&self, unit: &UnitId, member: &MemberId) -> HierarchyResult<()> {
        self.registry.set_leader(unit, member)
    }

    pub fn is_complete(&self, unit: &UnitId) -> HierarchyResult<bool> {
        self.registry.is_complete(unit)
    }

    pub fn get_children(&self, unit: &UnitId) -> HierarchyResult<Vec<ChildRef>> {
        self.registry.get_children(unit)
    }

    pub fn get_unit(&self, unit: &UnitId) -> HierarchyResult<Unit> {
        self.registry.get_unit(unit)
    }

    pub fn get_ancestor(&self, unit: &UnitId, tier: Tier) -> HierarchyResult<Option<UnitId>> {
        self.registry.get_ancestor(unit, tier)
    }

    pub fn unit_of_member(&self, member: &MemberId) -> HierarchyResult<Option<UnitId>> {
        self.registry.unit_of_member(member)
    }

    pub fn member_ancestor(&self, member: &MemberId, tier: Tier) -> HierarchyResult<Option<UnitId>> {
        self.registry.member_ancestor(member, tier)
    }

    pub fn leader_of(&self, unit: &UnitId) -> HierarchyResult<Option<MemberId>> {
        self.registry.leader_of(unit)
    }

    pub fn population(&self, unit: &UnitId) -> HierarchyResult<usize> {
        self.registry.population(unit)
    }

    pub fn units(&self) -> HierarchyResult<Vec<Unit>> {
        self.registry.units()
    }

    /// Current eligible signers for a unit, live
    pub fn signers_for(&self, unit: &UnitId, tier: Tier) -> HierarchyResult<Vec<MemberId>> {
        self.resolver.signers_for(unit, tier)
    }

    // Documents

    /// Open a document at the scope tier's grade, with signers resolved
    /// from current leadership
    pub fn issue_document(
        &self,
        scope: DocumentScope,
        action: DocumentAction,
        threshold: ThresholdPolicy,
        issuer: MemberId,
    ) -> HierarchyResult<QuorumDocument> {
        self.engine
            .issue(IssueRequest::new(scope, action, issuer).with_threshold(threshold))
    }

    /// Open a document with full control over signers, grade and deadline
    pub fn issue(&self, request: IssueRequest) -> HierarchyResult<QuorumDocument> {
        self.engine.issue(request)
    }

    pub fn sign(&self, document: &DocumentId, signer: &MemberId) -> HierarchyResult<SignOutcome> {
        self.engine.sign(document, signer)
    }

    pub fn finalize(&self, document: &DocumentId) -> HierarchyResult<EffectStatus> {
        self.engine.finalize(document)
    }

    pub fn expire(&self, document: &DocumentId) -> HierarchyResult<QuorumDocument> {
        self.engine.expire(document)
    }

    pub fn expire_stale(&self, now: DateTime<Utc>) -> HierarchyResult<Vec<DocumentId>> {
        self.engine.expire_stale(now)
    }

    pub fn retry_pending_effects(&self) -> HierarchyResult<Vec<DocumentId>> {
        self.engine.retry_pending_effects()
    }

    pub fn get_document(&self, document: &DocumentId) -> HierarchyResult<QuorumDocument> {
        self.engine.get_document(document)
    }

    pub fn open_documents(&self) -> HierarchyResult<Vec<QuorumDocument>> {
        self.engine.open_documents()
    }

    pub fn documents_for_unit(&self, unit: &UnitId) -> HierarchyResult<Vec<QuorumDocument>> {
        self.engine.documents_for_unit(unit)
    }

    // Notary

    pub fn grant(
        &self,
        issuer: MemberId,
        grade: NotaryGrade,
        scope: NotaryScope,
    ) -> HierarchyResult<NotaryGrant> {
        self.gate.grant(issuer, grade, scope)
    }

    pub fn revoke(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        scope: &NotaryScope,
    ) -> HierarchyResult<NotaryGrant> {
        self.gate.revoke(issuer, grade, scope)
    }

    pub fn is_authorized(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        unit: &UnitId,
    ) -> HierarchyResult<bool> {
        self.gate.is_authorized(issuer, grade, unit)
    }

    pub fn grants_for(&self, issuer: &MemberId) -> HierarchyResult<Vec<NotaryGrant>> {
        self.gate.grants_for(issuer)
    }

    // Verification

    pub fn enroll(&self, member: MemberId) -> HierarchyResult<MemberTrust> {
        self.verification.enroll(member)
    }

    pub fn request_verification(&self, member: &MemberId) -> HierarchyResult<MemberTrust> {
        self.verification.request_verification(member)
    }

    pub fn submit_peer_verification(
        &self,
        verifier: &MemberId,
        target: &MemberId,
    ) -> HierarchyResult<VerificationProgress> {
        self.verification.submit_peer_verification(verifier, target)
    }

    pub fn submit_super_verification(
        &self,
        authority: &MemberId,
        target: &MemberId,
        justification: impl Into<String>,
    ) -> HierarchyResult<VerificationProgress> {
        self.verification
            .submit_super_verification(authority, target, justification)
    }

    pub fn get_verification_status(&self, member: &MemberId) -> HierarchyResult<VerificationProgress> {
        self.verification.get_progress(member)
    }

    pub fn get_trust(&self, member: &MemberId) -> HierarchyResult<MemberTrust> {
        self.verification.get_trust(member)
    }

    pub fn verification_chain(&self, member: &MemberId) -> HierarchyResult<Vec<MemberId>> {
        self.verification.verification_chain(member)
    }

    pub fn chain_level(&self, member: &MemberId) -> HierarchyResult<Option<u32>> {
        self.verification.chain_level(member)
    }

    pub fn rotate_authorities(
        &self,
        authorities: impl IntoIterator<Item = MemberId>,
    ) -> HierarchyResult<()> {
        self.verification.rotate_authorities(authorities)
    }

    /// The authority set in force
    pub fn authorities(&self) -> HierarchyResult<Vec<MemberId>> {
        self.verification.authorities()
    }
}
