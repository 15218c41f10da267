//! Quorum Document Engine
//!
//! A generic `Open -> Finalized` state machine (with an explicit
//! `Open -> Expired` exit). Each document sits behind its own mutex, so
//! concurrent signatures on one document are serialized while different
//! documents proceed independently. Finalization marks the document
//! Finalized and persists that before the effect runs; a crash in between
//! leaves a document that [`QuorumEngine::retry_pending_effects`] completes.
//!
//! Every change is made on a copy of the document and only replaces the
//! held one once the store has accepted it. A document past its deadline
//! refuses signatures but stays Open until `expire` or `expire_stale`
//! closes it.

use crate::config::QuorumConfig;
use crate::journal::EventJournal;
use crate::notary_gate::NotaryGate;
use crate::signer_resolver::SignerResolver;
use crate::store::{HierarchySnapshot, HierarchyStore};
use crate::unit_registry::{EffectSink, UnitRegistry};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};
use tumen_types::{
    ChildRef, DocumentAction, DocumentId, DocumentScope, DocumentStatus, HierarchyError,
    HierarchyEvent, HierarchyResult, MemberId, NotaryGrade, QuorumDocument, SignatureEntry,
    SignerSnapshot, SignerSource, SnapshotOrigin, ThresholdPolicy, Tier, UnitId,
};

/// Everything needed to open a document
#[derive(Clone, Debug)]
pub struct IssueRequest {
    pub scope: DocumentScope,
    pub title: String,
    pub action: DocumentAction,
    pub threshold: ThresholdPolicy,
    pub signers: SignerSource,
    pub issuer: MemberId,
    pub grade: NotaryGrade,
    pub ttl: Option<Duration>,
}

impl IssueRequest {
    /// A request at the scope tier's grade, requiring every resolved signer
    pub fn new(scope: DocumentScope, action: DocumentAction, issuer: MemberId) -> Self {
        Self {
            title: action.kind().to_string(),
            grade: NotaryGrade::for_tier(scope.tier),
            scope,
            action,
            threshold: ThresholdPolicy::Unanimous,
            signers: SignerSource::Resolved,
            issuer,
            ttl: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_threshold(mut self, threshold: ThresholdPolicy) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_signers(mut self, signers: SignerSource) -> Self {
        self.signers = signers;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Whether a finalized document's effect reached the registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectStatus {
    Applied,
    /// The effect failed for a transient reason; the document stays
    /// finalized and is picked up by `retry_pending_effects`
    Pending,
    /// The registry refused the effect; the reason is recorded on the
    /// document and it is never retried
    Rejected,
}

/// Result of a successful signature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignOutcome {
    /// Recorded; the document is still open
    Accepted { signatures: u32, threshold: u32 },
    /// This signature reached the threshold and finalized the document
    Finalized { effect: EffectStatus },
}

type DocumentHandle = Arc<Mutex<QuorumDocument>>;

pub struct QuorumEngine {
    documents: RwLock<HashMap<DocumentId, DocumentHandle>>,
    registry: Arc<UnitRegistry>,
    resolver: Arc<SignerResolver>,
    gate: Arc<NotaryGate>,
    sink: Arc<dyn EffectSink>,
    store: Arc<dyn HierarchyStore>,
    journal: Arc<EventJournal>,
    config: QuorumConfig,
}

impl QuorumEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<UnitRegistry>,
        resolver: Arc<SignerResolver>,
        gate: Arc<NotaryGate>,
        sink: Arc<dyn EffectSink>,
        store: Arc<dyn HierarchyStore>,
        journal: Arc<EventJournal>,
        config: QuorumConfig,
    ) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            registry,
            resolver,
            gate,
            sink,
            store,
            journal,
            config,
        }
    }

    /// Reload documents from persisted state
    pub fn load(&self, snapshot: &HierarchySnapshot) -> HierarchyResult<()> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        for document in &snapshot.documents {
            documents.insert(document.id.clone(), Arc::new(Mutex::new(document.clone())));
        }
        info!(documents = documents.len(), "Quorum documents loaded");
        Ok(())
    }

    /// Open a new document
    pub fn issue(&self, request: IssueRequest) -> HierarchyResult<QuorumDocument> {
        let IssueRequest {
            scope,
            title,
            action,
            threshold: policy,
            signers,
            issuer,
            grade,
            ttl,
        } = request;

        let required = NotaryGrade::for_tier(scope.tier);
        if grade < required {
            warn!(issuer = %issuer, grade = %grade, required = %required, "Grade below scope tier");
            return Err(HierarchyError::Unauthorized {
                issuer,
                grade,
                unit: scope.unit,
            });
        }
        self.gate.require(&issuer, grade, &scope.unit)?;

        let unit = self.registry.get_unit(&scope.unit)?;
        if unit.tier != scope.tier {
            return Err(HierarchyError::TierMismatch {
                expected: scope.tier,
                found: unit.tier,
            });
        }
        self.validate_action(&scope, &action)?;
        if let Some(ttl) = ttl {
            if ttl <= Duration::zero() {
                return Err(HierarchyError::InvalidDeadline(format!(
                    "time to live must be positive, got {}s",
                    ttl.num_seconds()
                )));
            }
        }

        let snapshot = match signers {
            SignerSource::Resolved => self.resolver.snapshot(&scope.unit, scope.tier)?,
            SignerSource::Explicit(list) => SignerSnapshot::capture(list, SnapshotOrigin::Explicit),
        };
        let threshold = match policy.resolve(snapshot.len()) {
            Some(count) if count >= 1 && count as usize <= snapshot.len() => count,
            Some(count) => {
                return Err(HierarchyError::InvalidThreshold(format!(
                    "{} signatures required from {} eligible signers",
                    count,
                    snapshot.len()
                )))
            }
            None => {
                return Err(HierarchyError::InvalidThreshold(format!(
                    "{:?} cannot be resolved",
                    policy
                )))
            }
        };

        let mut document = QuorumDocument::new(
            title, scope, action, policy, threshold, snapshot, issuer, grade,
        );
        let ttl = ttl.or_else(|| {
            self.config
                .default_ttl_secs
                .and_then(|secs| i64::try_from(secs).ok())
                .map(Duration::seconds)
        });
        if let Some(ttl) = ttl {
            document.deadline = Some(document.created_at + ttl);
        }

        self.store.put_document(&document)?;
        self.documents
            .write()
            .map_err(|_| HierarchyError::LockPoisoned)?
            .insert(document.id.clone(), Arc::new(Mutex::new(document.clone())));
        self.journal.record(HierarchyEvent::DocumentIssued {
            document: document.id.clone(),
            unit: document.scope.unit.clone(),
            issuer: document.issuer.clone(),
        })?;
        info!(
            document = %document.id,
            scope = %document.scope,
            action = document.action.kind(),
            threshold = document.threshold,
            eligible = document.eligible.len(),
            "Quorum document issued"
        );
        Ok(document)
    }

    /// Candidates named by the action must already sit where the action
    /// needs them
    fn validate_action(&self, scope: &DocumentScope, action: &DocumentAction) -> HierarchyResult<()> {
        match action {
            DocumentAction::AppointLeader { member } => self.require_in_subtree(&scope.unit, member),
            DocumentAction::FoundBaseUnit { leader } => {
                if scope.tier != Tier::Base {
                    return Err(HierarchyError::TierMismatch {
                        expected: Tier::Base,
                        found: scope.tier,
                    });
                }
                self.require_in_subtree(&scope.unit, leader)
            }
            DocumentAction::ReassignChild { child, new_parent } => {
                let child_ref = ChildRef::Unit(child.clone());
                if !self.registry.get_children(&scope.unit)?.contains(&child_ref) {
                    return Err(HierarchyError::NotAMember {
                        child: child_ref.to_string(),
                        unit: scope.unit.clone(),
                    });
                }
                let target = self.registry.get_unit(new_parent)?;
                if target.tier != scope.tier {
                    return Err(HierarchyError::TierMismatch {
                        expected: scope.tier,
                        found: target.tier,
                    });
                }
                Ok(())
            }
            DocumentAction::AdoptResolution { .. } => Ok(()),
        }
    }

    fn require_in_subtree(&self, unit: &UnitId, member: &MemberId) -> HierarchyResult<()> {
        if self.registry.in_subtree(unit, member)? {
            Ok(())
        } else {
            Err(HierarchyError::NotAMember {
                child: member.to_string(),
                unit: unit.clone(),
            })
        }
    }

    fn handle(&self, id: &DocumentId) -> HierarchyResult<DocumentHandle> {
        self.documents
            .read()
            .map_err(|_| HierarchyError::LockPoisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| HierarchyError::DocumentNotFound(id.clone()))
    }

    fn handles(&self) -> HierarchyResult<Vec<DocumentHandle>> {
        Ok(self
            .documents
            .read()
            .map_err(|_| HierarchyError::LockPoisoned)?
            .values()
            .cloned()
            .collect())
    }

    /// Add a signature. A signer outside the snapshot is rejected with
    /// `NotEligible` whatever state the document is in.
    pub fn sign(&self, id: &DocumentId, signer: &MemberId) -> HierarchyResult<SignOutcome> {
        let handle = self.handle(id)?;
        let mut document = handle.lock().map_err(|_| HierarchyError::LockPoisoned)?;
        if !document.is_eligible(signer) {
            warn!(document = %id, signer = %signer, "Signature rejected: not eligible");
            return Err(HierarchyError::NotEligible {
                signer: signer.clone(),
                document: id.clone(),
            });
        }
        Self::ensure_open(&document, Utc::now())?;
        if document.has_signed(signer) {
            debug!(document = %id, signer = %signer, "Signature rejected: already signed");
            return Err(HierarchyError::AlreadySigned {
                signer: signer.clone(),
                document: id.clone(),
            });
        }

        let mut staged = document.clone();
        staged.signatures.push(SignatureEntry {
            signer: signer.clone(),
            signed_at: Utc::now(),
        });
        self.store.put_document(&staged)?;
        *document = staged;
        let signatures = document.signature_count() as u32;
        self.journal.record(HierarchyEvent::DocumentSigned {
            document: id.clone(),
            signer: signer.clone(),
            signatures,
        })?;
        debug!(
            document = %id,
            signer = %signer,
            signatures,
            threshold = document.threshold,
            "Signature accepted"
        );

        if document.threshold_met() && self.config.auto_finalize {
            let effect = self.finalize_locked(&mut document)?;
            return Ok(SignOutcome::Finalized { effect });
        }
        Ok(SignOutcome::Accepted {
            signatures,
            threshold: document.threshold,
        })
    }

    /// Finalize a document whose threshold is met. A second call reports
    /// `AlreadyFinalized` and changes nothing.
    pub fn finalize(&self, id: &DocumentId) -> HierarchyResult<EffectStatus> {
        let handle = self.handle(id)?;
        let mut document = handle.lock().map_err(|_| HierarchyError::LockPoisoned)?;
        Self::ensure_open(&document, Utc::now())?;
        if !document.threshold_met() {
            return Err(HierarchyError::ThresholdNotMet {
                required: document.threshold,
                current: document.signature_count() as u32,
            });
        }
        self.finalize_locked(&mut document)
    }

    /// Close an open document without applying it
    pub fn expire(&self, id: &DocumentId) -> HierarchyResult<QuorumDocument> {
        let handle = self.handle(id)?;
        let mut document = handle.lock().map_err(|_| HierarchyError::LockPoisoned)?;
        let status = document.status;
        match status {
            DocumentStatus::Finalized => Err(HierarchyError::AlreadyFinalized(id.clone())),
            DocumentStatus::Expired => Err(HierarchyError::DocumentExpired(id.clone())),
            DocumentStatus::Open => {
                self.expire_locked(&mut document, Utc::now())?;
                Ok(document.clone())
            }
        }
    }

    /// Expire every open document whose deadline has passed at `now`
    pub fn expire_stale(&self, now: DateTime<Utc>) -> HierarchyResult<Vec<DocumentId>> {
        let mut expired = Vec::new();
        for handle in self.handles()? {
            let mut document = handle.lock().map_err(|_| HierarchyError::LockPoisoned)?;
            if document.is_open() && document.deadline_passed(now) {
                self.expire_locked(&mut document, now)?;
                expired.push(document.id.clone());
            }
        }
        expired.sort();
        Ok(expired)
    }

    /// Apply the effect of every finalized document whose effect has not
    /// landed yet. Returns the documents completed by this call.
    pub fn retry_pending_effects(&self) -> HierarchyResult<Vec<DocumentId>> {
        let mut completed = Vec::new();
        for handle in self.handles()? {
            let mut document = handle.lock().map_err(|_| HierarchyError::LockPoisoned)?;
            if document.effect_pending() && self.apply_effect(&mut document)? == EffectStatus::Applied
            {
                completed.push(document.id.clone());
            }
        }
        if !completed.is_empty() {
            info!(documents = completed.len(), "Pending effects completed");
        }
        completed.sort();
        Ok(completed)
    }

    pub fn get_document(&self, id: &DocumentId) -> HierarchyResult<QuorumDocument> {
        let handle = self.handle(id)?;
        let document = handle.lock().map_err(|_| HierarchyError::LockPoisoned)?;
        Ok(document.clone())
    }

    /// All documents, oldest first
    pub fn documents(&self) -> HierarchyResult<Vec<QuorumDocument>> {
        let mut documents = Vec::new();
        for handle in self.handles()? {
            let document = handle.lock().map_err(|_| HierarchyError::LockPoisoned)?;
            documents.push(document.clone());
        }
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(documents)
    }

    pub fn open_documents(&self) -> HierarchyResult<Vec<QuorumDocument>> {
        Ok(self
            .documents()?
            .into_iter()
            .filter(|d| d.is_open())
            .collect())
    }

    pub fn documents_for_unit(&self, unit: &UnitId) -> HierarchyResult<Vec<QuorumDocument>> {
        Ok(self
            .documents()?
            .into_iter()
            .filter(|d| d.scope.unit == *unit)
            .collect())
    }

    /// Reject anything but an open document still inside its deadline.
    /// Leaves the document untouched either way.
    fn ensure_open(document: &QuorumDocument, now: DateTime<Utc>) -> HierarchyResult<()> {
        match document.status {
            DocumentStatus::Finalized => Err(HierarchyError::AlreadyFinalized(document.id.clone())),
            DocumentStatus::Expired => Err(HierarchyError::DocumentExpired(document.id.clone())),
            DocumentStatus::Open if document.deadline_passed(now) => {
                debug!(document = %document.id, "Rejected: deadline passed");
                Err(HierarchyError::DocumentExpired(document.id.clone()))
            }
            DocumentStatus::Open => Ok(()),
        }
    }

    fn expire_locked(&self, document: &mut QuorumDocument, now: DateTime<Utc>) -> HierarchyResult<()> {
        let mut staged = document.clone();
        staged.status = DocumentStatus::Expired;
        staged.expired_at = Some(now);
        self.store.put_document(&staged)?;
        *document = staged;
        self.journal.record(HierarchyEvent::DocumentExpired {
            document: document.id.clone(),
        })?;
        info!(
            document = %document.id,
            signatures = document.signature_count(),
            threshold = document.threshold,
            "Quorum document expired"
        );
        Ok(())
    }

    fn finalize_locked(&self, document: &mut QuorumDocument) -> HierarchyResult<EffectStatus> {
        let mut staged = document.clone();
        staged.status = DocumentStatus::Finalized;
        staged.finalized_at = Some(Utc::now());
        self.store.put_document(&staged)?;
        *document = staged;
        self.journal.record(HierarchyEvent::DocumentFinalized {
            document: document.id.clone(),
        })?;
        info!(
            document = %document.id,
            scope = %document.scope,
            signatures = document.signature_count(),
            "Quorum document finalized"
        );
        self.apply_effect(document)
    }

    fn apply_effect(&self, document: &mut QuorumDocument) -> HierarchyResult<EffectStatus> {
        match self.sink.apply(document) {
            Ok(_) => {
                let mut staged = document.clone();
                staged.effect_applied = true;
                self.store.put_document(&staged)?;
                *document = staged;
                self.journal.record(HierarchyEvent::EffectApplied {
                    document: document.id.clone(),
                })?;
                Ok(EffectStatus::Applied)
            }
            Err(err) if err.is_transient() => {
                warn!(document = %document.id, error = %err, "Effect application failed; left pending");
                Ok(EffectStatus::Pending)
            }
            Err(err) => {
                let mut staged = document.clone();
                staged.effect_failure = Some(err.to_string());
                self.store.put_document(&staged)?;
                *document = staged;
                self.journal.record(HierarchyEvent::EffectRejected {
                    document: document.id.clone(),
                    reason: err.to_string(),
                })?;
                warn!(document = %document.id, error = %err, "Effect rejected by registry");
                Ok(EffectStatus::Rejected)
            }
        }
    }
}
