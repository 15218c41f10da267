//! Quorum documents: threshold-signed changes to the hierarchy
//!
//! A quorum document names a target unit, an action to apply to it, and
//! the frozen set of members allowed to sign. It becomes authoritative
//! only once the resolved threshold count of distinct eligible signatures
//! has been collected. Status moves `Open -> Finalized` or
//! `Open -> Expired`, never backward.

use crate::{DocumentId, MemberId, NotaryGrade, Tier, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The unit a document acts on
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentScope {
    pub unit: UnitId,
    pub tier: Tier,
}

impl DocumentScope {
    pub fn new(unit: UnitId, tier: Tier) -> Self {
        Self { unit, tier }
    }
}

impl std::fmt::Display for DocumentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.unit, self.tier)
    }
}

/// Effect applied to the hierarchy once a document finalizes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentAction {
    /// Set the scope unit's leader
    AppointLeader { member: MemberId },
    /// Record a collective resolution on the scope unit
    AdoptResolution { title: String, content_hash: String },
    /// Move a child unit out of the scope unit into another parent
    ReassignChild { child: UnitId, new_parent: UnitId },
    /// Founding act of a Base unit, co-signed by its members; sets the
    /// initial leader
    FoundBaseUnit { leader: MemberId },
}

impl DocumentAction {
    /// Stable short name used in logs and journal entries
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentAction::AppointLeader { .. } => "appoint_leader",
            DocumentAction::AdoptResolution { .. } => "adopt_resolution",
            DocumentAction::ReassignChild { .. } => "reassign_child",
            DocumentAction::FoundBaseUnit { .. } => "found_base_unit",
        }
    }
}

/// How many of the eligible signers must sign
///
/// The policy is resolved to a plain count against the signer snapshot at
/// issuance; the document only ever compares against that count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// Exactly this many signatures
    Count(u32),
    /// More than half of the eligible signers
    Majority,
    /// At least `numerator / denominator` of the eligible signers, rounded up
    Supermajority { numerator: u32, denominator: u32 },
    /// Every eligible signer
    Unanimous,
}

impl ThresholdPolicy {
    /// Create a supermajority policy
    pub fn supermajority(numerator: u32, denominator: u32) -> Self {
        Self::Supermajority {
            numerator,
            denominator,
        }
    }

    /// Resolve to a signature count for `eligible` signers.
    ///
    /// Returns `None` when the policy cannot be evaluated (zero denominator
    /// or a fraction above one). Range checks against the snapshot size are
    /// left to the caller.
    pub fn resolve(&self, eligible: usize) -> Option<u32> {
        let eligible = u32::try_from(eligible).ok()?;
        match self {
            ThresholdPolicy::Count(n) => Some(*n),
            ThresholdPolicy::Majority => Some(eligible / 2 + 1),
            ThresholdPolicy::Supermajority {
                numerator,
                denominator,
            } => {
                if *denominator == 0 || numerator > denominator {
                    return None;
                }
                let scaled = u64::from(eligible) * u64::from(*numerator);
                let count = scaled.div_ceil(u64::from(*denominator));
                u32::try_from(count).ok()
            }
            ThresholdPolicy::Unanimous => Some(eligible),
        }
    }
}

/// Where the eligible signer set came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerSource {
    /// Resolved from live unit leadership at issuance
    Resolved,
    /// Supplied by the issuer
    Explicit(Vec<MemberId>),
}

/// How a snapshot was obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotOrigin {
    Resolved,
    Explicit,
}

/// The eligible signer set, frozen at issuance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSnapshot {
    /// Distinct signers in resolution order
    pub signers: Vec<MemberId>,
    pub source: SnapshotOrigin,
    pub captured_at: DateTime<Utc>,
}

impl SignerSnapshot {
    /// Freeze a signer list, dropping duplicates while keeping order
    pub fn capture(signers: impl IntoIterator<Item = MemberId>, source: SnapshotOrigin) -> Self {
        let mut distinct: Vec<MemberId> = Vec::new();
        for signer in signers {
            if !distinct.contains(&signer) {
                distinct.push(signer);
            }
        }
        Self {
            signers: distinct,
            source,
            captured_at: Utc::now(),
        }
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.signers.contains(member)
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

/// One accepted signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub signer: MemberId,
    pub signed_at: DateTime<Utc>,
}

/// Lifecycle state of a quorum document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DocumentStatus {
    /// Collecting signatures
    #[default]
    Open,
    /// Threshold reached; read-only from here on
    Finalized,
    /// Closed unsigned by an explicit expiry
    Expired,
}

/// A proposed action awaiting a threshold of eligible signatures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuorumDocument {
    /// Unique identifier
    pub id: DocumentId,
    /// Human-readable title
    pub title: String,
    /// Target unit
    pub scope: DocumentScope,
    /// Effect applied on finalization
    pub action: DocumentAction,
    /// Policy as requested by the issuer
    pub threshold_policy: ThresholdPolicy,
    /// Resolved signature count
    pub threshold: u32,
    /// Who may sign, frozen at issuance
    pub eligible: SignerSnapshot,
    /// Accepted signatures, in arrival order
    pub signatures: Vec<SignatureEntry>,
    pub status: DocumentStatus,
    pub issuer: MemberId,
    pub grade: NotaryGrade,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    /// Whether the action has been applied to the registry. A finalized
    /// document with this unset is pending recovery.
    pub effect_applied: bool,
    /// Why the registry refused the action, when it did. Such a document
    /// is finalized but its effect is never retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_failure: Option<String>,
}

impl QuorumDocument {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: impl Into<String>,
        scope: DocumentScope,
        action: DocumentAction,
        threshold_policy: ThresholdPolicy,
        threshold: u32,
        eligible: SignerSnapshot,
        issuer: MemberId,
        grade: NotaryGrade,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            title: title.into(),
            scope,
            action,
            threshold_policy,
            threshold,
            eligible,
            signatures: Vec::new(),
            status: DocumentStatus::Open,
            issuer,
            grade,
            created_at: Utc::now(),
            deadline: None,
            finalized_at: None,
            expired_at: None,
            effect_applied: false,
            effect_failure: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == DocumentStatus::Open
    }

    pub fn is_finalized(&self) -> bool {
        self.status == DocumentStatus::Finalized
    }

    pub fn is_eligible(&self, signer: &MemberId) -> bool {
        self.eligible.contains(signer)
    }

    pub fn has_signed(&self, signer: &MemberId) -> bool {
        self.signatures.iter().any(|s| s.signer == *signer)
    }

    /// Number of signatures collected
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn threshold_met(&self) -> bool {
        self.signatures.len() >= self.threshold as usize
    }

    /// Finalized but the effect has neither been applied nor refused
    pub fn effect_pending(&self) -> bool {
        self.is_finalized() && !self.effect_applied && self.effect_failure.is_none()
    }

    /// Whether the deadline has passed at `now`
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Signers in arrival order
    pub fn signers(&self) -> Vec<MemberId> {
        self.signatures.iter().map(|s| s.signer.clone()).collect()
    }
}
