//! Facts emitted by hierarchy state transitions
//!
//! Downstream consumers (capability unlocks, notifications) read these
//! rather than polling the registry.

use crate::{ChildRef, DocumentId, MemberId, Tier, UnitId, VerificationPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something that happened to the hierarchy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyEvent {
    UnitCreated {
        unit: UnitId,
        tier: Tier,
    },
    ChildRegistered {
        parent: UnitId,
        child: ChildRef,
    },
    ChildRemoved {
        parent: UnitId,
        child: ChildRef,
    },
    UnitCompleted {
        unit: UnitId,
        tier: Tier,
    },
    LeadershipChanged {
        unit: UnitId,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<MemberId>,
        leader: MemberId,
    },
    ResolutionAdopted {
        unit: UnitId,
        document: DocumentId,
        title: String,
    },
    ChildReassigned {
        child: UnitId,
        from: UnitId,
        to: UnitId,
    },
    DocumentIssued {
        document: DocumentId,
        unit: UnitId,
        issuer: MemberId,
    },
    DocumentSigned {
        document: DocumentId,
        signer: MemberId,
        signatures: u32,
    },
    DocumentFinalized {
        document: DocumentId,
    },
    DocumentExpired {
        document: DocumentId,
    },
    EffectApplied {
        document: DocumentId,
    },
    EffectRejected {
        document: DocumentId,
        reason: String,
    },
    MemberVerified {
        member: MemberId,
        via: VerificationPath,
    },
}

/// An event with its journal position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonic sequence number within the journal
    pub entry_id: u64,
    pub event: HierarchyEvent,
    pub recorded_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(entry_id: u64, event: HierarchyEvent) -> Self {
        Self {
            entry_id,
            event,
            recorded_at: Utc::now(),
        }
    }
}
