//! Identity trust state and verification records

use crate::MemberId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member's identity standing
///
/// Transitions only move forward: `Draft -> Pending -> Verified`.
/// A Draft member may also jump straight to Verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum TrustState {
    /// Enrolled, has not asked for verification
    #[default]
    Draft,
    /// Awaiting attestations
    Pending,
    /// Terminal
    Verified,
}

impl TrustState {
    pub fn can_transition_to(self, next: TrustState) -> bool {
        next > self
    }
}

impl std::fmt::Display for TrustState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TrustState::Draft => "draft",
            TrustState::Pending => "pending",
            TrustState::Verified => "verified",
        };
        write!(f, "{}", name)
    }
}

/// How a member reached Verified
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationPath {
    /// Peer attestations reached the threshold
    PeerQuorum,
    /// A listed authority vouched directly
    Authority(MemberId),
}

/// Trust record for one member
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTrust {
    pub member: MemberId,
    pub state: TrustState,
    pub enrolled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_via: Option<VerificationPath>,
}

impl MemberTrust {
    pub fn new(member: MemberId) -> Self {
        Self {
            member,
            state: TrustState::Draft,
            enrolled_at: Utc::now(),
            verified_at: None,
            verified_via: None,
        }
    }

    /// A member that starts out verified (a founder-mandate identity)
    pub fn verified(member: MemberId, via: VerificationPath) -> Self {
        let now = Utc::now();
        Self {
            member,
            state: TrustState::Verified,
            enrolled_at: now,
            verified_at: Some(now),
            verified_via: Some(via),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.state == TrustState::Verified
    }

    /// Move to Verified. Returns false if already there.
    pub fn mark_verified(&mut self, via: VerificationPath) -> bool {
        if self.is_verified() {
            return false;
        }
        self.state = TrustState::Verified;
        self.verified_at = Some(Utc::now());
        self.verified_via = Some(via);
        true
    }
}

/// One peer attestation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub verifier: MemberId,
    pub target: MemberId,
    pub recorded_at: DateTime<Utc>,
    /// Recorded after the target was already verified; kept for history
    /// but never counted
    #[serde(default)]
    pub inert: bool,
}

impl VerificationRecord {
    pub fn new(verifier: MemberId, target: MemberId) -> Self {
        Self {
            verifier,
            target,
            recorded_at: Utc::now(),
            inert: false,
        }
    }
}

/// An authority override
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperVerification {
    pub authority: MemberId,
    pub target: MemberId,
    pub justification: String,
    pub recorded_at: DateTime<Utc>,
}

impl SuperVerification {
    pub fn new(authority: MemberId, target: MemberId, justification: impl Into<String>) -> Self {
        Self {
            authority,
            target,
            justification: justification.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Progress toward peer verification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationProgress {
    /// Counted peer attestations
    pub count: u32,
    pub threshold: u32,
    pub verified: bool,
    pub state: TrustState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_verified_by: Option<MemberId>,
}
