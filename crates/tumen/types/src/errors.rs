//! Error types for the hierarchy

use crate::{DocumentId, MemberId, NotaryGrade, Tier, UnitId};

/// Errors that can occur in hierarchy operations
///
/// Every variant is recoverable at the call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Unit already exists: {0}")]
    UnitAlreadyExists(UnitId),

    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("Member already enrolled: {0}")]
    MemberAlreadyEnrolled(MemberId),

    #[error("Capacity exceeded: unit {unit} already holds {capacity} children")]
    CapacityExceeded { unit: UnitId, capacity: usize },

    #[error("Already a member: {child} belongs to {parent}")]
    AlreadyMember { child: String, parent: UnitId },

    #[error("Not a member: {child} is not in {unit}")]
    NotAMember { child: String, unit: UnitId },

    #[error("Tier mismatch: expected {expected}, found {found}")]
    TierMismatch { expected: Tier, found: Tier },

    #[error("Leader vacant: child unit {child} of {unit} has no leader")]
    LeaderVacant { unit: UnitId, child: UnitId },

    #[error("Unit sealed: {0}")]
    UnitSealed(UnitId),

    #[error("Unauthorized: {issuer} may not issue {grade} documents for {unit}")]
    Unauthorized {
        issuer: MemberId,
        grade: NotaryGrade,
        unit: UnitId,
    },

    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Not eligible: {signer} may not sign {document}")]
    NotEligible {
        signer: MemberId,
        document: DocumentId,
    },

    #[error("Already signed: {signer} has signed {document}")]
    AlreadySigned {
        signer: MemberId,
        document: DocumentId,
    },

    #[error("Threshold not met: required {required} signatures, have {current}")]
    ThresholdNotMet { required: u32, current: u32 },

    #[error("Document already finalized: {0}")]
    AlreadyFinalized(DocumentId),

    #[error("Document expired: {0}")]
    DocumentExpired(DocumentId),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid deadline: {0}")]
    InvalidDeadline(String),

    #[error("Grant not found: {issuer} holds no {grade} grant for that scope")]
    GrantNotFound { issuer: MemberId, grade: NotaryGrade },

    #[error("Verifier not trusted: {0}")]
    VerifierNotTrusted(MemberId),

    #[error("Out of scope: {verifier} and {target} share no local unit")]
    OutOfScope { verifier: MemberId, target: MemberId },

    #[error("Duplicate verifier: {verifier} already attested {target}")]
    DuplicateVerifier { verifier: MemberId, target: MemberId },

    #[error("Self verification: {0}")]
    SelfVerification(MemberId),

    #[error("Verification quota exhausted for {verifier}: limit {limit}")]
    QuotaExhausted { verifier: MemberId, limit: u32 },

    #[error("Invalid authority: {0}")]
    InvalidAuthority(MemberId),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl HierarchyError {
    /// Whether the error reports an operation that had already taken
    /// effect, as opposed to one that was rejected outright
    pub fn is_already_done(&self) -> bool {
        matches!(
            self,
            HierarchyError::AlreadyFinalized(_)
                | HierarchyError::AlreadySigned { .. }
                | HierarchyError::AlreadyMember { .. }
                | HierarchyError::DuplicateVerifier { .. }
        )
    }

    /// Whether retrying the same call later could succeed without any
    /// change to its input or to the hierarchy
    pub fn is_transient(&self) -> bool {
        matches!(self, HierarchyError::LockPoisoned | HierarchyError::Storage(_))
    }
}

/// Result type alias for hierarchy operations
pub type HierarchyResult<T> = Result<T, HierarchyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = HierarchyError::CapacityExceeded {
            unit: UnitId::new("zun-1"),
            capacity: 10,
        };
        assert_eq!(
            err.to_string(),
            "Capacity exceeded: unit zun-1 already holds 10 children"
        );

        let err = HierarchyError::ThresholdNotMet {
            required: 10,
            current: 9,
        };
        assert!(err.to_string().contains("required 10"));
    }

    #[test]
    fn test_already_done_classification() {
        assert!(HierarchyError::AlreadyFinalized(DocumentId::new("d")).is_already_done());
        assert!(!HierarchyError::LockPoisoned.is_already_done());
        assert!(!HierarchyError::NotEligible {
            signer: MemberId::new("x"),
            document: DocumentId::new("d"),
        }
        .is_already_done());
    }

    #[test]
    fn test_transient_classification() {
        assert!(HierarchyError::Storage("down".into()).is_transient());
        assert!(!HierarchyError::NotAMember {
            child: "m".into(),
            unit: UnitId::new("arban"),
        }
        .is_transient());
    }
}
