//! Notary grants: who may open quorum documents
//!
//! Issuance rights are independent of signing eligibility. A grant lets an
//! identity *open* documents of a grade within a scope; who may *sign* is
//! decided separately from unit leadership.

use crate::{MemberId, Tier, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum tier of document an identity may issue
///
/// Grades are ordered `Base < Mid < High < Top`, mirroring [`Tier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotaryGrade {
    Base,
    Mid,
    High,
    Top,
}

impl NotaryGrade {
    /// The grade a document scoped to a unit of `tier` requires
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Base => NotaryGrade::Base,
            Tier::Mid => NotaryGrade::Mid,
            Tier::High => NotaryGrade::High,
            Tier::Top => NotaryGrade::Top,
        }
    }

    /// Whether a holder of this grade covers `other` when grades are
    /// treated as monotonic
    pub fn covers(self, other: NotaryGrade) -> bool {
        self >= other
    }
}

impl std::fmt::Display for NotaryGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotaryGrade::Base => "base",
            NotaryGrade::Mid => "mid",
            NotaryGrade::High => "high",
            NotaryGrade::Top => "top",
        };
        write!(f, "{}", name)
    }
}

/// Where a grant applies
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotaryScope {
    /// Every unit
    Global,
    /// The unit and everything below it
    Unit(UnitId),
}

impl std::fmt::Display for NotaryScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotaryScope::Global => write!(f, "global"),
            NotaryScope::Unit(id) => write!(f, "unit:{}", id),
        }
    }
}

/// Permission to issue documents of up to `grade` within `scope`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryGrant {
    pub issuer: MemberId,
    pub grade: NotaryGrade,
    pub scope: NotaryScope,
    pub granted_at: DateTime<Utc>,
}

impl NotaryGrant {
    pub fn new(issuer: MemberId, grade: NotaryGrade, scope: NotaryScope) -> Self {
        Self {
            issuer,
            grade,
            scope,
            granted_at: Utc::now(),
        }
    }
}
