//! Units of the decimal hierarchy
//!
//! Units are stored arena-style: every reference to a parent, child or
//! leader is an id, never an owning pointer. A unit's completeness is a
//! cached flag that the registry recomputes bottom-up whenever an edge
//! below it changes.

use crate::{DocumentId, MemberId, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of children every unit holds when full
pub const DECIMAL_FANOUT: usize = 10;

/// A level of the hierarchy
///
/// Tiers are ordered `Base < Mid < High < Top`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Ten members (Arban)
    Base,
    /// Ten Base units, 100 people (Zun)
    Mid,
    /// Ten Mid units, 1,000 people (Myangan)
    High,
    /// Ten High units, 10,000 people (Tumen)
    Top,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Base, Tier::Mid, Tier::High, Tier::Top];

    /// Maximum number of direct children
    pub fn capacity(self) -> usize {
        DECIMAL_FANOUT
    }

    /// Number of people in a complete unit of this tier
    pub fn population(self) -> usize {
        DECIMAL_FANOUT.pow(self.rank() + 1)
    }

    /// Zero-based depth from the bottom of the hierarchy
    pub fn rank(self) -> u32 {
        match self {
            Tier::Base => 0,
            Tier::Mid => 1,
            Tier::High => 2,
            Tier::Top => 3,
        }
    }

    /// The tier of this tier's unit children (`None` for Base, whose
    /// children are members)
    pub fn child_tier(self) -> Option<Tier> {
        match self {
            Tier::Base => None,
            Tier::Mid => Some(Tier::Base),
            Tier::High => Some(Tier::Mid),
            Tier::Top => Some(Tier::High),
        }
    }

    /// The tier a unit of this tier registers into
    pub fn parent_tier(self) -> Option<Tier> {
        match self {
            Tier::Base => Some(Tier::Mid),
            Tier::Mid => Some(Tier::High),
            Tier::High => Some(Tier::Top),
            Tier::Top => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tier::Base => "base",
            Tier::Mid => "mid",
            Tier::High => "high",
            Tier::Top => "top",
        };
        write!(f, "{}", name)
    }
}

/// Something a unit can contain: a member (Base tier) or a unit (above)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildRef {
    Member(MemberId),
    Unit(UnitId),
}

impl std::fmt::Display for ChildRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildRef::Member(id) => write!(f, "member:{}", id),
            ChildRef::Unit(id) => write!(f, "unit:{}", id),
        }
    }
}

/// A resolution adopted by a unit through a finalized quorum document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub document_id: DocumentId,
    pub title: String,
    pub content_hash: String,
    pub adopted_at: DateTime<Utc>,
}

/// An organizational unit
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier
    pub id: UnitId,
    /// Hierarchy level
    pub tier: Tier,
    /// Human-readable name
    pub name: String,
    /// Parent unit, once registered upward
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<UnitId>,
    /// Ordered children: members for Base units, units otherwise
    pub children: Vec<ChildRef>,
    /// Current leader
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<MemberId>,
    /// Full complement of children, each itself complete
    pub complete: bool,
    /// Set the first time the unit becomes complete; sealed edges can only
    /// move through an authorized reassignment
    pub sealed: bool,
    /// Resolutions adopted by this unit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolutions: Vec<ResolutionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// Create a new, empty unit
    pub fn new(id: UnitId, tier: Tier, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            tier,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            leader: None,
            complete: false,
            sealed: false,
            resolutions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of direct children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether the unit has reached its tier capacity
    pub fn is_full(&self) -> bool {
        self.children.len() >= self.tier.capacity()
    }

    pub fn contains(&self, child: &ChildRef) -> bool {
        self.children.contains(child)
    }

    /// Direct members (Base units only; empty otherwise)
    pub fn member_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.children.iter().filter_map(|c| match c {
            ChildRef::Member(id) => Some(id),
            ChildRef::Unit(_) => None,
        })
    }

    /// Direct unit children (empty for Base units)
    pub fn unit_ids(&self) -> impl Iterator<Item = &UnitId> {
        self.children.iter().filter_map(|c| match c {
            ChildRef::Unit(id) => Some(id),
            ChildRef::Member(_) => None,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A recorded (child, parent) relation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEdge {
    pub child: ChildRef,
    pub parent: UnitId,
    /// Tier of the parent
    pub tier: Tier,
    pub recorded_at: DateTime<Utc>,
}

impl MembershipEdge {
    pub fn new(child: ChildRef, parent: UnitId, tier: Tier) -> Self {
        Self {
            child,
            parent,
            tier,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering_and_links() {
        assert!(Tier::Base < Tier::Mid && Tier::Mid < Tier::High && Tier::High < Tier::Top);
        assert_eq!(Tier::Mid.child_tier(), Some(Tier::Base));
        assert_eq!(Tier::Base.child_tier(), None);
        assert_eq!(Tier::High.parent_tier(), Some(Tier::Top));
        assert_eq!(Tier::Top.parent_tier(), None);
    }

    #[test]
    fn test_tier_capacity_and_population() {
        for tier in Tier::ALL {
            assert_eq!(tier.capacity(), 10);
        }
        assert_eq!(Tier::Base.population(), 10);
        assert_eq!(Tier::Mid.population(), 100);
        assert_eq!(Tier::High.population(), 1_000);
        assert_eq!(Tier::Top.population(), 10_000);
    }

    #[test]
    fn test_unit_children_views() {
        let mut unit = Unit::new(UnitId::new("arban-1"), Tier::Base, "Arban 1");
        unit.children.push(ChildRef::Member(MemberId::new("m-1")));
        unit.children.push(ChildRef::Member(MemberId::new("m-2")));

        assert_eq!(unit.child_count(), 2);
        assert_eq!(unit.member_ids().count(), 2);
        assert_eq!(unit.unit_ids().count(), 0);
        assert!(!unit.is_full());
        assert!(unit.contains(&ChildRef::Member(MemberId::new("m-1"))));
    }

    #[test]
    fn test_unit_serde_skips_empty_fields() {
        let unit = Unit::new(UnitId::new("zun-1"), Tier::Mid, "Zun 1");
        let json = serde_json::to_string(&unit).unwrap();
        assert!(!json.contains("leader"));
        assert!(!json.contains("resolutions"));

        let back: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, unit.id);
        assert_eq!(back.tier, Tier::Mid);
    }
}
