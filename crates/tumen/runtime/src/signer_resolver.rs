//! Eligible-Signer Resolver
//!
//! Reads live leadership from the registry. A document freezes the result
//! at issuance; nothing here is cached between calls.

use crate::unit_registry::UnitRegistry;
use std::sync::Arc;
use tracing::warn;
use tumen_types::{
    ChildRef, HierarchyError, HierarchyResult, MemberId, SignerSnapshot, SnapshotOrigin, Tier,
    UnitId,
};

pub struct SignerResolver {
    registry: Arc<UnitRegistry>,
}

impl SignerResolver {
    pub fn new(registry: Arc<UnitRegistry>) -> Self {
        Self { registry }
    }

    /// One signer per immediate child of `unit_id`: the members themselves
    /// for a Base unit, each child unit's current leader otherwise. Any
    /// child unit without a leader fails the call with `LeaderVacant`.
    pub fn signers_for(&self, unit_id: &UnitId, tier: Tier) -> HierarchyResult<Vec<MemberId>> {
        let unit = self.registry.get_unit(unit_id)?;
        if unit.tier != tier {
            return Err(HierarchyError::TierMismatch {
                expected: tier,
                found: unit.tier,
            });
        }

        let mut signers = Vec::with_capacity(unit.child_count());
        for child in &unit.children {
            match child {
                ChildRef::Member(member) => signers.push(member.clone()),
                ChildRef::Unit(child_id) => match self.registry.leader_of(child_id)? {
                    Some(leader) => signers.push(leader),
                    None => {
                        warn!(unit = %unit_id, child = %child_id, "Signer resolution failed: leader vacant");
                        return Err(HierarchyError::LeaderVacant {
                            unit: unit_id.clone(),
                            child: child_id.clone(),
                        });
                    }
                },
            }
        }
        Ok(signers)
    }

    /// Resolve and freeze
    pub fn snapshot(&self, unit_id: &UnitId, tier: Tier) -> HierarchyResult<SignerSnapshot> {
        let signers = self.signers_for(unit_id, tier)?;
        Ok(SignerSnapshot::capture(signers, SnapshotOrigin::Resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::EventJournal;
    use crate::store::MemoryStore;

    fn setup() -> (Arc<UnitRegistry>, SignerResolver) {
        let registry = Arc::new(UnitRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::new(EventJournal::new()),
        ));
        (registry.clone(), SignerResolver::new(registry))
    }

    #[test]
    fn test_base_signers_are_members() {
        let (registry, resolver) = setup();
        let base = UnitId::new("arban");
        registry.create_unit(base.clone(), Tier::Base, "Arban").unwrap();
        registry.register_member(&base, MemberId::new("a")).unwrap();
        registry.register_member(&base, MemberId::new("b")).unwrap();

        let signers = resolver.signers_for(&base, Tier::Base).unwrap();
        assert_eq!(signers, vec![MemberId::new("a"), MemberId::new("b")]);
    }

    fn zun_with_bases(registry: &UnitRegistry, led: impl Fn(usize) -> bool) -> UnitId {
        let zun = UnitId::new("zun");
        registry.create_unit(zun.clone(), Tier::Mid, "Zun").unwrap();
        for i in 0..3 {
            let base = UnitId::new(format!("arban-{}", i));
            registry.create_unit(base.clone(), Tier::Base, "Arban").unwrap();
            let member = MemberId::new(format!("m-{}", i));
            registry.register_member(&base, member.clone()).unwrap();
            if led(i) {
                registry.set_leader(&base, &member).unwrap();
            }
            registry.register_child(&zun, &base).unwrap();
        }
        zun
    }

    #[test]
    fn test_mid_signers_are_child_leaders() {
        let (registry, resolver) = setup();
        let zun = zun_with_bases(&registry, |_| true);

        let snapshot = resolver.snapshot(&zun, Tier::Mid).unwrap();
        assert_eq!(
            snapshot.signers,
            vec![MemberId::new("m-0"), MemberId::new("m-1"), MemberId::new("m-2")]
        );
        assert_eq!(snapshot.source, SnapshotOrigin::Resolved);
    }

    #[test]
    fn test_leaderless_child_fails_resolution() {
        let (registry, resolver) = setup();
        let zun = zun_with_bases(&registry, |i| i != 1);

        let result = resolver.snapshot(&zun, Tier::Mid);
        assert!(matches!(
            result,
            Err(HierarchyError::LeaderVacant { ref child, .. }) if *child == UnitId::new("arban-1")
        ));
    }

    #[test]
    fn test_tier_must_match() {
        let (registry, resolver) = setup();
        let zun = UnitId::new("zun");
        registry.create_unit(zun.clone(), Tier::Mid, "Zun").unwrap();
        let result = resolver.signers_for(&zun, Tier::High);
        assert!(matches!(result, Err(HierarchyError::TierMismatch { .. })));
    }
}
