//! A store that refuses writes on demand: every rejected call must leave
//! memory where it was, and succeed on retry once the store is back

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tumen_runtime::{
    Hierarchy, HierarchyConfig, HierarchySnapshot, HierarchyStore, MemoryStore, SignOutcome,
    Simulation, StoreError, StoreResult,
};
use tumen_types::{
    ChildRef, DocumentAction, DocumentId, DocumentScope, HierarchyError, MemberId, MemberTrust,
    MembershipEdge, NotaryGrade, NotaryGrant, NotaryScope, QuorumDocument, SuperVerification,
    ThresholdPolicy, Tier, TrustState, Unit, UnitId, VerificationRecord,
};

/// Delegates to a [`MemoryStore`] until switched off
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".into()));
        }
        Ok(())
    }
}

impl HierarchyStore for FlakyStore {
    fn put_unit(&self, unit: &Unit) -> StoreResult<()> {
        self.check()?;
        self.inner.put_unit(unit)
    }

    fn put_edge(&self, edge: &MembershipEdge) -> StoreResult<()> {
        self.check()?;
        self.inner.put_edge(edge)
    }

    fn remove_edge(&self, child: &ChildRef) -> StoreResult<()> {
        self.check()?;
        self.inner.remove_edge(child)
    }

    fn put_document(&self, document: &QuorumDocument) -> StoreResult<()> {
        self.check()?;
        self.inner.put_document(document)
    }

    fn put_grant(&self, grant: &NotaryGrant) -> StoreResult<()> {
        self.check()?;
        self.inner.put_grant(grant)
    }

    fn remove_grant(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        scope: &NotaryScope,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner.remove_grant(issuer, grade, scope)
    }

    fn put_member_trust(&self, trust: &MemberTrust) -> StoreResult<()> {
        self.check()?;
        self.inner.put_member_trust(trust)
    }

    fn append_verification(&self, record: &VerificationRecord) -> StoreResult<()> {
        self.check()?;
        self.inner.append_verification(record)
    }

    fn append_super_verification(&self, record: &SuperVerification) -> StoreResult<()> {
        self.check()?;
        self.inner.append_super_verification(record)
    }

    fn mark_effect_applied(&self, document: &DocumentId) -> StoreResult<()> {
        self.check()?;
        self.inner.mark_effect_applied(document)
    }

    fn put_authorities(&self, authorities: &[MemberId]) -> StoreResult<()> {
        self.check()?;
        self.inner.put_authorities(authorities)
    }

    fn load_snapshot(&self) -> StoreResult<HierarchySnapshot> {
        self.inner.load_snapshot()
    }
}

fn setup() -> (Arc<FlakyStore>, Hierarchy) {
    let store = Arc::new(FlakyStore::default());
    let hierarchy = Hierarchy::with_store(HierarchyConfig::default(), store.clone()).unwrap();
    (store, hierarchy)
}

fn notary() -> MemberId {
    MemberId::new("notary")
}

#[test]
fn test_failed_join_leaves_no_trace() {
    let (store, hierarchy) = setup();
    let base = UnitId::new("arban");
    hierarchy.create_unit(base.clone(), Tier::Base, "Arban").unwrap();
    for i in 0..9 {
        hierarchy
            .register_member(&base, MemberId::new(format!("m-{}", i)))
            .unwrap();
    }

    store.set_down(true);
    let last = MemberId::new("m-9");
    let result = hierarchy.register_member(&base, last.clone());
    assert!(matches!(result, Err(HierarchyError::Storage(_))));
    assert_eq!(hierarchy.get_children(&base).unwrap().len(), 9);
    assert!(!hierarchy.is_complete(&base).unwrap());
    assert!(!hierarchy.get_unit(&base).unwrap().sealed);
    assert_eq!(hierarchy.unit_of_member(&last).unwrap(), None);

    store.set_down(false);
    hierarchy.register_member(&base, last.clone()).unwrap();
    assert!(hierarchy.is_complete(&base).unwrap());
    assert_eq!(hierarchy.unit_of_member(&last).unwrap(), Some(base));
    assert_eq!(hierarchy.get_trust(&last).unwrap().state, TrustState::Draft);
}

#[test]
fn test_failed_placement_keeps_enrollment() {
    let (store, hierarchy) = setup();
    let base = UnitId::new("arban");
    hierarchy.create_unit(base.clone(), Tier::Base, "Arban").unwrap();
    let member = MemberId::new("m-0");
    hierarchy.enroll(member.clone()).unwrap();

    store.set_down(true);
    assert!(hierarchy.register_member(&base, member.clone()).is_err());
    assert_eq!(hierarchy.unit_of_member(&member).unwrap(), None);

    store.set_down(false);
    hierarchy.register_member(&base, member.clone()).unwrap();
    assert_eq!(hierarchy.unit_of_member(&member).unwrap(), Some(base));
}

#[test]
fn test_failed_attach_leaves_no_trace() {
    let (store, hierarchy) = setup();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    let zun = UnitId::new("zun");
    hierarchy.create_unit(zun.clone(), Tier::Mid, "Zun").unwrap();
    let base = sim.found_base_unit("zun.0").unwrap().unit.id;

    store.set_down(true);
    assert!(matches!(
        hierarchy.register_child(&zun, &base),
        Err(HierarchyError::Storage(_))
    ));
    assert!(hierarchy.get_children(&zun).unwrap().is_empty());
    assert_eq!(hierarchy.get_ancestor(&base, Tier::Mid).unwrap(), None);

    store.set_down(false);
    hierarchy.register_child(&zun, &base).unwrap();
    assert_eq!(hierarchy.get_ancestor(&base, Tier::Mid).unwrap(), Some(zun));
}

#[test]
fn test_failed_signature_can_be_retried() {
    let (store, hierarchy) = setup();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    let base = sim.found_base_unit("arban").unwrap().unit.id;
    let doc = hierarchy
        .issue_document(
            DocumentScope::new(base, Tier::Base),
            DocumentAction::AdoptResolution {
                title: "Herd count".into(),
                content_hash: "5e1d".into(),
            },
            ThresholdPolicy::Count(3),
            notary(),
        )
        .unwrap();
    let signers = doc.eligible.signers.clone();
    hierarchy.sign(&doc.id, &signers[0]).unwrap();

    store.set_down(true);
    assert!(matches!(
        hierarchy.sign(&doc.id, &signers[1]),
        Err(HierarchyError::Storage(_))
    ));
    assert_eq!(hierarchy.get_document(&doc.id).unwrap().signature_count(), 1);

    store.set_down(false);
    let outcome = hierarchy.sign(&doc.id, &signers[1]).unwrap();
    assert_eq!(
        outcome,
        SignOutcome::Accepted {
            signatures: 2,
            threshold: 3
        }
    );
    let persisted = hierarchy.snapshot().unwrap();
    assert_eq!(persisted.document(&doc.id).unwrap().signature_count(), 2);
}

#[test]
fn test_failed_promotion_can_be_retried() {
    let (store, hierarchy) = setup();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    sim.build_unit(Tier::Mid, "zun").unwrap();

    let target = Simulation::member_id("zun.0", 1);
    let peers: Vec<MemberId> = (1..=3)
        .map(|i| Simulation::member_id(&format!("zun.{}", i), 0))
        .collect();
    for peer in &peers {
        hierarchy
            .submit_super_verification(&MemberId::new("FOUNDER-001"), peer, "seed")
            .unwrap();
    }
    hierarchy.request_verification(&target).unwrap();
    hierarchy.submit_peer_verification(&peers[0], &target).unwrap();
    hierarchy.submit_peer_verification(&peers[1], &target).unwrap();

    store.set_down(true);
    assert!(matches!(
        hierarchy.submit_peer_verification(&peers[2], &target),
        Err(HierarchyError::Storage(_))
    ));
    let progress = hierarchy.get_verification_status(&target).unwrap();
    assert_eq!((progress.count, progress.verified), (2, false));

    store.set_down(false);
    let progress = hierarchy.submit_peer_verification(&peers[2], &target).unwrap();
    assert!(progress.verified);
    assert_eq!(progress.count, 3);

    let persisted = hierarchy.snapshot().unwrap();
    let trust = persisted
        .members
        .iter()
        .find(|t| t.member == target)
        .unwrap();
    assert_eq!(trust.state, TrustState::Verified);
    let recorded = persisted
        .verifications
        .iter()
        .filter(|r| r.target == target)
        .count();
    assert_eq!(recorded, 3);
}

#[test]
fn test_failed_rotation_keeps_authorities() {
    let (store, hierarchy) = setup();
    let before = hierarchy.authorities().unwrap();

    store.set_down(true);
    assert!(hierarchy
        .rotate_authorities(vec![MemberId::new("COUNCIL-1")])
        .is_err());
    assert_eq!(hierarchy.authorities().unwrap(), before);
    assert!(hierarchy.get_trust(&MemberId::new("COUNCIL-1")).is_err());

    store.set_down(false);
    assert!(hierarchy.snapshot().unwrap().authorities.is_none());
}
