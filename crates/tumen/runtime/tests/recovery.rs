//! Restart from persisted state, including a crash between finalization
//! and effect application

use chrono::{Duration, Utc};
use std::sync::Arc;
use tumen_runtime::{
    Hierarchy, HierarchyConfig, HierarchySnapshot, IssueRequest, MemoryStore, Simulation,
};
use tumen_types::{
    DocumentAction, DocumentId, DocumentScope, DocumentStatus, HierarchyError, HierarchyEvent,
    MemberId, ThresholdPolicy, Tier, UnitId,
};

fn notary() -> MemberId {
    MemberId::new("notary")
}

/// A founded Base unit plus a finalized document of `action` on it
fn finalized(action: DocumentAction) -> (Hierarchy, UnitId, DocumentId) {
    let hierarchy = Hierarchy::new(HierarchyConfig::default()).unwrap();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    let base = sim.found_base_unit("arban").unwrap().unit.id;
    let doc = sim.ratify(&base, Tier::Base, action).unwrap();
    assert_eq!(doc.status, DocumentStatus::Finalized);
    assert!(doc.effect_applied);
    (hierarchy, base, doc.id)
}

fn reopen(snapshot: HierarchySnapshot) -> Hierarchy {
    Hierarchy::restore(
        HierarchyConfig::default(),
        Arc::new(MemoryStore::from_snapshot(snapshot)),
    )
    .unwrap()
}

#[test]
fn test_restore_round_trips_state() {
    let (hierarchy, base, _) = finalized(DocumentAction::AdoptResolution {
        title: "Charter".into(),
        content_hash: "ab12".into(),
    });
    let before = hierarchy.snapshot().unwrap();

    let restored = reopen(before.clone());
    let after = restored.snapshot().unwrap();
    assert_eq!(before.content_hash().unwrap(), after.content_hash().unwrap());
    assert!(restored.is_complete(&base).unwrap());
    assert_eq!(
        restored.leader_of(&base).unwrap(),
        Some(Simulation::member_id("arban", 0))
    );
    assert!(restored.retry_pending_effects().unwrap().is_empty());
}

#[test]
fn test_effect_completed_after_crash_before_apply() {
    let candidate = Simulation::member_id("arban", 6);
    let (hierarchy, base, doc) = finalized(DocumentAction::AppointLeader {
        member: candidate.clone(),
    });

    // state as it was right after the finalized document was persisted
    let mut snapshot = hierarchy.snapshot().unwrap();
    snapshot.document_mut(&doc).unwrap().effect_applied = false;
    snapshot.applied_effects.retain(|id| *id != doc);
    snapshot.unit_mut(&base).unwrap().leader = Some(Simulation::member_id("arban", 0));

    let restored = reopen(snapshot);
    assert_eq!(restored.leader_of(&base).unwrap(), Some(candidate.clone()));
    assert!(restored.get_document(&doc).unwrap().effect_applied);
    let changes = restored
        .event_log()
        .count_matching(|e| matches!(e, HierarchyEvent::LeadershipChanged { .. }))
        .unwrap();
    assert_eq!(changes, 1);

    // a second restart finds nothing left to do
    let again = reopen(restored.snapshot().unwrap());
    assert!(again.event_log().is_empty());
    assert_eq!(again.leader_of(&base).unwrap(), Some(candidate));
}

#[test]
fn test_effect_not_repeated_after_crash_during_apply() {
    let (hierarchy, base, doc) = finalized(DocumentAction::AdoptResolution {
        title: "Water rights".into(),
        content_hash: "77aa".into(),
    });

    // the registry recorded the effect but the document flag never landed
    let mut snapshot = hierarchy.snapshot().unwrap();
    snapshot.document_mut(&doc).unwrap().effect_applied = false;
    assert!(snapshot.applied_effects.contains(&doc));

    let restored = reopen(snapshot);
    assert!(restored.get_document(&doc).unwrap().effect_applied);
    assert_eq!(restored.get_unit(&base).unwrap().resolutions.len(), 1);
    let adopted = restored
        .event_log()
        .count_matching(|e| matches!(e, HierarchyEvent::ResolutionAdopted { .. }))
        .unwrap();
    assert_eq!(adopted, 0);
}

#[test]
fn test_open_document_survives_restart() {
    let hierarchy = Hierarchy::new(HierarchyConfig::default()).unwrap();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    let base = sim.found_base_unit("arban").unwrap().unit.id;

    let doc = hierarchy
        .issue_document(
            DocumentScope::new(base.clone(), Tier::Base),
            DocumentAction::AppointLeader {
                member: Simulation::member_id("arban", 3),
            },
            ThresholdPolicy::Majority,
            notary(),
        )
        .unwrap();
    for signer in &doc.eligible.signers[..3] {
        hierarchy.sign(&doc.id, signer).unwrap();
    }

    let restored = reopen(hierarchy.snapshot().unwrap());
    let reloaded = restored.get_document(&doc.id).unwrap();
    assert!(reloaded.is_open());
    assert_eq!(reloaded.signature_count(), 3);
    assert_eq!(reloaded.eligible, doc.eligible);

    for signer in &doc.eligible.signers[3..6] {
        restored.sign(&doc.id, signer).unwrap();
    }
    assert_eq!(
        restored.leader_of(&base).unwrap(),
        Some(Simulation::member_id("arban", 3))
    );
}

#[test]
fn test_grants_and_trust_survive_restart() {
    let hierarchy = Hierarchy::new(HierarchyConfig::default()).unwrap();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    let base = sim.found_base_unit("arban").unwrap().unit.id;
    let member = Simulation::member_id("arban", 2);
    hierarchy
        .submit_super_verification(&MemberId::new("FOUNDER-001"), &member, "known in person")
        .unwrap();

    let restored = reopen(hierarchy.snapshot().unwrap());
    assert!(restored
        .is_authorized(&notary(), tumen_types::NotaryGrade::Top, &base)
        .unwrap());
    let progress = restored.get_verification_status(&member).unwrap();
    assert!(progress.verified);
    assert_eq!(progress.super_verified_by, Some(MemberId::new("FOUNDER-001")));
}

#[test]
fn test_rotated_authorities_survive_restart() {
    let hierarchy = Hierarchy::new(HierarchyConfig::default()).unwrap();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    sim.found_base_unit("arban").unwrap();
    let council = MemberId::new("COUNCIL-1");
    hierarchy.rotate_authorities(vec![council.clone()]).unwrap();

    let restored = reopen(hierarchy.snapshot().unwrap());
    assert_eq!(restored.authorities().unwrap(), vec![council.clone()]);
    assert!(matches!(
        restored.submit_super_verification(
            &MemberId::new("FOUNDER-001"),
            &Simulation::member_id("arban", 1),
            "old mandate"
        ),
        Err(HierarchyError::InvalidAuthority(_))
    ));
    let progress = restored
        .submit_super_verification(&council, &Simulation::member_id("arban", 2), "new mandate")
        .unwrap();
    assert!(progress.verified);
}

#[test]
fn test_overdue_document_waits_for_explicit_expiry() {
    let hierarchy = Hierarchy::new(HierarchyConfig::default()).unwrap();
    let sim = Simulation::new(&hierarchy, notary()).unwrap();
    let base = sim.found_base_unit("arban").unwrap().unit.id;
    let doc = hierarchy
        .issue(
            IssueRequest::new(
                DocumentScope::new(base, Tier::Base),
                DocumentAction::AdoptResolution {
                    title: "Grazing".into(),
                    content_hash: "9f".into(),
                },
                notary(),
            )
            .with_ttl(Duration::hours(1)),
        )
        .unwrap();

    let mut snapshot = hierarchy.snapshot().unwrap();
    snapshot.document_mut(&doc.id).unwrap().deadline = Some(Utc::now() - Duration::minutes(5));
    let restored = reopen(snapshot);

    assert!(matches!(
        restored.sign(&doc.id, &MemberId::new("stranger")),
        Err(HierarchyError::NotEligible { .. })
    ));
    assert!(matches!(
        restored.sign(&doc.id, &doc.eligible.signers[0]),
        Err(HierarchyError::DocumentExpired(_))
    ));
    assert_eq!(restored.get_document(&doc.id).unwrap().status, DocumentStatus::Open);

    assert_eq!(restored.expire_stale(Utc::now()).unwrap(), vec![doc.id.clone()]);
    assert_eq!(restored.get_document(&doc.id).unwrap().status, DocumentStatus::Expired);
}
