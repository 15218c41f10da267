//! Verification Chain Engine
//!
//! Trust promotion by peer quorum or by authority override. Both paths run
//! under one lock, so whichever attestation first moves a member to
//! Verified is the one recorded; anything after it is kept but inert.
//!
//! Changes are staged on copies and written to the store before the
//! in-memory state takes them, so a failed write leaves nothing behind.

use crate::config::VerificationConfig;
use crate::journal::EventJournal;
use crate::store::{HierarchySnapshot, HierarchyStore};
use crate::unit_registry::UnitLineage;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use tumen_types::{
    HierarchyError, HierarchyEvent, HierarchyResult, MemberId, MemberTrust, SuperVerification,
    Tier, TrustState, VerificationPath, VerificationProgress, VerificationRecord,
};

/// The fixed founder-mandate identities allowed to super-verify
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthoritySet {
    members: BTreeSet<MemberId>,
}

impl AuthoritySet {
    pub fn new(members: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.members.contains(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberId> {
        self.members.iter()
    }
}

#[derive(Default)]
struct VerificationState {
    members: HashMap<MemberId, MemberTrust>,
    records: HashMap<MemberId, Vec<VerificationRecord>>,
    overrides: HashMap<MemberId, SuperVerification>,
    given: HashMap<MemberId, u32>,
    authorities: AuthoritySet,
}

impl VerificationState {
    fn trust(&self, member: &MemberId) -> HierarchyResult<&MemberTrust> {
        self.members
            .get(member)
            .ok_or_else(|| HierarchyError::MemberNotFound(member.clone()))
    }

    fn counted(&self, target: &MemberId) -> u32 {
        self.records
            .get(target)
            .map(|r| r.iter().filter(|r| !r.inert).count() as u32)
            .unwrap_or(0)
    }

    /// Trust records for authorities in `set` not yet enrolled
    fn unseeded(&self, set: &AuthoritySet) -> Vec<MemberTrust> {
        set.iter()
            .filter(|authority| !self.members.contains_key(*authority))
            .map(|authority| {
                MemberTrust::verified(
                    authority.clone(),
                    VerificationPath::Authority(authority.clone()),
                )
            })
            .collect()
    }

    /// A verified copy of the target's trust, or `None` if it already is
    fn promoted(&self, target: &MemberId, via: VerificationPath) -> HierarchyResult<Option<MemberTrust>> {
        let mut trust = self.trust(target)?.clone();
        if trust.mark_verified(via) {
            Ok(Some(trust))
        } else {
            Ok(None)
        }
    }
}

pub struct VerificationEngine {
    state: RwLock<VerificationState>,
    lineage: Arc<dyn UnitLineage>,
    store: Arc<dyn HierarchyStore>,
    journal: Arc<EventJournal>,
    config: VerificationConfig,
}

impl VerificationEngine {
    /// Build with the configured authority set. Authorities are enrolled
    /// as already verified.
    pub fn new(
        config: VerificationConfig,
        lineage: Arc<dyn UnitLineage>,
        store: Arc<dyn HierarchyStore>,
        journal: Arc<EventJournal>,
    ) -> HierarchyResult<Self> {
        let authorities = AuthoritySet::new(config.authorities.iter().cloned());
        Self::build(VerificationState::default(), authorities, config, lineage, store, journal)
    }

    /// Rebuild from persisted state. A rotated authority set recorded in
    /// the snapshot takes precedence over the configured one.

    pub fn restore(
        snapshot: &HierarchySnapshot,
        config: VerificationConfig,
        lineage: Arc<dyn UnitLineage>,
        store: Arc<dyn HierarchyStore>,
        journal: Arc<EventJournal>,
    ) -> HierarchyResult<Self> {
        let mut state = VerificationState::default();
        for trust in &snapshot.members {
            state.members.insert(trust.member.clone(), trust.clone());
        }
        for record in &snapshot.verifications {
            state
                .records
                .entry(record.target.clone())
                .or_default()
                .push(record.clone());
            *state.given.entry(record.verifier.clone()).or_default() += 1;
        }
        for record in &snapshot.super_verifications {
            state
                .overrides
                .insert(record.target.clone(), record.clone());
        }
        let authorities = match &snapshot.authorities {
            Some(rotated) => {
                debug!(authorities = rotated.len(), "Using rotated authority set");
                AuthoritySet::new(rotated.iter().cloned())
            }
            None => AuthoritySet::new(config.authorities.iter().cloned()),
        };
        Self::build(state, authorities, config, lineage, store, journal)
    }

    fn build(
        mut state: VerificationState,
        authorities: AuthoritySet,
        config: VerificationConfig,
        lineage: Arc<dyn UnitLineage>,
        store: Arc<dyn HierarchyStore>,
        journal: Arc<EventJournal>,
    ) -> HierarchyResult<Self> {
        for trust in state.unseeded(&authorities) {
            store.put_member_trust(&trust)?;
            state.members.insert(trust.member.clone(), trust);
        }
        state.authorities = authorities;
        Ok(Self {
            state: RwLock::new(state),
            lineage,
            store,
            journal,
            config,
        })
    }

    fn read(&self) -> HierarchyResult<RwLockReadGuard<'_, VerificationState>> {
        self.state.read().map_err(|_| HierarchyError::LockPoisoned)
    }

    fn write(&self) -> HierarchyResult<RwLockWriteGuard<'_, VerificationState>> {
        self.state.write().map_err(|_| HierarchyError::LockPoisoned)
    }

    /// Start tracking a member in Draft
    pub fn enroll(&self, member: MemberId) -> HierarchyResult<MemberTrust> {
        let mut state = self.write()?;
        if state.members.contains_key(&member) {
            return Err(HierarchyError::MemberAlreadyEnrolled(member));
        }
        let trust = MemberTrust::new(member.clone());
        self.store.put_member_trust(&trust)?;
        state.members.insert(member.clone(), trust.clone());
        debug!(member = %member, "Member enrolled");
        Ok(trust)
    }

    pub fn is_enrolled(&self, member: &MemberId) -> HierarchyResult<bool> {
        Ok(self.read()?.members.contains_key(member))
    }

    /// Draft -> Pending
    pub fn request_verification(&self, member: &MemberId) -> HierarchyResult<MemberTrust> {
        let mut state = self.write()?;
        let current = state.trust(member)?.state;
        if current != TrustState::Draft {
            return Err(HierarchyError::InvalidTransition(format!(
                "{} is {}, only draft members may request verification",
                member, current
            )));
        }
        let mut trust = state.trust(member)?.clone();
        trust.state = TrustState::Pending;
        self.store.put_member_trust(&trust)?;
        state.members.insert(member.clone(), trust.clone());
        debug!(member = %member, "Verification requested");
        Ok(trust)
    }

    /// Record a peer attestation. The target becomes Verified once counted
    /// attestations reach the peer threshold.
    pub fn submit_peer_verification(
        &self,
        verifier: &MemberId,
        target: &MemberId,
    ) -> HierarchyResult<VerificationProgress> {
        let mut state = self.write()?;
        let target_state = state.trust(target)?.state;
        let verifier_trust = state.trust(verifier)?;

        if verifier == target {
            return Err(HierarchyError::SelfVerification(verifier.clone()));
        }
        if !verifier_trust.is_verified() {
            warn!(verifier = %verifier, target = %target, "Attestation rejected: verifier not trusted");
            return Err(HierarchyError::VerifierNotTrusted(verifier.clone()));
        }
        if target_state == TrustState::Draft {
            return Err(HierarchyError::InvalidTransition(format!(
                "{} has not requested verification",
                target
            )));
        }

        let verifier_local = self.lineage.member_ancestor(verifier, Tier::Mid)?;
        let target_local = self.lineage.member_ancestor(target, Tier::Mid)?;
        if verifier_local.is_none() || verifier_local != target_local {
            warn!(verifier = %verifier, target = %target, "Attestation rejected: out of scope");
            return Err(HierarchyError::OutOfScope {
                verifier: verifier.clone(),
                target: target.clone(),
            });
        }

        let already = state
            .records
            .get(target)
            .map(|records| records.iter().any(|r| r.verifier == *verifier))
            .unwrap_or(false);
        if already {
            return Err(HierarchyError::DuplicateVerifier {
                verifier: verifier.clone(),
                target: target.clone(),
            });
        }

        if let Some(limit) = self.config.max_verifications_per_verifier {
            if state.given.get(verifier).copied().unwrap_or(0) >= limit {
                return Err(HierarchyError::QuotaExhausted {
                    verifier: verifier.clone(),
                    limit,
                });
            }
        }

        let mut record = VerificationRecord::new(verifier.clone(), target.clone());
        record.inert = target_state == TrustState::Verified;
        let count = state.counted(target) + u32::from(!record.inert);
        let promoted = if !record.inert && count >= self.config.peer_threshold {
            state.promoted(target, VerificationPath::PeerQuorum)?
        } else {
            None
        };

        // the trust upsert can be repeated safely, the append cannot
        if let Some(trust) = &promoted {
            self.store.put_member_trust(trust)?;
        }
        self.store.append_verification(&record)?;
        state
            .records
            .entry(target.clone())
            .or_default()
            .push(record.clone());
        *state.given.entry(verifier.clone()).or_default() += 1;

        match promoted {
            Some(trust) => self.commit_promotion(&mut state, trust)?,
            None if record.inert => {
                debug!(verifier = %verifier, target = %target, "Attestation recorded after verification")
            }
            None => debug!(
                verifier = %verifier,
                target = %target,
                count,
                threshold = self.config.peer_threshold,
                "Attestation recorded"
            ),
        }
        self.progress_locked(&state, target)
    }

    /// Authority override: the target is verified immediately, regardless
    /// of peer progress
    pub fn submit_super_verification(
        &self,
        authority: &MemberId,
        target: &MemberId,
        justification: impl Into<String>,
    ) -> HierarchyResult<VerificationProgress> {
        let mut state = self.write()?;
        if !state.authorities.contains(authority) {
            warn!(authority = %authority, target = %target, "Override rejected: not an authority");
            return Err(HierarchyError::InvalidAuthority(authority.clone()));
        }
        if authority == target {
            return Err(HierarchyError::SelfVerification(target.clone()));
        }
        if state.trust(target)?.is_verified() {
            debug!(authority = %authority, target = %target, "Override on verified member ignored");
            return self.progress_locked(&state, target);
        }

        let record = SuperVerification::new(authority.clone(), target.clone(), justification);
        let promoted = state.promoted(target, VerificationPath::Authority(authority.clone()))?;
        if let Some(trust) = &promoted {
            self.store.put_member_trust(trust)?;
        }
        self.store.append_super_verification(&record)?;
        state.overrides.insert(target.clone(), record);
        if let Some(trust) = promoted {
            self.commit_promotion(&mut state, trust)?;
        }
        self.progress_locked(&state, target)
    }

    /// Install an already persisted verified trust record
    fn commit_promotion(&self, state: &mut VerificationState, trust: MemberTrust) -> HierarchyResult<()> {
        let member = trust.member.clone();
        let via = trust.verified_via.clone();
        state.members.insert(member.clone(), trust);
        if let Some(via) = via {
            info!(member = %member, via = ?via, "Member verified");
            self.journal
                .record(HierarchyEvent::MemberVerified { member, via })?;
        }
        Ok(())
    }

    fn progress_locked(
        &self,
        state: &VerificationState,
        target: &MemberId,
    ) -> HierarchyResult<VerificationProgress> {
        let trust = state.trust(target)?;
        Ok(VerificationProgress {
            count: state.counted(target),
            threshold: self.config.peer_threshold,
            verified: trust.is_verified(),
            state: trust.state,
            super_verified_by: state.overrides.get(target).map(|r| r.authority.clone()),
        })
    }

    /// (count, threshold, verified) for a member
    pub fn get_progress(&self, target: &MemberId) -> HierarchyResult<VerificationProgress> {
        let state = self.read()?;
        self.progress_locked(&state, target)
    }

    pub fn get_trust(&self, member: &MemberId) -> HierarchyResult<MemberTrust> {
        Ok(self.read()?.trust(member)?.clone())
    }

    pub fn records_for(&self, target: &MemberId) -> HierarchyResult<Vec<VerificationRecord>> {
        Ok(self
            .read()?
            .records
            .get(target)
            .cloned()
            .unwrap_or_default())
    }

    /// Walk from `member` to whoever vouched for it, following the first
    /// counted peer attestation at each step, until an authority or an
    /// unverified member is reached
    pub fn verification_chain(&self, member: &MemberId) -> HierarchyResult<Vec<MemberId>> {
        let state = self.read()?;
        state.trust(member)?;
        let mut chain = vec![member.clone()];
        let mut visited = HashSet::new();
        let mut current = member.clone();
        while visited.insert(current.clone()) {
            let next = match state.members.get(&current).and_then(|t| t.verified_via.clone()) {
                Some(VerificationPath::Authority(authority)) if authority != current => authority,
                Some(VerificationPath::PeerQuorum) => {
                    match state
                        .records
                        .get(&current)
                        .and_then(|records| records.iter().find(|r| !r.inert))
                    {
                        Some(record) => record.verifier.clone(),
                        None => break,
                    }
                }
                _ => break,
            };
            chain.push(next.clone());
            current = next;
        }
        Ok(chain)
    }

    /// Hops from an authority. `None` when the chain does not end at one.
    pub fn chain_level(&self, member: &MemberId) -> HierarchyResult<Option<u32>> {
        let chain = self.verification_chain(member)?;
        let state = self.read()?;
        let rooted = chain
            .last()
            .map(|root| state.authorities.contains(root))
            .unwrap_or(false);
        Ok(rooted.then(|| chain.len() as u32 - 1))
    }

    /// Replace the authority set. New authorities are enrolled as verified,
    /// and the set is persisted so it outlives a restart.
    pub fn rotate_authorities(
        &self,
        authorities: impl IntoIterator<Item = MemberId>,
    ) -> HierarchyResult<()> {
        let set = AuthoritySet::new(authorities);
        if set.is_empty() {
            return Err(HierarchyError::InvalidTransition(
                "authority set cannot be empty".into(),
            ));
        }
        let mut state = self.write()?;
        let members: Vec<MemberId> = set.iter().cloned().collect();
        self.store.put_authorities(&members)?;
        // missing authorities are seeded again on restore
        let seeded = state.unseeded(&set);
        for trust in &seeded {
            self.store.put_member_trust(trust)?;
        }

        for trust in seeded {
            state.members.insert(trust.member.clone(), trust);
        }
        state.authorities = set;
        info!(authorities = state.authorities.len(), "Authority set rotated");
        Ok(())
    }

    pub fn authorities(&self) -> HierarchyResult<Vec<MemberId>> {
        Ok(self.read()?.authorities.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::unit_registry::UnitRegistry;
    use tumen_types::UnitId;

    struct Fixture {
        registry: Arc<UnitRegistry>,
        store: Arc<MemoryStore>,
        engine: VerificationEngine,
    }

    /// Two Zuns; `zun-a` holds arban-a1 (a1-*) and arban-a2 (a2-*),
    /// `zun-b` holds arban-b1 (b1-*)
    fn setup_with(config: VerificationConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let journal = Arc::new(EventJournal::new());
        let registry = Arc::new(UnitRegistry::new(store.clone(), journal.clone()));
        for (zun, bases) in [("zun-a", vec!["a1", "a2"]), ("zun-b", vec!["b1"])] {
            let zun_id = UnitId::new(zun);
            registry.create_unit(zun_id.clone(), Tier::Mid, zun).unwrap();
            for base in bases {
                let base_id = UnitId::new(format!("arban-{}", base));
                registry.create_unit(base_id.clone(), Tier::Base, base).unwrap();
                for i in 0..5 {
                    registry
                        .register_member(&base_id, MemberId::new(format!("{}-{}", base, i)))
                        .unwrap();
                }
                registry.register_child(&zun_id, &base_id).unwrap();
            }
        }
        let engine =
            VerificationEngine::new(config, registry.clone(), store.clone(), journal).unwrap();
        Fixture {
            registry,
            store,
            engine,
        }
    }

    fn setup() -> Fixture {
        setup_with(VerificationConfig::default())
    }

    fn verified(fixture: &Fixture, member: &str) -> MemberId {
        let id = MemberId::new(member);
        fixture.engine.enroll(id.clone()).unwrap();
        fixture
            .engine
            .submit_super_verification(&MemberId::new("FOUNDER-001"), &id, "seed")
            .unwrap();
        id
    }

    fn pending(fixture: &Fixture, member: &str) -> MemberId {
        let id = MemberId::new(member);
        fixture.engine.enroll(id.clone()).unwrap();
        fixture.engine.request_verification(&id).unwrap();
        id
    }

    #[test]
    fn test_authorities_start_verified() {
        let fixture = setup();
        let trust = fixture.engine.get_trust(&MemberId::new("MANDATE-005")).unwrap();
        assert!(trust.is_verified());
        assert_eq!(fixture.engine.authorities().unwrap().len(), 10);
    }

    #[test]
    fn test_peer_quorum_promotes() {
        let fixture = setup();
        let target = pending(&fixture, "a1-0");
        let b = verified(&fixture, "a1-1");
        let c = verified(&fixture, "a2-0");
        let d = verified(&fixture, "a2-1");

        fixture.engine.submit_peer_verification(&b, &target).unwrap();
        let progress = fixture.engine.submit_peer_verification(&c, &target).unwrap();
        assert_eq!((progress.count, progress.threshold, progress.verified), (2, 3, false));

        let progress = fixture.engine.submit_peer_verification(&d, &target).unwrap();
        assert!(progress.verified);
        assert_eq!(progress.state, TrustState::Verified);
        assert_eq!(
            fixture.engine.get_trust(&target).unwrap().verified_via,
            Some(VerificationPath::PeerQuorum)
        );
    }

    #[test]
    fn test_peer_rejections_leave_count_unchanged() {
        let fixture = setup();
        let target = pending(&fixture, "a1-0");
        let untrusted = pending(&fixture, "a1-1");
        let outsider = verified(&fixture, "b1-0");
        let peer = verified(&fixture, "a1-2");

        assert!(matches!(
            fixture.engine.submit_peer_verification(&untrusted, &target),
            Err(HierarchyError::VerifierNotTrusted(_))
        ));
        assert!(matches!(
            fixture.engine.submit_peer_verification(&outsider, &target),
            Err(HierarchyError::OutOfScope { .. })
        ));
        assert!(matches!(
            fixture.engine.submit_peer_verification(&peer, &peer),
            Err(HierarchyError::SelfVerification(_))
        ));
        fixture.engine.submit_peer_verification(&peer, &target).unwrap();
        assert!(matches!(
            fixture.engine.submit_peer_verification(&peer, &target),
            Err(HierarchyError::DuplicateVerifier { .. })
        ));
        assert_eq!(fixture.engine.get_progress(&target).unwrap().count, 1);
    }

    #[test]
    fn test_draft_target_must_request_first() {
        let fixture = setup();
        let target = MemberId::new("a1-0");
        fixture.engine.enroll(target.clone()).unwrap();
        let peer = verified(&fixture, "a1-1");
        assert!(matches!(
            fixture.engine.submit_peer_verification(&peer, &target),
            Err(HierarchyError::InvalidTransition(_))
        ));
        assert!(matches!(
            fixture.engine.enroll(target),
            Err(HierarchyError::MemberAlreadyEnrolled(_))
        ));
    }

    #[test]
    fn test_unplaced_members_are_out_of_scope() {
        let fixture = setup();
        let loose = MemberId::new("loose");
        fixture.engine.enroll(loose.clone()).unwrap();
        fixture.engine.request_verification(&loose).unwrap();
        let stray = verified(&fixture, "stray");
        assert!(matches!(
            fixture.engine.submit_peer_verification(&stray, &loose),
            Err(HierarchyError::OutOfScope { .. })
        ));
        assert!(fixture.registry.unit_of_member(&loose).unwrap().is_none());
    }

    #[test]
    fn test_super_verification() {
        let fixture = setup();
        let target = MemberId::new("a1-0");
        fixture.engine.enroll(target.clone()).unwrap();

        assert!(matches!(
            fixture
                .engine
                .submit_super_verification(&MemberId::new("nobody"), &target, "trust me"),
            Err(HierarchyError::InvalidAuthority(_))
        ));
        let progress = fixture
            .engine
            .submit_super_verification(&MemberId::new("MANDATE-002"), &target, "known in person")
            .unwrap();
        assert!(progress.verified);
        assert_eq!(progress.count, 0);
        assert_eq!(progress.super_verified_by, Some(MemberId::new("MANDATE-002")));
    }

    #[test]
    fn test_attestations_after_verification_are_inert() {
        let fixture = setup();
        let target = pending(&fixture, "a1-0");
        let peer = verified(&fixture, "a1-1");
        fixture
            .engine
            .submit_super_verification(&MemberId::new("FOUNDER-001"), &target, "override")
            .unwrap();

        let progress = fixture.engine.submit_peer_verification(&peer, &target).unwrap();
        assert_eq!(progress.count, 0);
        assert_eq!(fixture.engine.records_for(&target).unwrap().len(), 1);

        let again = fixture
            .engine
            .submit_super_verification(&MemberId::new("MANDATE-003"), &target, "late")
            .unwrap();
        assert_eq!(again.super_verified_by, Some(MemberId::new("FOUNDER-001")));
    }

    #[test]
    fn test_quota() {
        let fixture = setup_with(VerificationConfig {
            max_verifications_per_verifier: Some(1),
            ..VerificationConfig::default()
        });
        let peer = verified(&fixture, "a1-1");
        let first = pending(&fixture, "a1-2");
        let second = pending(&fixture, "a1-3");
        fixture.engine.submit_peer_verification(&peer, &first).unwrap();
        assert!(matches!(
            fixture.engine.submit_peer_verification(&peer, &second),
            Err(HierarchyError::QuotaExhausted { limit: 1, .. })
        ));
    }

    #[test]
    fn test_chain_level() {
        let fixture = setup();
        let root = MemberId::new("FOUNDER-001");
        let b = verified(&fixture, "a1-1");
        let c = verified(&fixture, "a1-2");
        let d = verified(&fixture, "a1-3");
        let target = pending(&fixture, "a1-0");
        for verifier in [&b, &c, &d] {
            fixture.engine.submit_peer_verification(verifier, &target).unwrap();
        }

        assert_eq!(
            fixture.engine.verification_chain(&target).unwrap(),
            vec![target.clone(), b.clone(), root.clone()]
        );
        assert_eq!(fixture.engine.chain_level(&target).unwrap(), Some(2));
        assert_eq!(fixture.engine.chain_level(&root).unwrap(), Some(0));

        let unverified = pending(&fixture, "a2-0");
        assert_eq!(fixture.engine.chain_level(&unverified).unwrap(), None);
    }

    #[test]
    fn test_rotate_authorities() {
        let fixture = setup();
        let target = MemberId::new("a1-0");
        fixture.engine.enroll(target.clone()).unwrap();
        fixture
            .engine
            .rotate_authorities(vec![MemberId::new("COUNCIL-1")])
            .unwrap();

        assert!(matches!(
            fixture
                .engine
                .submit_super_verification(&MemberId::new("FOUNDER-001"), &target, "old"),
            Err(HierarchyError::InvalidAuthority(_))
        ));
        assert!(fixture
            .engine
            .submit_super_verification(&MemberId::new("COUNCIL-1"), &target, "new")
            .unwrap()
            .verified);
        assert!(fixture.engine.rotate_authorities(Vec::new()).is_err());
    }

    #[test]
    fn test_rotated_authorities_outlive_restore() {
        let fixture = setup();
        fixture
            .engine
            .rotate_authorities(vec![MemberId::new("COUNCIL-1")])
            .unwrap();
        let snapshot = fixture.store.load_snapshot().unwrap();
        assert_eq!(snapshot.authorities, Some(vec![MemberId::new("COUNCIL-1")]));

        let restored = VerificationEngine::restore(
            &snapshot,
            VerificationConfig::default(),
            fixture.registry.clone(),
            fixture.store.clone(),
            Arc::new(EventJournal::new()),
        )
        .unwrap();
        assert_eq!(restored.authorities().unwrap(), vec![MemberId::new("COUNCIL-1")]);

        let target = pending(&fixture, "a1-0");
        assert!(matches!(
            restored.submit_super_verification(&MemberId::new("FOUNDER-001"), &target, "old"),
            Err(HierarchyError::InvalidAuthority(_))
        ));
    }
}
