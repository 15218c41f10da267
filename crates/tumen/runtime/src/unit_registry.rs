//! Unit Registry: the tree of units, membership, leaders and completeness
//!
//! Units are kept arena-style in a map keyed by id. Every mutation takes
//! the registry write lock and validates before it mutates. The units and
//! placements it may change are checkpointed first and restored if any
//! later step fails, store writes included, so a rejected call leaves no
//! trace. Completeness is recomputed from the changed unit upward after
//! each edge change.
//!
//! Membership and leadership change only through this component. Outside
//! the initial build-up of the tree, the Quorum Document Engine reaches it
//! through [`EffectSink::apply`].

use crate::journal::EventJournal;
use crate::store::{HierarchySnapshot, HierarchyStore};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use tumen_types::{
    ChildRef, DocumentAction, DocumentId, HierarchyError, HierarchyEvent, HierarchyResult,
    MemberId, MembershipEdge, QuorumDocument, ResolutionRecord, Tier, Unit, UnitId,
};

/// Read access to unit ancestry
pub trait UnitLineage: Send + Sync {
    /// The unit followed by each of its ancestors, nearest first
    fn lineage(&self, unit: &UnitId) -> HierarchyResult<Vec<UnitId>>;

    /// The member's enclosing unit at `tier`, if the member is placed that
    /// high up the tree
    fn member_ancestor(&self, member: &MemberId, tier: Tier) -> HierarchyResult<Option<UnitId>>;
}

/// Receiver of finalized document effects
pub trait EffectSink: Send + Sync {
    /// Apply the document's action. Returns `Ok(false)` if this document's
    /// effect had already been applied.
    fn apply(&self, document: &QuorumDocument) -> HierarchyResult<bool>;
}

/// Copies of what a mutation may change, restored if it fails part way
struct Checkpoint {
    units: Vec<Unit>,
    placements: Vec<(MemberId, Option<UnitId>)>,
}

#[derive(Default)]
struct RegistryState {
    units: HashMap<UnitId, Unit>,
    member_index: HashMap<MemberId, UnitId>,
    applied_effects: HashSet<DocumentId>,
}

impl RegistryState {
    fn unit(&self, id: &UnitId) -> HierarchyResult<&Unit> {
        self.units
            .get(id)
            .ok_or_else(|| HierarchyError::UnitNotFound(id.clone()))
    }

    fn unit_mut(&mut self, id: &UnitId) -> HierarchyResult<&mut Unit> {
        self.units
            .get_mut(id)
            .ok_or_else(|| HierarchyError::UnitNotFound(id.clone()))
    }

    fn ancestor(&self, unit: &UnitId, tier: Tier) -> HierarchyResult<Option<UnitId>> {
        let mut current = self.unit(unit)?;
        loop {
            if current.tier == tier {
                return Ok(Some(current.id.clone()));
            }
            if current.tier > tier {
                return Ok(None);
            }
            match &current.parent {
                Some(parent) => current = self.unit(parent)?,
                None => return Ok(None),
            }
        }
    }

    fn member_ancestor(&self, member: &MemberId, tier: Tier) -> HierarchyResult<Option<UnitId>> {
        match self.member_index.get(member) {
            Some(base) => self.ancestor(base, tier),
            None => Ok(None),
        }
    }

    fn in_subtree(&self, unit: &UnitId, member: &MemberId) -> HierarchyResult<bool> {
        let tier = self.unit(unit)?.tier;
        Ok(self.member_ancestor(member, tier)?.as_ref() == Some(unit))
    }

    fn lineage(&self, unit: &UnitId) -> HierarchyResult<Vec<UnitId>> {
        let mut chain = Vec::new();
        let mut cursor = Some(unit.clone());
        while let Some(id) = cursor {
            cursor = self.unit(&id)?.parent.clone();
            chain.push(id);
        }
        Ok(chain)
    }

    /// Save every unit on the lineage of each of `starts`, plus the
    /// current placement of each of `members`
    fn checkpoint(&self, starts: &[&UnitId], members: &[&MemberId]) -> HierarchyResult<Checkpoint> {
        let mut seen = HashSet::new();
        let mut units = Vec::new();
        for start in starts {
            for id in self.lineage(start)? {
                if seen.insert(id.clone()) {
                    units.push(self.unit(&id)?.clone());
                }
            }
        }
        let placements = members
            .iter()
            .map(|member| ((*member).clone(), self.member_index.get(*member).cloned()))
            .collect();
        Ok(Checkpoint { units, placements })
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        for unit in checkpoint.units {
            self.units.insert(unit.id.clone(), unit);
        }
        for (member, placement) in checkpoint.placements {
            match placement {
                Some(unit) => self.member_index.insert(member, unit),
                None => self.member_index.remove(&member),
            };
        }
    }

    fn compute_complete(&self, unit: &Unit) -> bool {
        if unit.child_count() != unit.tier.capacity() {
            return false;
        }
        match unit.tier {
            Tier::Base => true,
            _ => unit
                .unit_ids()
                .all(|child| self.units.get(child).map(|u| u.complete).unwrap_or(false)),
        }
    }

    fn population(&self, unit: &UnitId) -> HierarchyResult<usize> {
        let unit = self.unit(unit)?;
        match unit.tier {
            Tier::Base => Ok(unit.child_count()),
            _ => unit
                .unit_ids()
                .map(|child| self.population(child))
                .sum(),
        }
    }

    /// Recompute completeness from `start` upward, stopping at the first
    /// unit whose flag does not change. Returns the units it touched.
    fn refresh_completeness(
        &mut self,
        start: &UnitId,
        events: &mut Vec<HierarchyEvent>,
    ) -> HierarchyResult<Vec<UnitId>> {
        let mut touched = Vec::new();
        let mut cursor = Some(start.clone());
        while let Some(id) = cursor {
            let complete = self.compute_complete(self.unit(&id)?);
            let unit = self.unit_mut(&id)?;
            if unit.complete == complete {
                break;
            }
            unit.complete = complete;
            unit.touch();
            if complete {
                info!(unit = %unit.id, tier = %unit.tier, "Unit completed");
                events.push(HierarchyEvent::UnitCompleted {
                    unit: unit.id.clone(),
                    tier: unit.tier,
                });
                if !unit.sealed {
                    unit.sealed = true;
                    debug!(unit = %unit.id, "Unit sealed");
                }
            } else {
                warn!(unit = %unit.id, tier = %unit.tier, "Unit no longer complete");
            }
            cursor = unit.parent.clone();
            touched.push(id);
        }
        Ok(touched)
    }

    /// Clear leaders along the lineage of `start` that are no longer inside
    /// their unit's subtree
    fn drop_orphaned_leaders(&mut self, start: &UnitId) -> HierarchyResult<Vec<UnitId>> {
        let mut cleared = Vec::new();
        for id in self.lineage(start)? {
            let leader = self.unit(&id)?.leader.clone();
            if let Some(leader) = leader {
                if !self.in_subtree(&id, &leader)? {
                    let unit = self.unit_mut(&id)?;
                    unit.leader = None;
                    unit.touch();
                    warn!(unit = %id, leader = %leader, "Leader left unit subtree; leadership vacated");
                    cleared.push(id);
                }
            }
        }
        Ok(cleared)
    }

    fn set_leader(
        &mut self,
        unit_id: &UnitId,
        member: &MemberId,
        events: &mut Vec<HierarchyEvent>,
    ) -> HierarchyResult<()> {
        if !self.in_subtree(unit_id, member)? {
            return Err(HierarchyError::NotAMember {
                child: member.to_string(),
                unit: unit_id.clone(),
            });
        }
        let unit = self.unit_mut(unit_id)?;
        if unit.leader.as_ref() == Some(member) {
            return Ok(());
        }
        let previous = unit.leader.replace(member.clone());
        unit.touch();
        info!(unit = %unit_id, leader = %member, "Leadership changed");
        events.push(HierarchyEvent::LeadershipChanged {
            unit: unit_id.clone(),
            previous,
            leader: member.clone(),
        });
        Ok(())
    }
}

/// The unit tree
pub struct UnitRegistry {
    state: RwLock<RegistryState>,
    store: Arc<dyn HierarchyStore>,
    journal: Arc<EventJournal>,
}

impl UnitRegistry {
    pub fn new(store: Arc<dyn HierarchyStore>, journal: Arc<EventJournal>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            store,
            journal,
        }
    }

    /// Rebuild from persisted state
    pub fn restore(
        snapshot: &HierarchySnapshot,
        store: Arc<dyn HierarchyStore>,
        journal: Arc<EventJournal>,
    ) -> Self {
        let mut state = RegistryState::default();
        for unit in &snapshot.units {
            if unit.tier == Tier::Base {
                for member in unit.member_ids() {
                    state.member_index.insert(member.clone(), unit.id.clone());
                }
            }
            state.units.insert(unit.id.clone(), unit.clone());
        }
        state.applied_effects = snapshot.applied_effects.iter().cloned().collect();
        info!(units = state.units.len(), members = state.member_index.len(), "Unit registry restored");
        Self {
            state: RwLock::new(state),
            store,
            journal,
        }
    }

    fn read(&self) -> HierarchyResult<RwLockReadGuard<'_, RegistryState>> {
        self.state.read().map_err(|_| HierarchyError::LockPoisoned)
    }

    fn write(&self) -> HierarchyResult<RwLockWriteGuard<'_, RegistryState>> {
        self.state.write().map_err(|_| HierarchyError::LockPoisoned)
    }

    /// Run `op`, restoring `checkpoint` if it fails
    fn transact<T>(
        state: &mut RegistryState,
        checkpoint: Checkpoint,
        op: impl FnOnce(&mut RegistryState) -> HierarchyResult<T>,
    ) -> HierarchyResult<T> {
        let result = op(state);
        if let Err(err) = &result {
            warn!(error = %err, "Registry change rolled back");
            state.rollback(checkpoint);
        }
        result
    }

    fn persist(&self, state: &RegistryState, touched: &[UnitId]) -> HierarchyResult<()> {
        let mut seen = HashSet::new();
        for id in touched {
            if seen.insert(id) {
                self.store.put_unit(state.unit(id)?)?;
            }
        }
        Ok(())
    }

    pub fn create_unit(
        &self,
        id: UnitId,
        tier: Tier,
        name: impl Into<String>,
    ) -> HierarchyResult<Unit> {
        let mut state = self.write()?;
        if state.units.contains_key(&id) {
            return Err(HierarchyError::UnitAlreadyExists(id));
        }
        let unit = Unit::new(id.clone(), tier, name);
        self.store.put_unit(&unit)?;
        state.units.insert(id.clone(), unit.clone());
        self.journal
            .record(HierarchyEvent::UnitCreated { unit: id.clone(), tier })?;
        info!(unit = %id, tier = %tier, "Unit created");
        Ok(unit)
    }

    /// Place a member into a Base unit
    pub fn register_member(
        &self,
        unit_id: &UnitId,
        member: MemberId,
    ) -> HierarchyResult<MembershipEdge> {
        let mut state = self.write()?;
        let unit = state.unit(unit_id)?;
        if unit.tier != Tier::Base {
            return Err(HierarchyError::TierMismatch {
                expected: Tier::Base,
                found: unit.tier,
            });
        }
        if unit.is_full() {
            warn!(unit = %unit_id, member = %member, "Registration rejected: unit full");
            return Err(HierarchyError::CapacityExceeded {
                unit: unit_id.clone(),
                capacity: unit.tier.capacity(),
            });
        }
        if let Some(parent) = state.member_index.get(&member) {
            return Err(HierarchyError::AlreadyMember {
                child: member.to_string(),
                parent: parent.clone(),
            });
        }

        let child = ChildRef::Member(member.clone());
        let edge = MembershipEdge::new(child.clone(), unit_id.clone(), Tier::Base);
        let checkpoint = state.checkpoint(&[unit_id], &[&member])?;
        let events = Self::transact(&mut state, checkpoint, |state| {
            let unit = state.unit_mut(unit_id)?;
            unit.children.push(child.clone());
            unit.touch();
            state.member_index.insert(member.clone(), unit_id.clone());

            let mut events = vec![HierarchyEvent::ChildRegistered {
                parent: unit_id.clone(),
                child,
            }];
            let mut touched = vec![unit_id.clone()];
            touched.extend(state.refresh_completeness(unit_id, &mut events)?);

            self.store.put_edge(&edge)?;
            self.persist(state, &touched)?;
            Ok(events)
        })?;
        self.journal.record_all(events)?;
        debug!(unit = %unit_id, member = %member, "Member registered");
        Ok(edge)
    }

    /// Place a unit under a parent one tier up
    pub fn register_child(
        &self,
        parent_id: &UnitId,
        child_id: &UnitId,
    ) -> HierarchyResult<MembershipEdge> {
        let mut state = self.write()?;
        let parent = state.unit(parent_id)?;
        let child = state.unit(child_id)?;
        let required = child.tier.parent_tier().ok_or_else(|| {
            HierarchyError::InvalidTransition(format!("{} units have no parent tier", child.tier))
        })?;
        if parent.tier != required {
            return Err(HierarchyError::TierMismatch {
                expected: required,
                found: parent.tier,
            });
        }
        if parent.is_full() {
            warn!(unit = %parent_id, child = %child_id, "Registration rejected: unit full");
            return Err(HierarchyError::CapacityExceeded {
                unit: parent_id.clone(),
                capacity: parent.tier.capacity(),
            });
        }
        if let Some(existing) = &child.parent {
            return Err(HierarchyError::AlreadyMember {
                child: ChildRef::Unit(child_id.clone()).to_string(),
                parent: existing.clone(),
            });
        }

        let child_ref = ChildRef::Unit(child_id.clone());
        let edge = MembershipEdge::new(child_ref.clone(), parent_id.clone(), parent.tier);
        let checkpoint = state.checkpoint(&[parent_id, child_id], &[])?;
        let events = Self::transact(&mut state, checkpoint, |state| {
            let parent = state.unit_mut(parent_id)?;
            parent.children.push(child_ref.clone());
            parent.touch();
            let child = state.unit_mut(child_id)?;
            child.parent = Some(parent_id.clone());
            child.touch();

            let mut events = vec![HierarchyEvent::ChildRegistered {
                parent: parent_id.clone(),
                child: child_ref,
            }];
            let mut touched = vec![parent_id.clone(), child_id.clone()];
            touched.extend(state.refresh_completeness(parent_id, &mut events)?);

            self.store.put_edge(&edge)?;
            self.persist(state, &touched)?;
            Ok(events)
        })?;
        self.journal.record_all(events)?;
        debug!(parent = %parent_id, child = %child_id, "Child unit registered");
        Ok(edge)
    }

    /// Take a member out of an unsealed Base unit
    pub fn remove_member(&self, unit_id: &UnitId, member: &MemberId) -> HierarchyResult<()> {
        let mut state = self.write()?;
        let child = ChildRef::Member(member.clone());
        let unit = state.unit(unit_id)?;
        if unit.sealed {
            return Err(HierarchyError::UnitSealed(unit_id.clone()));
        }
        if !unit.contains(&child) {
            return Err(HierarchyError::NotAMember {
                child: member.to_string(),
                unit: unit_id.clone(),
            });
        }

        let checkpoint = state.checkpoint(&[unit_id], &[member])?;
        let events = Self::transact(&mut state, checkpoint, |state| {
            let unit = state.unit_mut(unit_id)?;
            unit.children.retain(|c| *c != child);
            unit.touch();
            state.member_index.remove(member);

            let mut events = vec![HierarchyEvent::ChildRemoved {
                parent: unit_id.clone(),
                child: child.clone(),
            }];
            let mut touched = vec![unit_id.clone()];
            touched.extend(state.drop_orphaned_leaders(unit_id)?);
            touched.extend(state.refresh_completeness(unit_id, &mut events)?);

            self.store.remove_edge(&child)?;
            self.persist(state, &touched)?;
            Ok(events)
        })?;
        self.journal.record_all(events)?;
        info!(unit = %unit_id, member = %member, "Member removed");
        Ok(())
    }

    /// Detach a child unit from an unsealed parent
    pub fn remove_child(&self, parent_id: &UnitId, child_id: &UnitId) -> HierarchyResult<()> {
        let mut state = self.write()?;
        let child = ChildRef::Unit(child_id.clone());
        let parent = state.unit(parent_id)?;
        if parent.sealed {
            return Err(HierarchyError::UnitSealed(parent_id.clone()));
        }
        if !parent.contains(&child) {
            return Err(HierarchyError::NotAMember {
                child: child.to_string(),
                unit: parent_id.clone(),
            });
        }

        let checkpoint = state.checkpoint(&[child_id], &[])?;
        let events = Self::transact(&mut state, checkpoint, |state| {
            let parent = state.unit_mut(parent_id)?;
            parent.children.retain(|c| *c != child);
            parent.touch();
            let detached = state.unit_mut(child_id)?;
            detached.parent = None;
            detached.touch();

            let mut events = vec![HierarchyEvent::ChildRemoved {
                parent: parent_id.clone(),
                child: child.clone(),
            }];
            let mut touched = vec![parent_id.clone(), child_id.clone()];
            touched.extend(state.drop_orphaned_leaders(parent_id)?);
            touched.extend(state.refresh_completeness(parent_id, &mut events)?);

            self.store.remove_edge(&child)?;
            self.persist(state, &touched)?;
            Ok(events)
        })?;
        self.journal.record_all(events)?;
        info!(parent = %parent_id, child = %child_id, "Child unit removed");
        Ok(())
    }

    /// Point a unit's leader at a member of its subtree
    pub fn set_leader(&self, unit_id: &UnitId, member: &MemberId) -> HierarchyResult<()> {
        let mut state = self.write()?;
        let checkpoint = state.checkpoint(&[unit_id], &[])?;
        let events = Self::transact(&mut state, checkpoint, |state| {
            let mut events = Vec::new();
            state.set_leader(unit_id, member, &mut events)?;
            self.persist(state, std::slice::from_ref(unit_id))?;
            Ok(events)
        })?;
        self.journal.record_all(events)?;
        Ok(())
    }

    pub fn get_unit(&self, unit_id: &UnitId) -> HierarchyResult<Unit> {
        Ok(self.read()?.unit(unit_id)?.clone())
    }

    pub fn is_complete(&self, unit_id: &UnitId) -> HierarchyResult<bool> {
        Ok(self.read()?.unit(unit_id)?.complete)
    }

    pub fn get_children(&self, unit_id: &UnitId) -> HierarchyResult<Vec<ChildRef>> {
        Ok(self.read()?.unit(unit_id)?.children.clone())
    }

    pub fn leader_of(&self, unit_id: &UnitId) -> HierarchyResult<Option<MemberId>> {
        Ok(self.read()?.unit(unit_id)?.leader.clone())
    }

    /// The unit itself or its ancestor at `tier`; `None` above the root or
    /// below the unit
    pub fn get_ancestor(&self, unit_id: &UnitId, tier: Tier) -> HierarchyResult<Option<UnitId>> {
        self.read()?.ancestor(unit_id, tier)
    }

    /// The Base unit holding a member
    pub fn unit_of_member(&self, member: &MemberId) -> HierarchyResult<Option<UnitId>> {
        Ok(self.read()?.member_index.get(member).cloned())
    }

    pub fn member_ancestor(&self, member: &MemberId, tier: Tier) -> HierarchyResult<Option<UnitId>> {
        self.read()?.member_ancestor(member, tier)
    }

    /// Whether a member sits anywhere below `unit_id`
    pub fn in_subtree(&self, unit_id: &UnitId, member: &MemberId) -> HierarchyResult<bool> {
        self.read()?.in_subtree(unit_id, member)
    }

    /// Members placed anywhere in the unit's subtree
    pub fn population(&self, unit_id: &UnitId) -> HierarchyResult<usize> {
        self.read()?.population(unit_id)
    }

    pub fn units(&self) -> HierarchyResult<Vec<Unit>> {
        let state = self.read()?;
        let mut units: Vec<Unit> = state.units.values().cloned().collect();
        units.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(units)
    }

    pub fn is_effect_applied(&self, document: &DocumentId) -> HierarchyResult<bool> {
        Ok(self.read()?.applied_effects.contains(document))
    }

    /// Move a unit child of `from` under `new_parent`, bypassing the seal.
    /// Re-applying a completed move is a no-op.
    fn reassign(
        &self,
        state: &mut RegistryState,
        from: &UnitId,
        child_id: &UnitId,
        new_parent: &UnitId,
        events: &mut Vec<HierarchyEvent>,
    ) -> HierarchyResult<Vec<UnitId>> {
        let child = state.unit(child_id)?;
        if child.parent.as_ref() == Some(new_parent) {
            return Ok(Vec::new());
        }
        let child_ref = ChildRef::Unit(child_id.clone());
        if child.parent.as_ref() != Some(from) {
            return Err(HierarchyError::NotAMember {
                child: child_ref.to_string(),
                unit: from.clone(),
            });
        }
        let required = child.tier.parent_tier().ok_or_else(|| {
            HierarchyError::InvalidTransition(format!("{} units have no parent tier", child.tier))
        })?;
        let target = state.unit(new_parent)?;
        if target.tier != required {
            return Err(HierarchyError::TierMismatch {
                expected: required,
                found: target.tier,
            });
        }
        if target.is_full() {
            return Err(HierarchyError::CapacityExceeded {
                unit: new_parent.clone(),
                capacity: target.tier.capacity(),
            });
        }

        let source = state.unit_mut(from)?;
        source.children.retain(|c| *c != child_ref);
        source.touch();
        let target = state.unit_mut(new_parent)?;
        target.children.push(child_ref.clone());
        target.touch();
        let moved = state.unit_mut(child_id)?;
        moved.parent = Some(new_parent.clone());
        moved.touch();

        events.push(HierarchyEvent::ChildReassigned {
            child: child_id.clone(),
            from: from.clone(),
            to: new_parent.clone(),
        });
        let mut touched = vec![from.clone(), new_parent.clone(), child_id.clone()];
        touched.extend(state.drop_orphaned_leaders(from)?);
        touched.extend(state.refresh_completeness(from, events)?);
        touched.extend(state.refresh_completeness(new_parent, events)?);

        self.store
            .put_edge(&MembershipEdge::new(child_ref, new_parent.clone(), required))?;
        info!(child = %child_id, from = %from, to = %new_parent, "Child unit reassigned");
        Ok(touched)
    }

    fn apply_action(
        &self,
        state: &mut RegistryState,
        document: &QuorumDocument,
    ) -> HierarchyResult<Vec<HierarchyEvent>> {
        let unit_id = &document.scope.unit;
        let mut events = Vec::new();
        let mut touched = vec![unit_id.clone()];
        match &document.action {
            DocumentAction::AppointLeader { member }
            | DocumentAction::FoundBaseUnit { leader: member } => {
                state.set_leader(unit_id, member, &mut events)?;
            }
            DocumentAction::AdoptResolution {
                title,
                content_hash,
            } => {
                let unit = state.unit_mut(unit_id)?;
                if !unit.resolutions.iter().any(|r| r.document_id == document.id) {
                    unit.resolutions.push(ResolutionRecord {
                        document_id: document.id.clone(),
                        title: title.clone(),
                        content_hash: content_hash.clone(),
                        adopted_at: chrono::Utc::now(),
                    });
                    unit.touch();
                    info!(unit = %unit_id, document = %document.id, "Resolution adopted");
                    events.push(HierarchyEvent::ResolutionAdopted {
                        unit: unit_id.clone(),
                        document: document.id.clone(),
                        title: title.clone(),
                    });
                }
            }
            DocumentAction::ReassignChild { child, new_parent } => {
                touched.extend(self.reassign(state, unit_id, child, new_parent, &mut events)?);
            }
        }

        self.persist(state, &touched)?;
        self.store.mark_effect_applied(&document.id)?;
        state.applied_effects.insert(document.id.clone());
        Ok(events)
    }
}

impl UnitLineage for UnitRegistry {
    fn lineage(&self, unit: &UnitId) -> HierarchyResult<Vec<UnitId>> {
        self.read()?.lineage(unit)
    }

    fn member_ancestor(&self, member: &MemberId, tier: Tier) -> HierarchyResult<Option<UnitId>> {
        UnitRegistry::member_ancestor(self, member, tier)
    }
}

impl EffectSink for UnitRegistry {
    fn apply(&self, document: &QuorumDocument) -> HierarchyResult<bool> {
        let mut state = self.write()?;
        if state.applied_effects.contains(&document.id) {
            debug!(document = %document.id, "Effect already applied");
            return Ok(false);
        }

        let unit_id = &document.scope.unit;
        let mut starts = vec![unit_id];
        if let DocumentAction::ReassignChild { child, new_parent } = &document.action {
            starts.extend([child, new_parent]);
        }
        let checkpoint = state.checkpoint(&starts, &[])?;
        let events = Self::transact(&mut state, checkpoint, |state| {
            self.apply_action(state, document)
        })?;
        self.journal.record_all(events)?;
        info!(
            document = %document.id,
            action = document.action.kind(),
            unit = %unit_id,
            "Document effect applied"
        );
        Ok(true)
    }
}
