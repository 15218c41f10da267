//! Scripted build-ups of the hierarchy
//!
//! Builds complete units bottom-up the way the live system does: members
//! join a Base unit, the members co-sign its founding document, and every
//! higher unit has its leader appointed by a unanimous document of its
//! children's leaders.

use crate::hierarchy::Hierarchy;
use crate::quorum_engine::SignOutcome;
use serde::{Deserialize, Serialize};
use tracing::info;
use tumen_types::{
    DocumentAction, DocumentScope, HierarchyError, HierarchyResult, MemberId, NotaryGrade,
    NotaryScope, QuorumDocument, ThresholdPolicy, Tier, Unit, UnitId,
    DECIMAL_FANOUT,
};

/// Outcome of a scripted appointment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppointmentReport {
    pub unit: Unit,
    pub population: usize,
    pub document: QuorumDocument,
}

pub struct Simulation<'a> {
    hierarchy: &'a Hierarchy,
    notary: MemberId,
}

impl<'a> Simulation<'a> {
    /// Uses `notary` as the issuer of every document, granting it global
    /// Top grade
    pub fn new(hierarchy: &'a Hierarchy, notary: MemberId) -> HierarchyResult<Self> {
        hierarchy.grant(notary.clone(), NotaryGrade::Top, NotaryScope::Global)?;
        Ok(Self { hierarchy, notary })
    }

    /// Member ids of a Base unit built by this simulation
    pub fn member_id(unit: &str, seat: usize) -> MemberId {
        MemberId::new(format!("{}-m{}", unit, seat))
    }

    /// A full Base unit whose members have co-signed its founding, with the
    /// first member as leader
    pub fn found_base_unit(&self, id: &str) -> HierarchyResult<AppointmentReport> {
        let unit_id = UnitId::new(id);
        self.hierarchy
            .create_unit(unit_id.clone(), Tier::Base, format!("Arban {}", id))?;
        for seat in 0..DECIMAL_FANOUT {
            self.hierarchy
                .register_member(&unit_id, Self::member_id(id, seat))?;
        }
        let document = self.ratify(
            &unit_id,
            Tier::Base,
            DocumentAction::FoundBaseUnit {
                leader: Self::member_id(id, 0),
            },
        )?;
        self.report(&unit_id, document)
    }

    /// A complete unit of `tier`, every unit beneath it led, with its own
    /// leader appointed by quorum
    pub fn build_unit(&self, tier: Tier, id: &str) -> HierarchyResult<AppointmentReport> {
        let child_tier = match tier.child_tier() {
            Some(child_tier) => child_tier,
            None => return self.found_base_unit(id),
        };

        let unit_id = UnitId::new(id);
        self.hierarchy
            .create_unit(unit_id.clone(), tier, format!("{} {}", tier, id))?;
        let mut first_leader = None;
        for index in 0..DECIMAL_FANOUT {
            let child = self.build_unit(child_tier, &format!("{}.{}", id, index))?;
            self.hierarchy.register_child(&unit_id, &child.unit.id)?;
            if first_leader.is_none() {
                first_leader = child.unit.leader.clone();
            }
        }

        let candidate = first_leader.ok_or_else(|| HierarchyError::NotAMember {
            child: "leader".into(),
            unit: unit_id.clone(),
        })?;
        let document = self.ratify(
            &unit_id,
            tier,
            DocumentAction::AppointLeader { member: candidate },
        )?;
        info!(unit = %unit_id, tier = %tier, "Unit built and led");
        self.report(&unit_id, document)
    }

    /// Issue a unanimous document for `action` and collect every eligible
    /// signature
    pub fn ratify(
        &self,
        unit: &UnitId,
        tier: Tier,
        action: DocumentAction,
    ) -> HierarchyResult<QuorumDocument> {
        let document = self.hierarchy.issue_document(
            DocumentScope::new(unit.clone(), tier),
            action,
            ThresholdPolicy::Count(DECIMAL_FANOUT as u32),
            self.notary.clone(),
        )?;
        for signer in &document.eligible.signers {
            let outcome = self.hierarchy.sign(&document.id, signer)?;
            if matches!(outcome, SignOutcome::Finalized { .. }) {
                break;
            }
        }
        let document = self.hierarchy.get_document(&document.id)?;
        if document.is_open() && document.threshold_met() {
            self.hierarchy.finalize(&document.id)?;
            return self.hierarchy.get_document(&document.id);
        }
        Ok(document)
    }

    fn report(&self, unit: &UnitId, document: QuorumDocument) -> HierarchyResult<AppointmentReport> {
        Ok(AppointmentReport {
            unit: self.hierarchy.get_unit(unit)?,
            population: self.hierarchy.population(unit)?,
            document,
        })
    }
}
