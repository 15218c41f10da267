//! Issuance Authorization (Notary) Gate
//!
//! A grant-table lookup deciding who may *open* a quorum document. It never
//! decides who may sign.
//!
//! A `Unit` scoped grant covers that unit and every unit beneath it. With
//! monotonic grades, a grant also covers every lower grade.

use crate::store::{HierarchySnapshot, HierarchyStore};
use crate::unit_registry::UnitLineage;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use tumen_types::{
    HierarchyError, HierarchyResult, MemberId, NotaryGrade, NotaryGrant, NotaryScope, UnitId,
};

pub struct NotaryGate {
    grants: RwLock<Vec<NotaryGrant>>,
    lineage: Arc<dyn UnitLineage>,
    store: Arc<dyn HierarchyStore>,
    monotonic: bool,
}

impl NotaryGate {
    pub fn new(
        lineage: Arc<dyn UnitLineage>,
        store: Arc<dyn HierarchyStore>,
        monotonic: bool,
    ) -> Self {
        Self {
            grants: RwLock::new(Vec::new()),
            lineage,
            store,
            monotonic,
        }
    }

    pub fn restore(
        snapshot: &HierarchySnapshot,
        lineage: Arc<dyn UnitLineage>,
        store: Arc<dyn HierarchyStore>,
        monotonic: bool,
    ) -> Self {
        Self {
            grants: RwLock::new(snapshot.grants.clone()),
            lineage,
            store,
            monotonic,
        }
    }

    /// Record a grant. Granting an identical grant again returns the
    /// existing one.
    pub fn grant(
        &self,
        issuer: MemberId,
        grade: NotaryGrade,
        scope: NotaryScope,
    ) -> HierarchyResult<NotaryGrant> {
        let mut grants = self
            .grants
            .write()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        if let Some(existing) = grants
            .iter()
            .find(|g| g.issuer == issuer && g.grade == grade && g.scope == scope)
        {
            return Ok(existing.clone());
        }

        let grant = NotaryGrant::new(issuer, grade, scope);
        self.store.put_grant(&grant)?;
        grants.push(grant.clone());
        info!(issuer = %grant.issuer, grade = %grant.grade, scope = %grant.scope, "Notary grant issued");
        Ok(grant)
    }

    pub fn revoke(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        scope: &NotaryScope,
    ) -> HierarchyResult<NotaryGrant> {
        let mut grants = self
            .grants
            .write()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        let position = grants
            .iter()
            .position(|g| g.issuer == *issuer && g.grade == grade && g.scope == *scope)
            .ok_or_else(|| HierarchyError::GrantNotFound {
                issuer: issuer.clone(),
                grade,
            })?;

        self.store.remove_grant(issuer, grade, scope)?;
        let grant = grants.remove(position);
        info!(issuer = %issuer, grade = %grade, scope = %scope, "Notary grant revoked");
        Ok(grant)
    }

    /// Whether `issuer` may open a document of `grade` scoped to `unit`
    pub fn is_authorized(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        unit: &UnitId,
    ) -> HierarchyResult<bool> {
        let lineage = self.lineage.lineage(unit)?;
        let grants = self
            .grants
            .read()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        let authorized = grants.iter().any(|g| {
            g.issuer == *issuer
                && self.grade_covers(g.grade, grade)
                && match &g.scope {
                    NotaryScope::Global => true,
                    NotaryScope::Unit(scope) => lineage.contains(scope),
                }
        });
        debug!(issuer = %issuer, grade = %grade, unit = %unit, authorized, "Notary check");
        Ok(authorized)
    }

    /// Like [`is_authorized`](Self::is_authorized), failing with
    /// `Unauthorized` instead of returning false
    pub fn require(
        &self,
        issuer: &MemberId,
        grade: NotaryGrade,
        unit: &UnitId,
    ) -> HierarchyResult<()> {
        if self.is_authorized(issuer, grade, unit)? {
            Ok(())
        } else {
            warn!(issuer = %issuer, grade = %grade, unit = %unit, "Issuance not authorized");
            Err(HierarchyError::Unauthorized {
                issuer: issuer.clone(),
                grade,
                unit: unit.clone(),
            })
        }
    }

    pub fn grants_for(&self, issuer: &MemberId) -> HierarchyResult<Vec<NotaryGrant>> {
        let grants = self
            .grants
            .read()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        Ok(grants
            .iter()
            .filter(|g| g.issuer == *issuer)
            .cloned()
            .collect())
    }

    fn grade_covers(&self, held: NotaryGrade, wanted: NotaryGrade) -> bool {
        if self.monotonic {
            held.covers(wanted)
        } else {
            held == wanted
        }
    }
}
