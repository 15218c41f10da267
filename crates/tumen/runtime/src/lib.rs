//! Tumen Runtime
//!
//! This crate maintains a strict decimal territorial hierarchy and runs the
//! quorum protocols that legitimize changes to it.
//!
//! # Architecture
//!
//! The [`Hierarchy`] is the main entry point. It composes specialized
//! components, each handling one concern:
//!
//! - [`UnitRegistry`]: units, membership edges, leaders, completeness
//! - [`SignerResolver`]: who may sign a document for a unit, read live
//! - [`QuorumEngine`]: document issuance, signing and finalization
//! - [`NotaryGate`]: who may open a document of a grade for a scope
//! - [`VerificationEngine`]: identity trust by peer quorum or authority
//!
//! All components write through to a [`HierarchyStore`] and record facts in
//! an [`EventJournal`].
//!
//! # Key Invariants
//!
//! 1. No unit ever holds more than ten children
//! 2. A child belongs to exactly one parent
//! 3. A document's eligible signers are frozen at issuance
//! 4. A document finalizes once, and its effect is applied once
//! 5. Trust only moves forward
//!
//! # Example
//!
//! ```rust
//! use tumen_runtime::{Hierarchy, HierarchyConfig};
//! use tumen_types::{MemberId, Tier, UnitId};
//!
//! let hierarchy = Hierarchy::new(HierarchyConfig::default()).unwrap();
//! let arban = UnitId::new("arban-1");
//! hierarchy.create_unit(arban.clone(), Tier::Base, "Arban 1").unwrap();
//!
//! for seat in 0..10 {
//!     hierarchy
//!         .register_member(&arban, MemberId::new(format!("seat-{}", seat)))
//!         .unwrap();
//! }
//! assert!(hierarchy.is_complete(&arban).unwrap());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod hierarchy;
pub mod journal;
pub mod notary_gate;
pub mod quorum_engine;
pub mod signer_resolver;
pub mod simulation;
pub mod store;
pub mod unit_registry;
pub mod verification_engine;

pub use config::{ConfigError, HierarchyConfig, NotaryConfig, QuorumConfig, VerificationConfig};
pub use hierarchy::Hierarchy;
pub use journal::EventJournal;
pub use notary_gate::NotaryGate;
pub use quorum_engine::{EffectStatus, IssueRequest, QuorumEngine, SignOutcome};
pub use signer_resolver::SignerResolver;
pub use simulation::{AppointmentReport, Simulation};
pub use store::{HierarchySnapshot, HierarchyStore, MemoryStore, StoreError, StoreResult};
pub use unit_registry::{EffectSink, UnitLineage, UnitRegistry};
pub use verification_engine::{AuthoritySet, VerificationEngine};
