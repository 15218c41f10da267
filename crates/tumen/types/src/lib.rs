//! Tumen Domain Types
//!
//! This crate defines the domain types for a strict decimal territorial
//! hierarchy and the quorum machinery that legitimizes changes to it.
//!
//! # Key Concepts
//!
//! - **Unit**: a node of the hierarchy at one of four tiers
//!   (Base/Arban = 10 people, Mid/Zun = 100, High/Myangan = 1,000,
//!   Top/Tumen = 10,000). Every unit holds exactly ten children when full.
//! - **Quorum Document**: a proposed action (leader appointment, resolution,
//!   reassignment) that takes effect only once a threshold of eligible
//!   signers, frozen at issuance, has signed it.
//! - **Notary Grant**: permission to *open* documents of a grade within a
//!   scope. Independent of who may *sign*.
//! - **Trust State**: a member's identity standing, promoted by a quorum of
//!   local peer attestations or a single founder-mandate override.
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime dependencies. All types
//! implement `Clone`, `Debug`, `Serialize`, `Deserialize`. IDs use the
//! newtype pattern and implement `Display`, `generate()`, and `new()`.

#![deny(unsafe_code)]

mod document;
mod errors;
mod events;
mod ids;
mod notary;
mod trust;
mod unit;

pub use document::*;
pub use errors::*;
pub use events::*;
pub use ids::*;
pub use notary::*;
pub use trust::*;
pub use unit::*;
