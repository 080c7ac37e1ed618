//! Core type definitions for Curio.
//!
//! This crate defines the fundamental, store-agnostic types used throughout
//! the visibility engine:
//! - The closed set of mirrored entity types and the relations between them
//! - Instance-scoped entity references and numeric user identifiers
//! - Exclusion reasons and their precedence
//!
//! Anything that touches storage, the catalog, or HTTP belongs in the
//! downstream crates, not here.

mod entity;
mod ids;

pub use entity::{EntityType, ExclusionReason, Relation, RestrictionMode, UnknownValue};
pub use ids::{EntityRef, InstanceId, UserId};
