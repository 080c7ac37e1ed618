//! Per-user content visibility engine.
//!
//! For every user and every mirrored entity, this crate decides whether
//! the entity is visible and why, reconciling three policy sources into
//! one materialized exclusion set:
//!
//! - admin restriction rules (allow/deny per entity type)
//! - user-initiated hides
//! - structural cascades (an entity becomes invisible because everything
//!   that would justify showing it is itself invisible)
//!
//! The exclusion set is recomputed on demand by the
//! [`ExclusionComputer`], serialized per user by the
//! [`RecomputeCoordinator`], and consumed by the list/filter layer
//! through [`ExclusionStore::excluded_ids`]. Writes to the rule and
//! hidden-entity stores never mutate the exclusion set themselves;
//! recompute is a distinct, explicit step.

mod cascade;
mod computer;
mod coordinator;
mod db;
mod error;
mod exclusions;
mod hidden;
mod models;
mod rules;
mod stats;

pub use cascade::{CASCADE_RULES, resolve_cascades};
pub use computer::{ComputeConfig, ExclusionComputer};
pub use coordinator::RecomputeCoordinator;
pub use db::VisibilityDb;
pub use error::{VisibilityError, VisibilityResult};
pub use exclusions::ExclusionStore;
pub use hidden::HiddenEntityManager;
pub use models::{
    BulkHideItem, BulkHideOutcome, EntityStatsRow, ExcludedEntity, ExclusionStat, HiddenEntity,
    RecomputeSummary, RestrictionRule,
};
pub use rules::RuleStore;
pub use stats::StatsAggregator;
