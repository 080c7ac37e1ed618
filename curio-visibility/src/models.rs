//! Record types owned by the visibility engine.

use chrono::{DateTime, Utc};
use curio_types::{EntityRef, EntityType, ExclusionReason, RestrictionMode, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Admin allow/deny policy for one (user, entity type).
///
/// A write fully replaces the rule; there is at most one per
/// (user, entity type). `entity_ids` is an allow-list under
/// [`RestrictionMode::Include`] and a deny-list under
/// [`RestrictionMode::Exclude`]. An empty allow-list means total
/// exclusion of the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionRule {
    pub entity_type: EntityType,
    pub mode: RestrictionMode,
    #[serde(default)]
    pub entity_ids: BTreeSet<EntityRef>,
    #[serde(default)]
    pub restrict_empty: bool,
}

/// A user-initiated per-entity opt-out.
///
/// The reference is opaque: it need not exist in the catalog, so users
/// can hide entities the mirror has not ingested yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenEntity {
    pub entity_type: EntityType,
    pub entity: EntityRef,
    pub hidden_at: DateTime<Utc>,
}

/// One materialized exclusion row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedEntity {
    pub user_id: UserId,
    pub entity_type: EntityType,
    pub entity: EntityRef,
    pub reason: ExclusionReason,
    pub computed_at: DateTime<Utc>,
}

/// Materialized visible-count row, refreshed during recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatsRow {
    pub user_id: UserId,
    pub entity_type: EntityType,
    pub visible_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// Grouped count over the exclusion store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionStat {
    pub user_id: UserId,
    pub entity_type: EntityType,
    pub reason: ExclusionReason,
    pub count: u64,
}

/// One item of a bulk-hide request, before validation.
///
/// `entity_type` stays a raw string here so the whole batch shape can be
/// validated up front and rejected as one unit on an unknown type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkHideItem {
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Outcome of a bulk-hide request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkHideOutcome {
    pub success_count: usize,
    pub fail_count: usize,
}

/// Outcome of an all-users recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    pub success: usize,
    pub failed: usize,
}
