//! Stats Aggregator — read-only summaries over the Exclusion Store.
//!
//! Reflects only the last successful recompute; nothing here is ever
//! computed on the fly against the catalog.

use crate::exclusions::ExclusionStore;
use crate::models::{EntityStatsRow, ExclusionStat};
use crate::VisibilityResult;
use curio_types::UserId;

/// Summarizes the exclusion store by user, type, and reason.
#[derive(Clone)]
pub struct StatsAggregator {
    exclusions: ExclusionStore,
}

impl StatsAggregator {
    pub fn new(exclusions: ExclusionStore) -> Self {
        Self { exclusions }
    }

    /// Grouped (user, type, reason) counts across all users.
    pub fn exclusion_stats(&self) -> VisibilityResult<Vec<ExclusionStat>> {
        self.exclusions.grouped_stats()
    }

    /// Materialized visible counts for one user.
    pub fn visible_counts(&self, user: UserId) -> VisibilityResult<Vec<EntityStatsRow>> {
        self.exclusions.visible_counts(user)
    }
}
