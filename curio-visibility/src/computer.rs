//! Exclusion Computer — the central recompute algorithm.
//!
//! A pass snapshots rules, hidden IDs, catalog enumerations, and the
//! relation edges the cascade needs, computes the full exclusion set in
//! memory, and only then writes: one atomic replace per entity type plus
//! refreshed stats rows. A catalog failure therefore aborts the whole
//! per-user pass with the prior snapshot intact.

use crate::cascade::{CASCADE_RULES, RelationSnapshot, resolve_cascades};
use crate::exclusions::ExclusionStore;
use crate::hidden::HiddenEntityManager;
use crate::rules::RuleStore;
use crate::{VisibilityError, VisibilityResult};
use chrono::Utc;
use curio_catalog::{EntityCatalog, UserDirectory};
use curio_types::{EntityRef, EntityType, ExclusionReason, RestrictionMode, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Configuration for recompute passes.
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    /// Deadline for one per-user pass. Checked between phases and before
    /// the write phase; exceeding it fails the pass without committing.
    pub deadline: Duration,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(60),
        }
    }
}

/// Orchestrates rule store, catalog, and cascade resolver into a full
/// exclusion set for one user.
pub struct ExclusionComputer {
    catalog: Arc<dyn EntityCatalog>,
    users: Arc<dyn UserDirectory>,
    rules: RuleStore,
    hidden: HiddenEntityManager,
    exclusions: ExclusionStore,
    config: ComputeConfig,
}

impl ExclusionComputer {
    pub fn new(
        catalog: Arc<dyn EntityCatalog>,
        users: Arc<dyn UserDirectory>,
        rules: RuleStore,
        hidden: HiddenEntityManager,
        exclusions: ExclusionStore,
    ) -> Self {
        Self::with_config(catalog, users, rules, hidden, exclusions, ComputeConfig::default())
    }

    pub fn with_config(
        catalog: Arc<dyn EntityCatalog>,
        users: Arc<dyn UserDirectory>,
        rules: RuleStore,
        hidden: HiddenEntityManager,
        exclusions: ExclusionStore,
        config: ComputeConfig,
    ) -> Self {
        Self {
            catalog,
            users,
            rules,
            hidden,
            exclusions,
            config,
        }
    }

    pub fn exclusions(&self) -> &ExclusionStore {
        &self.exclusions
    }

    /// Regenerates the full exclusion set for one user.
    ///
    /// Idempotent given unchanged inputs. Concurrent calls for the same
    /// user must be serialized by the caller (the coordinator does).
    pub fn recompute_user(&self, user: UserId) -> VisibilityResult<()> {
        if !self.users.user_exists(user)? {
            return Err(VisibilityError::NotFound(format!("user {user}")));
        }
        let started = Instant::now();

        // Phase 1: snapshot inputs
        let rules = self.rules.rules_by_type(user)?;
        let hidden = self.hidden.ids_by_type(user)?;
        let mut all_ids: HashMap<EntityType, HashSet<EntityRef>> = HashMap::new();
        for entity_type in EntityType::ALL {
            all_ids.insert(entity_type, self.catalog.all_ids(entity_type)?);
        }
        self.check_deadline(started)?;

        // Phase 2: direct exclusions with reason precedence
        let mut excluded: HashMap<EntityType, HashMap<EntityRef, ExclusionReason>> = HashMap::new();
        for entity_type in EntityType::ALL {
            let mut members: HashMap<EntityRef, ExclusionReason> = HashMap::new();
            if let Some(rule) = rules.get(&entity_type) {
                match rule.mode {
                    // Empty allow-list means total exclusion of the type
                    RestrictionMode::Include => {
                        for id in &all_ids[&entity_type] {
                            if !rule.entity_ids.contains(id) {
                                members.insert(id.clone(), ExclusionReason::Restricted);
                            }
                        }
                    }
                    RestrictionMode::Exclude => {
                        for id in &rule.entity_ids {
                            members.insert(id.clone(), ExclusionReason::Restricted);
                        }
                    }
                }
            }
            if let Some(ids) = hidden.get(&entity_type) {
                for id in ids {
                    members.entry(id.clone()).or_insert(ExclusionReason::Hidden);
                }
            }
            excluded.insert(entity_type, members);
        }
        self.check_deadline(started)?;

        // Phase 3: cascade to a fixed point
        let restrict_empty: HashSet<EntityType> = rules
            .values()
            .filter(|rule| rule.restrict_empty)
            .map(|rule| rule.entity_type)
            .collect();
        let mut relations = RelationSnapshot::new();
        for (container_type, relation) in CASCADE_RULES {
            if !restrict_empty.contains(&container_type) {
                continue;
            }
            let edges =
                self.catalog
                    .related_ids_for(container_type, &all_ids[&container_type], relation)?;
            relations.insert((container_type, relation), edges);
        }
        let membership: HashMap<EntityType, HashSet<EntityRef>> = excluded
            .iter()
            .map(|(entity_type, members)| (*entity_type, members.keys().cloned().collect()))
            .collect();
        let additions = resolve_cascades(&membership, &relations, &restrict_empty);
        for (entity_type, ids) in additions {
            let members = excluded.entry(entity_type).or_default();
            for id in ids {
                members.entry(id).or_insert(ExclusionReason::Cascade);
            }
        }
        self.check_deadline(started)?;

        // Phase 4: atomic replace per type, plus stats
        let computed_at = Utc::now();
        let mut total = 0usize;
        for entity_type in EntityType::ALL {
            let members = &excluded[&entity_type];
            let mut rows: Vec<(EntityRef, ExclusionReason)> = members
                .iter()
                .map(|(id, reason)| (id.clone(), *reason))
                .collect();
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            total += rows.len();
            self.exclusions
                .replace_for_type(user, entity_type, &rows, computed_at)?;

            let visible = all_ids[&entity_type].len().saturating_sub(rows.len());
            self.exclusions
                .set_visible_count(user, entity_type, visible as u64, computed_at)?;
            debug!(
                "user {user}: {entity_type} excluded={} visible={visible}",
                rows.len()
            );
        }
        info!(
            "recomputed exclusions for user {user}: {total} rows in {:?}",
            started.elapsed()
        );
        Ok(())
    }

    fn check_deadline(&self, started: Instant) -> VisibilityResult<()> {
        if started.elapsed() > self.config.deadline {
            return Err(VisibilityError::Timeout);
        }
        Ok(())
    }
}
