//! Rule Store — admin restriction rules, one per (user, entity type).
//!
//! Writes never trigger a recompute; the exclusion set is regenerated
//! only by an explicit recompute pass.

use crate::db::VisibilityDb;
use crate::models::RestrictionRule;
use crate::{VisibilityError, VisibilityResult};
use curio_types::{EntityRef, EntityType, RestrictionMode, UserId};
use rusqlite::params;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Store for admin restriction rules.
#[derive(Clone)]
pub struct RuleStore {
    db: VisibilityDb,
}

impl RuleStore {
    pub fn new(db: VisibilityDb) -> Self {
        Self { db }
    }

    /// Returns all rules for a user, ordered by entity type.
    pub fn get_rules(&self, user: UserId) -> VisibilityResult<Vec<RestrictionRule>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT entity_type, mode, restrict_empty, entity_ids
                 FROM restriction_rules WHERE user_id = ?1 ORDER BY entity_type",
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to prepare rule query: {e}")))?;
        let rows = stmt
            .query_map(params![user.as_i64()], |row| {
                let entity_type: String = row.get(0)?;
                let mode: String = row.get(1)?;
                let restrict_empty: bool = row.get(2)?;
                let entity_ids: String = row.get(3)?;
                Ok((entity_type, mode, restrict_empty, entity_ids))
            })
            .map_err(|e| VisibilityError::Storage(format!("failed to query rules: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (type_str, mode_str, restrict_empty, ids_json) =
                row.map_err(|e| VisibilityError::Storage(format!("failed to read rule row: {e}")))?;
            let entity_type: EntityType = type_str
                .parse()
                .map_err(|e| VisibilityError::Storage(format!("corrupt rule row: {e}")))?;
            let mode: RestrictionMode = mode_str
                .parse()
                .map_err(|e| VisibilityError::Storage(format!("corrupt rule row: {e}")))?;
            let entity_ids: BTreeSet<EntityRef> = serde_json::from_str(&ids_json)?;
            result.push(RestrictionRule {
                entity_type,
                mode,
                entity_ids,
                restrict_empty,
            });
        }
        Ok(result)
    }

    /// Rules keyed by entity type, for the recompute pass.
    pub fn rules_by_type(
        &self,
        user: UserId,
    ) -> VisibilityResult<HashMap<EntityType, RestrictionRule>> {
        Ok(self
            .get_rules(user)?
            .into_iter()
            .map(|rule| (rule.entity_type, rule))
            .collect())
    }

    /// Replaces all rules for a user in one transaction.
    ///
    /// Rejects duplicate entity types within one request. Unknown types
    /// and modes never reach this point: the closed enums are parsed at
    /// the request boundary.
    pub fn set_rules(&self, user: UserId, rules: &[RestrictionRule]) -> VisibilityResult<()> {
        let mut seen = HashSet::new();
        for rule in rules {
            if !seen.insert(rule.entity_type) {
                return Err(VisibilityError::Validation(format!(
                    "duplicate rule for entity type {}",
                    rule.entity_type
                )));
            }
        }

        let mut conn = self.db.conn();
        let tx = conn
            .transaction()
            .map_err(|e| VisibilityError::Storage(format!("failed to begin rule write: {e}")))?;
        tx.execute(
            "DELETE FROM restriction_rules WHERE user_id = ?1",
            params![user.as_i64()],
        )
        .map_err(|e| VisibilityError::Storage(format!("failed to clear rules: {e}")))?;
        for rule in rules {
            let ids_json = serde_json::to_string(&rule.entity_ids)?;
            tx.execute(
                "INSERT INTO restriction_rules (user_id, entity_type, mode, restrict_empty, entity_ids)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.as_i64(),
                    rule.entity_type.as_str(),
                    rule.mode.as_str(),
                    rule.restrict_empty,
                    ids_json,
                ],
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to write rule: {e}")))?;
        }
        tx.commit()
            .map_err(|e| VisibilityError::Storage(format!("failed to commit rules: {e}")))?;
        Ok(())
    }

    /// Clears all rules for a user. Returns the number of rules removed.
    pub fn delete_rules(&self, user: UserId) -> VisibilityResult<usize> {
        let conn = self.db.conn();
        let removed = conn
            .execute(
                "DELETE FROM restriction_rules WHERE user_id = ?1",
                params![user.as_i64()],
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to delete rules: {e}")))?;
        Ok(removed)
    }
}
