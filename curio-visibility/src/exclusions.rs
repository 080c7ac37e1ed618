//! Exclusion Store — the materialized (user, type, id, reason) table.
//!
//! Rows are owned by the Exclusion Computer: a recompute pass replaces
//! all rows for a (user, type) in one transaction, so the filter layer
//! always observes either the pre- or post-recompute snapshot. The one
//! exception is the best-effort insert path used when a user hides a
//! container entity between passes.

use crate::db::VisibilityDb;
use crate::models::{EntityStatsRow, ExcludedEntity, ExclusionStat};
use crate::{VisibilityError, VisibilityResult};
use chrono::{DateTime, Utc};
use curio_types::{EntityRef, EntityType, ExclusionReason, InstanceId, UserId};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashSet;

/// Store for materialized exclusions and derived stats.
#[derive(Clone)]
pub struct ExclusionStore {
    db: VisibilityDb,
}

impl ExclusionStore {
    pub fn new(db: VisibilityDb) -> Self {
        Self { db }
    }

    /// Replaces all rows for a (user, type) atomically.
    pub fn replace_for_type(
        &self,
        user: UserId,
        entity_type: EntityType,
        rows: &[(EntityRef, ExclusionReason)],
        computed_at: DateTime<Utc>,
    ) -> VisibilityResult<()> {
        let mut conn = self.db.conn();
        let tx = conn
            .transaction()
            .map_err(|e| VisibilityError::Storage(format!("failed to begin replace: {e}")))?;
        tx.execute(
            "DELETE FROM excluded_entities WHERE user_id = ?1 AND entity_type = ?2",
            params![user.as_i64(), entity_type.as_str()],
        )
        .map_err(|e| VisibilityError::Storage(format!("failed to clear exclusions: {e}")))?;
        for (entity, reason) in rows {
            tx.execute(
                "INSERT INTO excluded_entities
                 (user_id, entity_type, instance, entity_id, reason, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.as_i64(),
                    entity_type.as_str(),
                    entity.instance.as_str(),
                    entity.id,
                    reason.as_str(),
                    computed_at.to_rfc3339(),
                ],
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to write exclusion: {e}")))?;
        }
        tx.commit()
            .map_err(|e| VisibilityError::Storage(format!("failed to commit exclusions: {e}")))?;
        Ok(())
    }

    /// Best-effort single-row insert used between recompute passes.
    ///
    /// Returns whether a row was written. The existence check before the
    /// insert keeps the path portable across relational engines; never
    /// rely on a bulk skip-duplicates feature here.
    pub fn insert_if_absent(
        &self,
        user: UserId,
        entity_type: EntityType,
        entity: &EntityRef,
        reason: ExclusionReason,
    ) -> VisibilityResult<bool> {
        let conn = self.db.conn();
        insert_if_absent_on(&conn, user, entity_type, entity, reason, Utc::now())
            .map_err(|e| VisibilityError::Storage(format!("failed to insert exclusion: {e}")))
    }

    /// The indexed lookup the filter/query layer calls on every listing.
    pub fn excluded_ids(
        &self,
        user: UserId,
        entity_type: EntityType,
    ) -> VisibilityResult<HashSet<EntityRef>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT instance, entity_id FROM excluded_entities
                 WHERE user_id = ?1 AND entity_type = ?2",
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to prepare lookup: {e}")))?;
        let rows = stmt
            .query_map(params![user.as_i64(), entity_type.as_str()], |row| {
                let instance: String = row.get(0)?;
                let id: String = row.get(1)?;
                Ok(EntityRef::new(InstanceId::new(instance), id))
            })
            .map_err(|e| VisibilityError::Storage(format!("failed to query exclusions: {e}")))?;

        let mut result = HashSet::new();
        for row in rows {
            result.insert(
                row.map_err(|e| VisibilityError::Storage(format!("failed to read row: {e}")))?,
            );
        }
        Ok(result)
    }

    /// Full rows for a (user, type), ordered for stable presentation.
    pub fn rows_for_type(
        &self,
        user: UserId,
        entity_type: EntityType,
    ) -> VisibilityResult<Vec<ExcludedEntity>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT instance, entity_id, reason, computed_at FROM excluded_entities
                 WHERE user_id = ?1 AND entity_type = ?2 ORDER BY instance, entity_id",
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to prepare row query: {e}")))?;
        let rows = stmt
            .query_map(params![user.as_i64(), entity_type.as_str()], |row| {
                let instance: String = row.get(0)?;
                let id: String = row.get(1)?;
                let reason: String = row.get(2)?;
                let computed_at: String = row.get(3)?;
                Ok((instance, id, reason, computed_at))
            })
            .map_err(|e| VisibilityError::Storage(format!("failed to query rows: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (instance, id, reason_str, computed_str) =
                row.map_err(|e| VisibilityError::Storage(format!("failed to read row: {e}")))?;
            let reason: ExclusionReason = reason_str
                .parse()
                .map_err(|e| VisibilityError::Storage(format!("corrupt exclusion row: {e}")))?;
            let computed_at = parse_timestamp(&computed_str)?;
            result.push(ExcludedEntity {
                user_id: user,
                entity_type,
                entity: EntityRef::new(InstanceId::new(instance), id),
                reason,
                computed_at,
            });
        }
        Ok(result)
    }

    // ── Stats ────────────────────────────────────────────────────

    /// Grouped (user, type, reason) counts over the whole store.
    pub fn grouped_stats(&self) -> VisibilityResult<Vec<ExclusionStat>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, entity_type, reason, COUNT(*) FROM excluded_entities
                 GROUP BY user_id, entity_type, reason
                 ORDER BY user_id, entity_type, reason",
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to prepare stats query: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let user: i64 = row.get(0)?;
                let entity_type: String = row.get(1)?;
                let reason: String = row.get(2)?;
                let count: i64 = row.get(3)?;
                Ok((user, entity_type, reason, count))
            })
            .map_err(|e| VisibilityError::Storage(format!("failed to query stats: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (user, type_str, reason_str, count) =
                row.map_err(|e| VisibilityError::Storage(format!("failed to read stats: {e}")))?;
            let entity_type: EntityType = type_str
                .parse()
                .map_err(|e| VisibilityError::Storage(format!("corrupt stats row: {e}")))?;
            let reason: ExclusionReason = reason_str
                .parse()
                .map_err(|e| VisibilityError::Storage(format!("corrupt stats row: {e}")))?;
            result.push(ExclusionStat {
                user_id: UserId::new(user),
                entity_type,
                reason,
                count: count as u64,
            });
        }
        Ok(result)
    }

    /// Refreshes the materialized visible count for a (user, type).
    pub fn set_visible_count(
        &self,
        user: UserId,
        entity_type: EntityType,
        visible_count: u64,
        updated_at: DateTime<Utc>,
    ) -> VisibilityResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR REPLACE INTO entity_stats (user_id, entity_type, visible_count, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.as_i64(),
                entity_type.as_str(),
                visible_count as i64,
                updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| VisibilityError::Storage(format!("failed to write stats: {e}")))?;
        Ok(())
    }

    /// Materialized visible counts for a user, ordered by entity type.
    pub fn visible_counts(&self, user: UserId) -> VisibilityResult<Vec<EntityStatsRow>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT entity_type, visible_count, updated_at FROM entity_stats
                 WHERE user_id = ?1 ORDER BY entity_type",
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to prepare stats query: {e}")))?;
        let rows = stmt
            .query_map(params![user.as_i64()], |row| {
                let entity_type: String = row.get(0)?;
                let visible: i64 = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok((entity_type, visible, updated_at))
            })
            .map_err(|e| VisibilityError::Storage(format!("failed to query stats: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (type_str, visible, updated_str) =
                row.map_err(|e| VisibilityError::Storage(format!("failed to read stats: {e}")))?;
            let entity_type: EntityType = type_str
                .parse()
                .map_err(|e| VisibilityError::Storage(format!("corrupt stats row: {e}")))?;
            result.push(EntityStatsRow {
                user_id: user,
                entity_type,
                visible_count: visible as u64,
                updated_at: parse_timestamp(&updated_str)?,
            });
        }
        Ok(result)
    }
}

/// Existence-check-then-insert on an already-held connection.
pub(crate) fn insert_if_absent_on(
    conn: &Connection,
    user: UserId,
    entity_type: EntityType,
    entity: &EntityRef,
    reason: ExclusionReason,
    computed_at: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM excluded_entities
             WHERE user_id = ?1 AND entity_type = ?2 AND instance = ?3 AND entity_id = ?4",
            params![
                user.as_i64(),
                entity_type.as_str(),
                entity.instance.as_str(),
                entity.id
            ],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO excluded_entities
         (user_id, entity_type, instance, entity_id, reason, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.as_i64(),
            entity_type.as_str(),
            entity.instance.as_str(),
            entity.id,
            reason.as_str(),
            computed_at.to_rfc3339(),
        ],
    )?;
    Ok(true)
}

pub(crate) fn parse_timestamp(s: &str) -> VisibilityResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VisibilityError::Storage(format!("corrupt timestamp: {e}")))
}
