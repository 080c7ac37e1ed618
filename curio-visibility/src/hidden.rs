//! Hidden-Entity Manager — user-initiated per-entity opt-outs.
//!
//! Hidden references are opaque and independent of admin rules; hiding
//! something the mirror has not ingested yet is allowed. Hiding a
//! performer also writes best-effort exclusion rows for the hidden
//! entity itself and for items that reference only that performer, so
//! reads stay consistent between full recompute passes.

use crate::db::VisibilityDb;
use crate::exclusions::{insert_if_absent_on, parse_timestamp};
use crate::models::{BulkHideItem, BulkHideOutcome, HiddenEntity};
use crate::{VisibilityError, VisibilityResult};
use chrono::Utc;
use curio_catalog::EntityCatalog;
use curio_types::{EntityRef, EntityType, ExclusionReason, InstanceId, Relation, UserId};
use rusqlite::{OptionalExtension, params};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Container relations checked when a performer is hidden.
const PERFORMER_CONTAINERS: [(EntityType, Relation); 2] = [
    (EntityType::MediaItem, Relation::MediaItems),
    (EntityType::ImageItem, Relation::ImageItems),
];

/// Store and operations for hidden entities.
#[derive(Clone)]
pub struct HiddenEntityManager {
    db: VisibilityDb,
    catalog: Option<Arc<dyn EntityCatalog>>,
}

impl HiddenEntityManager {
    /// Manager without a catalog; hides never write immediate cascade rows.
    pub fn new(db: VisibilityDb) -> Self {
        Self { db, catalog: None }
    }

    /// Manager that consults the catalog for immediate cascade rows.
    pub fn with_catalog(db: VisibilityDb, catalog: Arc<dyn EntityCatalog>) -> Self {
        Self {
            db,
            catalog: Some(catalog),
        }
    }

    /// Hides an entity for a user. Idempotent: repeating is no error.
    pub fn hide(
        &self,
        user: UserId,
        entity_type: EntityType,
        entity: &EntityRef,
    ) -> VisibilityResult<()> {
        {
            let conn = self.db.conn();
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM hidden_entities
                     WHERE user_id = ?1 AND entity_type = ?2 AND instance = ?3 AND entity_id = ?4",
                    params![
                        user.as_i64(),
                        entity_type.as_str(),
                        entity.instance.as_str(),
                        entity.id
                    ],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| VisibilityError::Storage(format!("failed to check hidden row: {e}")))?;
            if existing.is_none() {
                conn.execute(
                    "INSERT INTO hidden_entities (user_id, entity_type, instance, entity_id, hidden_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        user.as_i64(),
                        entity_type.as_str(),
                        entity.instance.as_str(),
                        entity.id,
                        Utc::now().to_rfc3339(),
                    ],
                )
                .map_err(|e| VisibilityError::Storage(format!("failed to hide entity: {e}")))?;
            }
        }
        self.write_immediate_exclusions(user, entity_type, entity);
        Ok(())
    }

    /// Best-effort rows keeping reads consistent until the next full
    /// recompute: the hidden entity itself, plus cascade rows for items
    /// that reference only the hidden performer. Failures here are
    /// logged, never raised; the next recompute reconciles everything.
    fn write_immediate_exclusions(&self, user: UserId, entity_type: EntityType, entity: &EntityRef) {
        {
            let conn = self.db.conn();
            if let Err(e) = insert_if_absent_on(
                &conn,
                user,
                entity_type,
                entity,
                ExclusionReason::Hidden,
                Utc::now(),
            ) {
                warn!("failed to write immediate exclusion for {entity}: {e}");
            }
        }

        if entity_type != EntityType::Performer {
            return;
        }
        let Some(catalog) = &self.catalog else {
            return;
        };

        for (container_type, inverse) in PERFORMER_CONTAINERS {
            let containers = match catalog.related_ids(EntityType::Performer, entity, inverse) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("catalog lookup for immediate cascade failed: {e}");
                    continue;
                }
            };
            for container in containers {
                let performers =
                    match catalog.related_ids(container_type, &container, Relation::Performers) {
                        Ok(ids) => ids,
                        Err(e) => {
                            warn!("catalog lookup for immediate cascade failed: {e}");
                            continue;
                        }
                    };
                // Only containers whose sole performer is the hidden one
                if performers.is_empty() || performers.iter().any(|p| p != entity) {
                    continue;
                }
                let conn = self.db.conn();
                match insert_if_absent_on(
                    &conn,
                    user,
                    container_type,
                    &container,
                    ExclusionReason::Cascade,
                    Utc::now(),
                ) {
                    Ok(true) => debug!("immediate cascade row for {container_type} {container}"),
                    Ok(false) => {}
                    Err(e) => warn!("failed to write immediate cascade row: {e}"),
                }
            }
        }
    }

    /// Unhides an entity. Returns whether a record was removed.
    pub fn unhide(
        &self,
        user: UserId,
        entity_type: EntityType,
        entity: &EntityRef,
    ) -> VisibilityResult<bool> {
        let conn = self.db.conn();
        let removed = conn
            .execute(
                "DELETE FROM hidden_entities
                 WHERE user_id = ?1 AND entity_type = ?2 AND instance = ?3 AND entity_id = ?4",
                params![
                    user.as_i64(),
                    entity_type.as_str(),
                    entity.instance.as_str(),
                    entity.id
                ],
            )
            .map_err(|e| VisibilityError::Storage(format!("failed to unhide entity: {e}")))?;
        Ok(removed > 0)
    }

    /// Removes all hidden records for a user, optionally one type only.
    /// Returns the number of records removed.
    pub fn unhide_all(
        &self,
        user: UserId,
        entity_type: Option<EntityType>,
    ) -> VisibilityResult<usize> {
        let conn = self.db.conn();
        let removed = match entity_type {
            Some(et) => conn.execute(
                "DELETE FROM hidden_entities WHERE user_id = ?1 AND entity_type = ?2",
                params![user.as_i64(), et.as_str()],
            ),
            None => conn.execute(
                "DELETE FROM hidden_entities WHERE user_id = ?1",
                params![user.as_i64()],
            ),
        }
        .map_err(|e| VisibilityError::Storage(format!("failed to unhide entities: {e}")))?;
        Ok(removed)
    }

    /// Validates the whole batch shape up front, then hides each item
    /// independently. An unknown entity type anywhere rejects the whole
    /// request; a failing individual hide only increments `fail_count`.
    pub fn bulk_hide(
        &self,
        user: UserId,
        items: &[BulkHideItem],
    ) -> VisibilityResult<BulkHideOutcome> {
        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            let entity_type: EntityType = item.entity_type.parse()?;
            if item.entity_id.is_empty() {
                return Err(VisibilityError::Validation(
                    "entity_id must not be empty".to_string(),
                ));
            }
            let instance = item
                .instance
                .as_deref()
                .map(InstanceId::new)
                .unwrap_or_default();
            parsed.push((entity_type, EntityRef::new(instance, &item.entity_id)));
        }

        let mut outcome = BulkHideOutcome::default();
        for (entity_type, entity) in &parsed {
            match self.hide(user, *entity_type, entity) {
                Ok(()) => outcome.success_count += 1,
                Err(e) => {
                    warn!("bulk hide of {entity} failed: {e}");
                    outcome.fail_count += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Hidden records for a user, newest first.
    pub fn list_hidden(
        &self,
        user: UserId,
        entity_type: Option<EntityType>,
    ) -> VisibilityResult<Vec<HiddenEntity>> {
        let conn = self.db.conn();
        let mut query = String::from(
            "SELECT entity_type, instance, entity_id, hidden_at FROM hidden_entities
             WHERE user_id = ?1",
        );
        if entity_type.is_some() {
            query.push_str(" AND entity_type = ?2");
        }
        query.push_str(" ORDER BY hidden_at DESC, instance, entity_id");

        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| VisibilityError::Storage(format!("failed to prepare hidden query: {e}")))?;
        let map_row = |row: &rusqlite::Row<'_>| {
            let type_str: String = row.get(0)?;
            let instance: String = row.get(1)?;
            let id: String = row.get(2)?;
            let hidden_at: String = row.get(3)?;
            Ok((type_str, instance, id, hidden_at))
        };
        let rows: Vec<rusqlite::Result<(String, String, String, String)>> = match entity_type {
            Some(et) => stmt
                .query_map(params![user.as_i64(), et.as_str()], map_row)
                .map_err(|e| VisibilityError::Storage(format!("failed to query hidden: {e}")))?
                .collect(),
            None => stmt
                .query_map(params![user.as_i64()], map_row)
                .map_err(|e| VisibilityError::Storage(format!("failed to query hidden: {e}")))?
                .collect(),
        };

        let mut result = Vec::new();
        for row in rows {
            let (type_str, instance, id, hidden_str) =
                row.map_err(|e| VisibilityError::Storage(format!("failed to read hidden row: {e}")))?;
            let entity_type: EntityType = type_str
                .parse()
                .map_err(|e| VisibilityError::Storage(format!("corrupt hidden row: {e}")))?;
            result.push(HiddenEntity {
                entity_type,
                entity: EntityRef::new(InstanceId::new(instance), id),
                hidden_at: parse_timestamp(&hidden_str)?,
            });
        }
        Ok(result)
    }

    /// Hidden IDs grouped by entity type, for the recompute pass.
    pub fn ids_by_type(
        &self,
        user: UserId,
    ) -> VisibilityResult<HashMap<EntityType, HashSet<EntityRef>>> {
        let mut result: HashMap<EntityType, HashSet<EntityRef>> = HashMap::new();
        for record in self.list_hidden(user, None)? {
            result
                .entry(record.entity_type)
                .or_default()
                .insert(record.entity);
        }
        Ok(result)
    }
}
