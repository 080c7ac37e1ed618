//! Catalog over the SQLite mirror database.
//!
//! The sync pipeline owns the mirror tables; this catalog only reads
//! them. Schema creation is idempotent so tests and fresh deployments
//! can start from an empty file.

use crate::{CatalogError, CatalogResult, EntityCatalog, UserDirectory};
use curio_types::{EntityRef, EntityType, InstanceId, Relation, UserId};
use rusqlite::{Connection, params};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Entity catalog backed by the mirror SQLite database.
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// Opens (or creates) the mirror catalog at the given path.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| CatalogError::Storage(format!("failed to open mirror: {e}")))?;
        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        catalog.init_schema()?;
        debug!("opened mirror catalog at {}", path.display());
        Ok(catalog)
    }

    /// Opens an in-memory mirror catalog (for testing).
    pub fn open_in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CatalogError::Storage(format!("failed to open in-memory mirror: {e}")))?;
        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    fn init_schema(&self) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS mirror_entities (
                instance TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                UNIQUE(instance, entity_type, entity_id)
            );

            CREATE INDEX IF NOT EXISTS idx_mirror_entities_type
                ON mirror_entities(entity_type);

            CREATE TABLE IF NOT EXISTS mirror_relations (
                source_type TEXT NOT NULL,
                source_instance TEXT NOT NULL,
                source_id TEXT NOT NULL,
                relation TEXT NOT NULL,
                target_instance TEXT NOT NULL,
                target_id TEXT NOT NULL,
                UNIQUE(source_type, source_instance, source_id, relation, target_instance, target_id)
            );

            CREATE INDEX IF NOT EXISTS idx_mirror_relations_source
                ON mirror_relations(source_type, relation);

            CREATE TABLE IF NOT EXISTS mirror_users (
                user_id INTEGER PRIMARY KEY
            );
            ",
        )
        .map_err(|e| CatalogError::Storage(format!("failed to init mirror schema: {e}")))?;
        Ok(())
    }

    // ── Mirror maintenance (used by tests and tooling) ───────────

    pub fn add_entity(&self, entity_type: EntityType, entity: &EntityRef) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO mirror_entities (instance, entity_type, entity_id) VALUES (?1, ?2, ?3)",
            params![entity.instance.as_str(), entity_type.as_str(), entity.id],
        )
        .map_err(|e| CatalogError::Storage(format!("failed to add entity: {e}")))?;
        Ok(())
    }

    pub fn relate(
        &self,
        entity_type: EntityType,
        source: &EntityRef,
        relation: Relation,
        target: &EntityRef,
    ) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO mirror_relations
             (source_type, source_instance, source_id, relation, target_instance, target_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entity_type.as_str(),
                source.instance.as_str(),
                source.id,
                relation.as_str(),
                target.instance.as_str(),
                target.id,
            ],
        )
        .map_err(|e| CatalogError::Storage(format!("failed to add relation: {e}")))?;
        Ok(())
    }

    pub fn add_user(&self, user: UserId) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO mirror_users (user_id) VALUES (?1)",
            params![user.as_i64()],
        )
        .map_err(|e| CatalogError::Storage(format!("failed to add user: {e}")))?;
        Ok(())
    }
}

impl EntityCatalog for SqliteCatalog {
    fn all_ids(&self, entity_type: EntityType) -> CatalogResult<HashSet<EntityRef>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT instance, entity_id FROM mirror_entities WHERE entity_type = ?1")
            .map_err(|e| CatalogError::Unavailable(format!("{e}")))?;
        let rows = stmt
            .query_map(params![entity_type.as_str()], |row| {
                let instance: String = row.get(0)?;
                let id: String = row.get(1)?;
                Ok(EntityRef::new(InstanceId::new(instance), id))
            })
            .map_err(|e| CatalogError::Unavailable(format!("{e}")))?;

        let mut result = HashSet::new();
        for row in rows {
            result.insert(row.map_err(|e| CatalogError::Unavailable(format!("{e}")))?);
        }
        Ok(result)
    }

    fn related_ids(
        &self,
        entity_type: EntityType,
        entity: &EntityRef,
        relation: Relation,
    ) -> CatalogResult<HashSet<EntityRef>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT target_instance, target_id FROM mirror_relations
                 WHERE source_type = ?1 AND source_instance = ?2 AND source_id = ?3 AND relation = ?4",
            )
            .map_err(|e| CatalogError::Storage(format!("{e}")))?;
        let rows = stmt
            .query_map(
                params![
                    entity_type.as_str(),
                    entity.instance.as_str(),
                    entity.id,
                    relation.as_str()
                ],
                |row| {
                    let instance: String = row.get(0)?;
                    let id: String = row.get(1)?;
                    Ok(EntityRef::new(InstanceId::new(instance), id))
                },
            )
            .map_err(|e| CatalogError::Storage(format!("{e}")))?;

        let mut result = HashSet::new();
        for row in rows {
            result.insert(row.map_err(|e| CatalogError::Storage(format!("{e}")))?);
        }
        Ok(result)
    }

    /// One scan per (type, relation), filtered against the candidate set
    /// in memory.
    fn related_ids_for(
        &self,
        entity_type: EntityType,
        entities: &HashSet<EntityRef>,
        relation: Relation,
    ) -> CatalogResult<HashMap<EntityRef, HashSet<EntityRef>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT source_instance, source_id, target_instance, target_id
                 FROM mirror_relations WHERE source_type = ?1 AND relation = ?2",
            )
            .map_err(|e| CatalogError::Storage(format!("{e}")))?;
        let rows = stmt
            .query_map(params![entity_type.as_str(), relation.as_str()], |row| {
                let si: String = row.get(0)?;
                let sid: String = row.get(1)?;
                let ti: String = row.get(2)?;
                let tid: String = row.get(3)?;
                Ok((
                    EntityRef::new(InstanceId::new(si), sid),
                    EntityRef::new(InstanceId::new(ti), tid),
                ))
            })
            .map_err(|e| CatalogError::Storage(format!("{e}")))?;

        let mut result: HashMap<EntityRef, HashSet<EntityRef>> = HashMap::new();
        for row in rows {
            let (source, target) = row.map_err(|e| CatalogError::Storage(format!("{e}")))?;
            if entities.contains(&source) {
                result.entry(source).or_default().insert(target);
            }
        }
        Ok(result)
    }
}

impl UserDirectory for SqliteCatalog {
    fn user_exists(&self, user: UserId) -> CatalogResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM mirror_users WHERE user_id = ?1",
                params![user.as_i64()],
                |row| row.get(0),
            )
            .map_err(|e| CatalogError::Storage(format!("{e}")))?;
        Ok(count > 0)
    }

    fn all_user_ids(&self) -> CatalogResult<Vec<UserId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT user_id FROM mirror_users ORDER BY user_id")
            .map_err(|e| CatalogError::Storage(format!("{e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                Ok(UserId::new(id))
            })
            .map_err(|e| CatalogError::Storage(format!("{e}")))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| CatalogError::Storage(format!("{e}")))?);
        }
        Ok(result)
    }
}
