//! Shared SQLite handle for the visibility stores.
//!
//! Rules, hidden entities, exclusions, and stats live in one database
//! file so per-type replaces and rule rewrites are single transactions.
//! Each store holds a clone of [`VisibilityDb`] and serializes access
//! through the shared connection mutex.

use crate::{VisibilityError, VisibilityResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle to the visibility database.
#[derive(Clone)]
pub struct VisibilityDb {
    conn: Arc<Mutex<Connection>>,
}

impl VisibilityDb {
    /// Opens (or creates) the visibility database at the given path.
    pub fn open(path: &Path) -> VisibilityResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| VisibilityError::Storage(format!("failed to open visibility db: {e}")))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Opens an in-memory visibility database (for testing).
    pub fn open_in_memory() -> VisibilityResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            VisibilityError::Storage(format!("failed to open in-memory visibility db: {e}"))
        })?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> VisibilityResult<()> {
        let conn = self.conn();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS restriction_rules (
                user_id INTEGER NOT NULL,
                entity_type TEXT NOT NULL,
                mode TEXT NOT NULL,
                restrict_empty INTEGER NOT NULL DEFAULT 0,
                entity_ids TEXT NOT NULL,
                UNIQUE(user_id, entity_type)
            );

            CREATE TABLE IF NOT EXISTS hidden_entities (
                user_id INTEGER NOT NULL,
                entity_type TEXT NOT NULL,
                instance TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                hidden_at TEXT NOT NULL,
                UNIQUE(user_id, entity_type, instance, entity_id)
            );

            CREATE TABLE IF NOT EXISTS excluded_entities (
                user_id INTEGER NOT NULL,
                entity_type TEXT NOT NULL,
                instance TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                reason TEXT NOT NULL,
                computed_at TEXT NOT NULL,
                UNIQUE(user_id, entity_type, instance, entity_id)
            );

            CREATE INDEX IF NOT EXISTS idx_excluded_user_type
                ON excluded_entities(user_id, entity_type);

            CREATE TABLE IF NOT EXISTS entity_stats (
                user_id INTEGER NOT NULL,
                entity_type TEXT NOT NULL,
                visible_count INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(user_id, entity_type)
            );
            ",
        )
        .map_err(|e| VisibilityError::Storage(format!("failed to init visibility schema: {e}")))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
