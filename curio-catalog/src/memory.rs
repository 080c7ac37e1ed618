//! In-memory catalog for tests and single-process tooling.

use crate::{CatalogError, CatalogResult, EntityCatalog, UserDirectory};
use curio_types::{EntityRef, EntityType, Relation, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    entities: HashMap<EntityType, HashSet<EntityRef>>,
    relations: HashMap<(EntityType, Relation), HashMap<EntityRef, HashSet<EntityRef>>>,
    users: HashSet<UserId>,
    failing_types: HashSet<EntityType>,
}

/// Catalog backed by plain hash maps.
///
/// Mutators take `&self` so a populated catalog can sit behind an `Arc`
/// and still be adjusted mid-test. `fail_type` makes enumeration of one
/// entity type return [`CatalogError::Unavailable`], which is how the
/// recompute failure paths are exercised.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&self, entity_type: EntityType, entity: EntityRef) {
        let mut inner = self.inner.lock().unwrap();
        inner.entities.entry(entity_type).or_default().insert(entity);
    }

    pub fn add_entities<I>(&self, entity_type: EntityType, entities: I)
    where
        I: IntoIterator<Item = EntityRef>,
    {
        let mut inner = self.inner.lock().unwrap();
        inner
            .entities
            .entry(entity_type)
            .or_default()
            .extend(entities);
    }

    /// Records a relation edge from `source` to `target`.
    pub fn relate(
        &self,
        entity_type: EntityType,
        source: EntityRef,
        relation: Relation,
        target: EntityRef,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .relations
            .entry((entity_type, relation))
            .or_default()
            .entry(source)
            .or_default()
            .insert(target);
    }

    pub fn add_user(&self, user: UserId) {
        self.inner.lock().unwrap().users.insert(user);
    }

    /// Makes `all_ids` for the given type fail with `Unavailable`.
    pub fn fail_type(&self, entity_type: EntityType) {
        self.inner.lock().unwrap().failing_types.insert(entity_type);
    }

    /// Clears a failure injected with [`MemoryCatalog::fail_type`].
    pub fn restore_type(&self, entity_type: EntityType) {
        self.inner.lock().unwrap().failing_types.remove(&entity_type);
    }
}

impl EntityCatalog for MemoryCatalog {
    fn all_ids(&self, entity_type: EntityType) -> CatalogResult<HashSet<EntityRef>> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_types.contains(&entity_type) {
            return Err(CatalogError::Unavailable(format!(
                "enumeration of {entity_type} failed"
            )));
        }
        Ok(inner.entities.get(&entity_type).cloned().unwrap_or_default())
    }

    fn related_ids(
        &self,
        entity_type: EntityType,
        entity: &EntityRef,
        relation: Relation,
    ) -> CatalogResult<HashSet<EntityRef>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .relations
            .get(&(entity_type, relation))
            .and_then(|m| m.get(entity))
            .cloned()
            .unwrap_or_default())
    }

    fn related_ids_for(
        &self,
        entity_type: EntityType,
        entities: &HashSet<EntityRef>,
        relation: Relation,
    ) -> CatalogResult<HashMap<EntityRef, HashSet<EntityRef>>> {
        let inner = self.inner.lock().unwrap();
        let Some(edges) = inner.relations.get(&(entity_type, relation)) else {
            return Ok(HashMap::new());
        };
        Ok(edges
            .iter()
            .filter(|(source, targets)| entities.contains(*source) && !targets.is_empty())
            .map(|(source, targets)| (source.clone(), targets.clone()))
            .collect())
    }
}

impl UserDirectory for MemoryCatalog {
    fn user_exists(&self, user: UserId) -> CatalogResult<bool> {
        Ok(self.inner.lock().unwrap().users.contains(&user))
    }

    fn all_user_ids(&self) -> CatalogResult<Vec<UserId>> {
        let inner = self.inner.lock().unwrap();
        let mut users: Vec<UserId> = inner.users.iter().copied().collect();
        users.sort();
        Ok(users)
    }
}
