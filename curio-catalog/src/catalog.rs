//! The traits the visibility engine consumes.

use crate::CatalogResult;
use curio_types::{EntityRef, EntityType, Relation, UserId};
use std::collections::{HashMap, HashSet};

/// Enumerates mirrored entities and their relationships.
///
/// Implementations are called from blocking recompute passes, so the
/// methods are synchronous. They must be safe to call from several
/// recompute workers at once.
pub trait EntityCatalog: Send + Sync {
    /// All known IDs of one entity type, across every mirrored instance.
    fn all_ids(&self, entity_type: EntityType) -> CatalogResult<HashSet<EntityRef>>;

    /// IDs related to one entity through the given relation.
    fn related_ids(
        &self,
        entity_type: EntityType,
        entity: &EntityRef,
        relation: Relation,
    ) -> CatalogResult<HashSet<EntityRef>>;

    /// Related IDs for a whole set of entities in one pass.
    ///
    /// The cascade resolver asks "does E still have a non-excluded
    /// related entity" for every container of a type at once; backends
    /// should answer with one scan per (type, relation) instead of a
    /// per-entity query. Entities with no related IDs are absent from
    /// the returned map.
    fn related_ids_for(
        &self,
        entity_type: EntityType,
        entities: &HashSet<EntityRef>,
        relation: Relation,
    ) -> CatalogResult<HashMap<EntityRef, HashSet<EntityRef>>> {
        let mut out = HashMap::new();
        for entity in entities {
            let related = self.related_ids(entity_type, entity, relation)?;
            if !related.is_empty() {
                out.insert(entity.clone(), related);
            }
        }
        Ok(out)
    }
}

/// Enumerates the users the mirror knows about.
pub trait UserDirectory: Send + Sync {
    fn user_exists(&self, user: UserId) -> CatalogResult<bool>;

    fn all_user_ids(&self) -> CatalogResult<Vec<UserId>>;
}
