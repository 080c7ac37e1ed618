//! Cascade Resolver — second-order exclusions from structural emptiness.
//!
//! An entity cascades into exclusion when the set of related entities
//! that justified showing it existed and has become fully excluded. An
//! entity that never had related entities of a type is governed purely
//! by its own type's rule; it is never cascaded as "emptied".
//!
//! The resolver is a pure function over in-memory snapshots. It runs as
//! an explicit fixed-point loop rather than recursive calls: the
//! excluded set only grows, bounded by the total entity count, so
//! termination is immediate from monotonicity.

use curio_types::{EntityRef, EntityType, Relation};
use std::collections::{HashMap, HashSet};

/// Which relation empties which container type.
///
/// The container type's rule must carry `restrict_empty = true` for its
/// row here to fire.
pub const CASCADE_RULES: [(EntityType, Relation); 7] = [
    (EntityType::MediaItem, Relation::Performers),
    (EntityType::ImageItem, Relation::Performers),
    (EntityType::SceneCollection, Relation::MediaItems),
    (EntityType::ImageCollection, Relation::ImageItems),
    (EntityType::Performer, Relation::MediaItems),
    (EntityType::Studio, Relation::MediaItems),
    (EntityType::Tag, Relation::MediaItems),
];

/// Relation snapshots keyed by (container type, relation). Entries with
/// empty related sets must be absent; presence means "had related
/// entities".
pub type RelationSnapshot = HashMap<(EntityType, Relation), HashMap<EntityRef, HashSet<EntityRef>>>;

/// Derives the additional exclusions implied by structural emptiness.
///
/// `excluded` is the direct (rule- and hide-derived) membership per
/// type; the returned map holds only the cascade additions.
pub fn resolve_cascades(
    excluded: &HashMap<EntityType, HashSet<EntityRef>>,
    relations: &RelationSnapshot,
    restrict_empty: &HashSet<EntityType>,
) -> HashMap<EntityType, HashSet<EntityRef>> {
    let mut added: HashMap<EntityType, HashSet<EntityRef>> = HashMap::new();

    let is_excluded = |added: &HashMap<EntityType, HashSet<EntityRef>>,
                       entity_type: EntityType,
                       entity: &EntityRef| {
        excluded
            .get(&entity_type)
            .is_some_and(|set| set.contains(entity))
            || added
                .get(&entity_type)
                .is_some_and(|set| set.contains(entity))
    };

    loop {
        let mut changed = false;
        for (container_type, relation) in CASCADE_RULES {
            if !restrict_empty.contains(&container_type) {
                continue;
            }
            let Some(edges) = relations.get(&(container_type, relation)) else {
                continue;
            };
            let target_type = relation.target_type();

            let mut emptied = Vec::new();
            for (container, related) in edges {
                if related.is_empty() || is_excluded(&added, container_type, container) {
                    continue;
                }
                if related
                    .iter()
                    .all(|target| is_excluded(&added, target_type, target))
                {
                    emptied.push(container.clone());
                }
            }
            if !emptied.is_empty() {
                changed = true;
                added.entry(container_type).or_default().extend(emptied);
            }
        }
        if !changed {
            return added;
        }
    }
}
