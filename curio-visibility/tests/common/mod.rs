use curio_catalog::MemoryCatalog;
use curio_types::{EntityRef, EntityType, RestrictionMode, UserId};
use curio_visibility::{
    ExclusionComputer, ExclusionStore, HiddenEntityManager, RestrictionRule, RuleStore,
    VisibilityDb,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct TestEngine {
    pub catalog: Arc<MemoryCatalog>,
    pub rules: RuleStore,
    pub hidden: HiddenEntityManager,
    pub exclusions: ExclusionStore,
    pub computer: Arc<ExclusionComputer>,
}

/// Fresh in-memory engine wired to an in-memory catalog.
pub fn engine() -> TestEngine {
    let db = VisibilityDb::open_in_memory().unwrap();
    let catalog = Arc::new(MemoryCatalog::new());
    let rules = RuleStore::new(db.clone());
    let hidden = HiddenEntityManager::with_catalog(db.clone(), catalog.clone());
    let exclusions = ExclusionStore::new(db.clone());
    let computer = Arc::new(ExclusionComputer::new(
        catalog.clone(),
        catalog.clone(),
        rules.clone(),
        hidden.clone(),
        exclusions.clone(),
    ));
    TestEngine {
        catalog,
        rules,
        hidden,
        exclusions,
        computer,
    }
}

pub const USER: UserId = UserId::new(1);

pub fn refs(ids: &[&str]) -> BTreeSet<EntityRef> {
    ids.iter().map(|id| EntityRef::local(*id)).collect()
}

pub fn rule(
    entity_type: EntityType,
    mode: RestrictionMode,
    ids: &[&str],
    restrict_empty: bool,
) -> RestrictionRule {
    RestrictionRule {
        entity_type,
        mode,
        entity_ids: refs(ids),
        restrict_empty,
    }
}

/// Seeds five local tags T1..T5 and registers the default user.
pub fn seed_tags(engine: &TestEngine) {
    engine.catalog.add_user(USER);
    engine.catalog.add_entities(
        EntityType::Tag,
        ["t1", "t2", "t3", "t4", "t5"].map(EntityRef::local),
    );
}
