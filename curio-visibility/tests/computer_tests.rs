mod common;

use common::{USER, engine, refs, rule, seed_tags};
use curio_types::{EntityRef, EntityType, ExclusionReason, Relation, RestrictionMode, UserId};
use curio_visibility::{ComputeConfig, ExclusionComputer, StatsAggregator, VisibilityError};
use std::collections::HashSet;
use std::time::Duration;

// ── Rule-derived exclusions ──────────────────────────────────────

#[test]
fn include_rule_excludes_complement() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &["t1", "t2"], false)])
        .unwrap();

    e.computer.recompute_user(USER).unwrap();

    let excluded = e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap();
    let expected: HashSet<EntityRef> = refs(&["t3", "t4", "t5"]).into_iter().collect();
    assert_eq!(excluded, expected);

    let stats = StatsAggregator::new(e.exclusions.clone());
    let rows = stats.exclusion_stats().unwrap();
    assert!(rows.iter().any(|s| {
        s.user_id == USER
            && s.entity_type == EntityType::Tag
            && s.reason == ExclusionReason::Restricted
            && s.count == 3
    }));
}

#[test]
fn empty_include_rule_excludes_everything() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &[], false)])
        .unwrap();

    e.computer.recompute_user(USER).unwrap();

    assert_eq!(e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap().len(), 5);
    let stats = StatsAggregator::new(e.exclusions.clone());
    let visible = stats.visible_counts(USER).unwrap();
    let tag_row = visible
        .iter()
        .find(|row| row.entity_type == EntityType::Tag)
        .unwrap();
    assert_eq!(tag_row.visible_count, 0);
}

#[test]
fn exclude_rule_excludes_only_denylist() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Exclude, &["t4"], false)])
        .unwrap();

    e.computer.recompute_user(USER).unwrap();

    let excluded = e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap();
    assert_eq!(excluded, HashSet::from([EntityRef::local("t4")]));

    let stats = StatsAggregator::new(e.exclusions.clone());
    let visible = stats.visible_counts(USER).unwrap();
    let tag_row = visible
        .iter()
        .find(|row| row.entity_type == EntityType::Tag)
        .unwrap();
    assert_eq!(tag_row.visible_count, 4);
}

// ── Hidden entities ──────────────────────────────────────────────

#[test]
fn hidden_entities_survive_recompute() {
    let e = engine();
    seed_tags(&e);
    e.hidden.hide(USER, EntityType::Tag, &EntityRef::local("t3")).unwrap();

    e.computer.recompute_user(USER).unwrap();

    let rows = e.exclusions.rows_for_type(USER, EntityType::Tag).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity, EntityRef::local("t3"));
    assert_eq!(rows[0].reason, ExclusionReason::Hidden);
}

#[test]
fn hidden_reference_outside_catalog_is_kept() {
    let e = engine();
    seed_tags(&e);
    e.hidden
        .hide(USER, EntityType::MediaItem, &EntityRef::local("unsynced"))
        .unwrap();

    e.computer.recompute_user(USER).unwrap();

    let excluded = e.exclusions.excluded_ids(USER, EntityType::MediaItem).unwrap();
    assert!(excluded.contains(&EntityRef::local("unsynced")));
}

#[test]
fn restricted_wins_over_hidden() {
    let e = engine();
    seed_tags(&e);
    // t3 is both outside the allow-list and explicitly hidden
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &["t1"], false)])
        .unwrap();
    e.hidden.hide(USER, EntityType::Tag, &EntityRef::local("t3")).unwrap();

    e.computer.recompute_user(USER).unwrap();

    let rows = e.exclusions.rows_for_type(USER, EntityType::Tag).unwrap();
    let t3 = rows.iter().find(|r| r.entity == EntityRef::local("t3")).unwrap();
    assert_eq!(t3.reason, ExclusionReason::Restricted);
}

// ── Cascades ─────────────────────────────────────────────────────

#[test]
fn hidden_sole_performer_cascades_into_items() {
    let e = engine();
    e.catalog.add_user(USER);
    let p = EntityRef::local("p1");
    let s1 = EntityRef::local("s1");
    let s2 = EntityRef::local("s2");
    e.catalog.add_entity(EntityType::Performer, p.clone());
    e.catalog
        .add_entities(EntityType::MediaItem, [s1.clone(), s2.clone()]);
    e.catalog
        .relate(EntityType::MediaItem, s1.clone(), Relation::Performers, p.clone());
    e.catalog
        .relate(EntityType::MediaItem, s2.clone(), Relation::Performers, p.clone());

    e.hidden.hide(USER, EntityType::Performer, &p).unwrap();
    e.rules
        .set_rules(USER, &[rule(EntityType::MediaItem, RestrictionMode::Exclude, &[], true)])
        .unwrap();

    e.computer.recompute_user(USER).unwrap();

    let items = e.exclusions.rows_for_type(USER, EntityType::MediaItem).unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|r| r.reason == ExclusionReason::Cascade));

    let performers = e.exclusions.rows_for_type(USER, EntityType::Performer).unwrap();
    assert_eq!(performers.len(), 1);
    assert_eq!(performers[0].reason, ExclusionReason::Hidden);
}

#[test]
fn cascade_needs_restrict_empty() {
    let e = engine();
    e.catalog.add_user(USER);
    let p = EntityRef::local("p1");
    let s1 = EntityRef::local("s1");
    e.catalog.add_entity(EntityType::Performer, p.clone());
    e.catalog.add_entity(EntityType::MediaItem, s1.clone());
    e.catalog
        .relate(EntityType::MediaItem, s1.clone(), Relation::Performers, p.clone());
    e.hidden.hide(USER, EntityType::Performer, &p).unwrap();

    // No media_item rule with restrict_empty: nothing cascades
    e.computer.recompute_user(USER).unwrap();
    assert!(e
        .exclusions
        .excluded_ids(USER, EntityType::MediaItem)
        .unwrap()
        .is_empty());
}

#[test]
fn cascade_reaches_collections_transitively() {
    let e = engine();
    e.catalog.add_user(USER);
    let p = EntityRef::local("p1");
    let s1 = EntityRef::local("s1");
    let c1 = EntityRef::local("c1");
    e.catalog.add_entity(EntityType::Performer, p.clone());
    e.catalog.add_entity(EntityType::MediaItem, s1.clone());
    e.catalog.add_entity(EntityType::SceneCollection, c1.clone());
    e.catalog
        .relate(EntityType::MediaItem, s1.clone(), Relation::Performers, p.clone());
    e.catalog
        .relate(EntityType::SceneCollection, c1.clone(), Relation::MediaItems, s1.clone());

    e.hidden.hide(USER, EntityType::Performer, &p).unwrap();
    e.rules
        .set_rules(
            USER,
            &[
                rule(EntityType::MediaItem, RestrictionMode::Exclude, &[], true),
                rule(EntityType::SceneCollection, RestrictionMode::Exclude, &[], true),
            ],
        )
        .unwrap();

    e.computer.recompute_user(USER).unwrap();

    let collections = e
        .exclusions
        .rows_for_type(USER, EntityType::SceneCollection)
        .unwrap();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].reason, ExclusionReason::Cascade);
}

// ── Idempotence and lifecycle ────────────────────────────────────

#[test]
fn recompute_is_idempotent() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &["t1", "t2"], false)])
        .unwrap();
    e.hidden.hide(USER, EntityType::Tag, &EntityRef::local("t1")).unwrap();

    e.computer.recompute_user(USER).unwrap();
    let first: Vec<_> = e
        .exclusions
        .rows_for_type(USER, EntityType::Tag)
        .unwrap()
        .into_iter()
        .map(|r| (r.entity, r.reason))
        .collect();

    e.computer.recompute_user(USER).unwrap();
    let second: Vec<_> = e
        .exclusions
        .rows_for_type(USER, EntityType::Tag)
        .unwrap()
        .into_iter()
        .map(|r| (r.entity, r.reason))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn deleting_rules_leaves_only_hidden_after_recompute() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &["t1"], false)])
        .unwrap();
    e.hidden.hide(USER, EntityType::Tag, &EntityRef::local("t2")).unwrap();
    e.computer.recompute_user(USER).unwrap();
    assert_eq!(e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap().len(), 4);

    e.rules.delete_rules(USER).unwrap();
    e.computer.recompute_user(USER).unwrap();

    let rows = e.exclusions.rows_for_type(USER, EntityType::Tag).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity, EntityRef::local("t2"));
    assert_eq!(rows[0].reason, ExclusionReason::Hidden);
}

#[test]
fn rule_writes_do_not_touch_exclusions_until_recompute() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &[], false)])
        .unwrap();

    // No recompute yet
    assert!(e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap().is_empty());
}

// ── Failure semantics ────────────────────────────────────────────

#[test]
fn unknown_user_is_not_found() {
    let e = engine();
    let err = e.computer.recompute_user(UserId::new(99)).unwrap_err();
    assert!(matches!(err, VisibilityError::NotFound(_)));
}

#[test]
fn catalog_failure_preserves_prior_snapshot() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &["t1"], false)])
        .unwrap();
    e.computer.recompute_user(USER).unwrap();
    let before = e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap();
    assert_eq!(before.len(), 4);

    // Inputs change, then the catalog starts failing for one type
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &[], false)])
        .unwrap();
    e.catalog.fail_type(EntityType::Studio);

    let err = e.computer.recompute_user(USER).unwrap_err();
    assert!(matches!(err, VisibilityError::Catalog(_)));
    assert_eq!(e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap(), before);
}

#[test]
fn expired_deadline_commits_nothing() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &[], false)])
        .unwrap();

    let strict = ExclusionComputer::with_config(
        e.catalog.clone(),
        e.catalog.clone(),
        e.rules.clone(),
        e.hidden.clone(),
        e.exclusions.clone(),
        ComputeConfig {
            deadline: Duration::ZERO,
        },
    );

    let err = strict.recompute_user(USER).unwrap_err();
    assert!(matches!(err, VisibilityError::Timeout));
    assert!(e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap().is_empty());
}

// ── Stats consistency ────────────────────────────────────────────

#[test]
fn reason_counts_sum_to_exclusion_count() {
    let e = engine();
    seed_tags(&e);
    e.rules
        .set_rules(USER, &[rule(EntityType::Tag, RestrictionMode::Include, &["t1", "t2"], false)])
        .unwrap();
    e.hidden.hide(USER, EntityType::Tag, &EntityRef::local("t2")).unwrap();
    e.hidden.hide(USER, EntityType::Tag, &EntityRef::local("t5")).unwrap();

    e.computer.recompute_user(USER).unwrap();

    let stats = StatsAggregator::new(e.exclusions.clone());
    let total: u64 = stats
        .exclusion_stats()
        .unwrap()
        .iter()
        .filter(|s| s.user_id == USER && s.entity_type == EntityType::Tag)
        .map(|s| s.count)
        .sum();
    let excluded = e.exclusions.excluded_ids(USER, EntityType::Tag).unwrap();
    assert_eq!(total, excluded.len() as u64);
}
