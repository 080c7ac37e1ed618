use std::sync::Arc;

use curio_catalog::MemoryCatalog;
use curio_server::auth::{ROLE_HEADER, USER_HEADER};
use curio_server::{AppState, build_router};
use curio_types::{EntityRef, EntityType, UserId};
use curio_visibility::{
    ExclusionComputer, ExclusionStore, HiddenEntityManager, RecomputeCoordinator, RuleStore,
    StatsAggregator, VisibilityDb,
};
use serde_json::{Value, json};

/// Spin up the API over an in-memory engine, returning the base URL.
///
/// The catalog knows user 1 and tags t1..t5.
async fn spawn_test_server() -> String {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.add_user(UserId::new(1));
    for id in ["t1", "t2", "t3", "t4", "t5"] {
        catalog.add_entity(EntityType::Tag, EntityRef::local(id));
    }

    let db = VisibilityDb::open_in_memory().unwrap();
    let computer = Arc::new(ExclusionComputer::new(
        catalog.clone(),
        catalog.clone(),
        RuleStore::new(db.clone()),
        HiddenEntityManager::with_catalog(db.clone(), catalog.clone()),
        ExclusionStore::new(db.clone()),
    ));
    let state = Arc::new(AppState {
        rules: RuleStore::new(db.clone()),
        hidden: HiddenEntityManager::with_catalog(db.clone(), catalog.clone()),
        exclusions: ExclusionStore::new(db.clone()),
        stats: StatsAggregator::new(ExclusionStore::new(db.clone())),
        coordinator: RecomputeCoordinator::new(computer, catalog),
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

// ── Principal handling ───────────────────────────────────────────

#[tokio::test]
async fn missing_principal_is_401() {
    let base = spawn_test_server().await;
    let resp = client()
        .get(format!("{}/api/v1/hidden-entities", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn non_admin_on_admin_route_is_403() {
    let base = spawn_test_server().await;
    let resp = client()
        .get(format!("{}/api/v1/restrictions/1", base))
        .header(USER_HEADER, "1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn admin_header_grants_admin_routes() {
    let base = spawn_test_server().await;
    let resp = client()
        .get(format!("{}/api/v1/stats", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

// ── Validation at the boundary ───────────────────────────────────

#[tokio::test]
async fn put_restrictions_rejects_unknown_entity_type() {
    let base = spawn_test_server().await;
    let body = json!({
        "restrictions": [
            { "entityType": "widget", "mode": "EXCLUDE", "entityIds": [] }
        ]
    });
    let resp = client()
        .put(format!("{}/api/v1/restrictions/1", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn put_restrictions_rejects_unknown_mode() {
    let base = spawn_test_server().await;
    let body = json!({
        "restrictions": [
            { "entityType": "tag", "mode": "ALLOW", "entityIds": [] }
        ]
    });
    let resp = client()
        .put(format!("{}/api/v1/restrictions/1", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn recompute_rejects_non_numeric_user_id() {
    let base = spawn_test_server().await;
    let resp = client()
        .post(format!("{}/api/v1/recompute/alice", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn recompute_unknown_user_is_404() {
    let base = spawn_test_server().await;
    let resp = client()
        .post(format!("{}/api/v1/recompute/99", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ── Restriction rules end to end ─────────────────────────────────

#[tokio::test]
async fn put_recompute_stats_flow() {
    let base = spawn_test_server().await;
    let c = client();

    let body = json!({
        "restrictions": [
            { "entityType": "tag", "mode": "INCLUDE", "entityIds": ["t1", "t2"] }
        ]
    });
    let resp = c
        .put(format!("{}/api/v1/restrictions/1", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = c
        .post(format!("{}/api/v1/recompute/1", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // t3, t4, t5 fall outside the allowlist.
    let resp = c
        .get(format!("{}/api/v1/stats", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    let stats: Value = resp.json().await.unwrap();
    let rows = stats.as_array().unwrap();
    let tag_row = rows
        .iter()
        .find(|row| row["entityType"] == "tag" && row["reason"] == "restricted")
        .expect("expected a restricted tag stats row");
    assert_eq!(tag_row["count"], 3);
}

#[tokio::test]
async fn restrictions_round_trip_and_delete() {
    let base = spawn_test_server().await;
    let c = client();

    let body = json!({
        "restrictions": [
            { "entityType": "tag", "mode": "EXCLUDE", "entityIds": ["t5"], "restrictEmpty": true }
        ]
    });
    c.put(format!("{}/api/v1/restrictions/1", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .json(&body)
        .send()
        .await
        .unwrap();

    let resp = c
        .get(format!("{}/api/v1/restrictions/1", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    let fetched: Value = resp.json().await.unwrap();
    let rules = fetched["restrictions"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["entityType"], "tag");
    assert_eq!(rules[0]["mode"], "EXCLUDE");
    assert_eq!(rules[0]["restrictEmpty"], true);

    let resp = c
        .delete(format!("{}/api/v1/restrictions/1", base))
        .header(USER_HEADER, "1")
        .header(ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    let removed: Value = resp.json().await.unwrap();
    assert_eq!(removed["removed"], 1);
}

// ── Hidden entities ──────────────────────────────────────────────

#[tokio::test]
async fn hide_list_unhide_flow() {
    let base = spawn_test_server().await;
    let c = client();

    let resp = c
        .post(format!("{}/api/v1/hidden-entities", base))
        .header(USER_HEADER, "1")
        .json(&json!({ "entityType": "tag", "entityId": "t1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = c
        .get(format!("{}/api/v1/hidden-entities?entityType=tag", base))
        .header(USER_HEADER, "1")
        .send()
        .await
        .unwrap();
    let listed: Value = resp.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let resp = c
        .delete(format!("{}/api/v1/hidden-entities/tag/t1", base))
        .header(USER_HEADER, "1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Gone now.
    let resp = c
        .delete(format!("{}/api/v1/hidden-entities/tag/t1", base))
        .header(USER_HEADER, "1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn hide_rejects_unknown_type_and_empty_id() {
    let base = spawn_test_server().await;
    let c = client();

    let resp = c
        .post(format!("{}/api/v1/hidden-entities", base))
        .header(USER_HEADER, "1")
        .json(&json!({ "entityType": "widget", "entityId": "t1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = c
        .post(format!("{}/api/v1/hidden-entities", base))
        .header(USER_HEADER, "1")
        .json(&json!({ "entityType": "tag", "entityId": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn bulk_hide_counts_successes() {
    let base = spawn_test_server().await;
    let c = client();

    let body = json!({
        "items": [
            { "entityType": "tag", "entityId": "t1" },
            { "entityType": "tag", "entityId": "t2" },
            { "entityType": "performer", "entityId": "p1" }
        ]
    });
    let resp = c
        .post(format!("{}/api/v1/hidden-entities/bulk", base))
        .header(USER_HEADER, "1")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["successCount"], 3);
    assert_eq!(outcome["failCount"], 0);
}

#[tokio::test]
async fn bulk_hide_rejects_batch_with_unknown_type() {
    let base = spawn_test_server().await;
    let body = json!({
        "items": [
            { "entityType": "tag", "entityId": "t1" },
            { "entityType": "widget", "entityId": "x" }
        ]
    });
    let resp = client()
        .post(format!("{}/api/v1/hidden-entities/bulk", base))
        .header(USER_HEADER, "1")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn hidden_ids_groups_by_type() {
    let base = spawn_test_server().await;
    let c = client();

    for id in ["t1", "t2"] {
        c.post(format!("{}/api/v1/hidden-entities", base))
            .header(USER_HEADER, "1")
            .json(&json!({ "entityType": "tag", "entityId": id }))
            .send()
            .await
            .unwrap();
    }

    let resp = c
        .get(format!("{}/api/v1/hidden-entities/ids", base))
        .header(USER_HEADER, "1")
        .send()
        .await
        .unwrap();
    let grouped: Value = resp.json().await.unwrap();
    let tags = grouped["tag"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
}

#[tokio::test]
async fn unhide_all_clears_every_hidden_entity() {
    let base = spawn_test_server().await;
    let c = client();

    for id in ["t1", "t2", "t3"] {
        c.post(format!("{}/api/v1/hidden-entities", base))
            .header(USER_HEADER, "1")
            .json(&json!({ "entityType": "tag", "entityId": id }))
            .send()
            .await
            .unwrap();
    }

    let resp = c
        .delete(format!("{}/api/v1/hidden-entities/all", base))
        .header(USER_HEADER, "1")
        .send()
        .await
        .unwrap();
    let removed: Value = resp.json().await.unwrap();
    assert_eq!(removed["removed"], 3);

    let resp = c
        .get(format!("{}/api/v1/hidden-entities", base))
        .header(USER_HEADER, "1")
        .send()
        .await
        .unwrap();
    let listed: Value = resp.json().await.unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn hidden_entities_are_scoped_per_user() {
    let base = spawn_test_server().await;
    let c = client();

    c.post(format!("{}/api/v1/hidden-entities", base))
        .header(USER_HEADER, "1")
        .json(&json!({ "entityType": "tag", "entityId": "t1" }))
        .send()
        .await
        .unwrap();

    let resp = c
        .get(format!("{}/api/v1/hidden-entities", base))
        .header(USER_HEADER, "2")
        .send()
        .await
        .unwrap();
    let listed: Value = resp.json().await.unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}
