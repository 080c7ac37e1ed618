//! Route handlers for the visibility API.

use crate::AppState;
use crate::auth::{AdminPrincipal, Principal};
use crate::dto::{BulkHideRequest, HideRequest, RestrictionRuleDto, RestrictionsBody, TypeFilter};
use crate::error::ApiError;
use axum::Json;
use axum::extract::{Path, Query, State};
use curio_types::{EntityRef, EntityType, InstanceId, UserId};
use curio_visibility::{
    BulkHideOutcome, ExclusionStat, HiddenEntity, RecomputeSummary,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse::<UserId>()
        .map_err(|_| ApiError::Validation(format!("invalid user id: {raw}")))
}

fn parse_entity_type(raw: &str) -> Result<EntityType, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::Validation(format!("{e}")))
}

// ── Admin: restriction rules ─────────────────────────────────────

pub async fn get_restrictions(
    _admin: AdminPrincipal,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<RestrictionsBody>, ApiError> {
    let user = parse_user_id(&user_id)?;
    let rules = state.rules.get_rules(user)?;
    Ok(Json(RestrictionsBody {
        restrictions: rules.iter().map(RestrictionRuleDto::from_rule).collect(),
    }))
}

pub async fn put_restrictions(
    _admin: AdminPrincipal,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<RestrictionsBody>,
) -> Result<Json<Value>, ApiError> {
    let user = parse_user_id(&user_id)?;
    let rules = body
        .restrictions
        .into_iter()
        .map(RestrictionRuleDto::into_rule)
        .collect::<Result<Vec<_>, _>>()?;
    state.rules.set_rules(user, &rules)?;
    Ok(Json(json!({ "updated": rules.len() })))
}

pub async fn delete_restrictions(
    _admin: AdminPrincipal,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = parse_user_id(&user_id)?;
    let removed = state.rules.delete_rules(user)?;
    Ok(Json(json!({ "removed": removed })))
}

// ── Admin: recompute and stats ───────────────────────────────────

pub async fn recompute_user(
    _admin: AdminPrincipal,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = parse_user_id(&user_id)?;
    state.coordinator.recompute_user(user).await?;
    Ok(Json(json!({ "recomputed": user })))
}

pub async fn recompute_all(
    _admin: AdminPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecomputeSummary>, ApiError> {
    Ok(Json(state.coordinator.recompute_all().await?))
}

pub async fn get_stats(
    _admin: AdminPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExclusionStat>>, ApiError> {
    Ok(Json(state.stats.exclusion_stats()?))
}

// ── User: hidden entities ────────────────────────────────────────

pub async fn hide_entity(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Json(body): Json<HideRequest>,
) -> Result<Json<Value>, ApiError> {
    let entity_type = parse_entity_type(&body.entity_type)?;
    if body.entity_id.is_empty() {
        return Err(ApiError::Validation("entityId must not be empty".to_string()));
    }
    let instance = body.instance.map(InstanceId::new).unwrap_or_default();
    let entity = EntityRef::new(instance, body.entity_id);
    state.hidden.hide(principal.user_id, entity_type, &entity)?;
    Ok(Json(json!({ "hidden": entity.to_string() })))
}

pub async fn bulk_hide(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkHideRequest>,
) -> Result<Json<BulkHideOutcome>, ApiError> {
    let outcome = state.hidden.bulk_hide(principal.user_id, &body.items)?;
    Ok(Json(outcome))
}

pub async fn list_hidden(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TypeFilter>,
) -> Result<Json<Vec<HiddenEntity>>, ApiError> {
    let entity_type = filter.parse()?;
    Ok(Json(state.hidden.list_hidden(principal.user_id, entity_type)?))
}

pub async fn hidden_ids(
    principal: Principal,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let grouped = state.hidden.ids_by_type(principal.user_id)?;
    let mut body = serde_json::Map::new();
    for (entity_type, ids) in grouped {
        let mut sorted: Vec<EntityRef> = ids.into_iter().collect();
        sorted.sort();
        body.insert(entity_type.to_string(), serde_json::to_value(sorted)?);
    }
    Ok(Json(Value::Object(body)))
}

pub async fn unhide_entity(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(filter): Query<InstanceFilter>,
) -> Result<Json<Value>, ApiError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let instance = filter.instance.map(InstanceId::new).unwrap_or_default();
    let entity = EntityRef::new(instance, entity_id);
    let removed = state.hidden.unhide(principal.user_id, entity_type, &entity)?;
    if !removed {
        return Err(ApiError::NotFound(format!("hidden entity {entity}")));
    }
    Ok(Json(json!({ "removed": entity.to_string() })))
}

pub async fn unhide_all(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TypeFilter>,
) -> Result<Json<Value>, ApiError> {
    let entity_type = filter.parse()?;
    let removed = state.hidden.unhide_all(principal.user_id, entity_type)?;
    Ok(Json(json!({ "removed": removed })))
}

/// Optional `?instance=` selector for unhide.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct InstanceFilter {
    pub instance: Option<String>,
}
