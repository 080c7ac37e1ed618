//! Request/response shapes for the visibility API.
//!
//! Entity types and modes stay raw strings in request DTOs so the
//! boundary can answer 400 on unknown values instead of failing deep in
//! the engine.

use crate::error::ApiError;
use curio_types::{EntityRef, EntityType, InstanceId, RestrictionMode};
use curio_visibility::{BulkHideItem, RestrictionRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Entity reference on the wire: a bare ID means the local instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRefDto {
    Plain(String),
    Scoped { instance: String, id: String },
}

impl EntityRefDto {
    pub fn into_ref(self) -> EntityRef {
        match self {
            EntityRefDto::Plain(id) => EntityRef::local(id),
            EntityRefDto::Scoped { instance, id } => EntityRef::new(InstanceId::new(instance), id),
        }
    }

    pub fn from_ref(entity: &EntityRef) -> Self {
        if entity.instance == InstanceId::local() {
            EntityRefDto::Plain(entity.id.clone())
        } else {
            EntityRefDto::Scoped {
                instance: entity.instance.to_string(),
                id: entity.id.clone(),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionRuleDto {
    pub entity_type: String,
    pub mode: String,
    #[serde(default)]
    pub entity_ids: Vec<EntityRefDto>,
    #[serde(default)]
    pub restrict_empty: bool,
}

impl RestrictionRuleDto {
    pub fn into_rule(self) -> Result<RestrictionRule, ApiError> {
        let entity_type: EntityType = self
            .entity_type
            .parse()
            .map_err(|e| ApiError::Validation(format!("{e}")))?;
        let mode: RestrictionMode = self
            .mode
            .parse()
            .map_err(|e| ApiError::Validation(format!("{e}")))?;
        let entity_ids: BTreeSet<EntityRef> = self
            .entity_ids
            .into_iter()
            .map(EntityRefDto::into_ref)
            .collect();
        Ok(RestrictionRule {
            entity_type,
            mode,
            entity_ids,
            restrict_empty: self.restrict_empty,
        })
    }

    pub fn from_rule(rule: &RestrictionRule) -> Self {
        Self {
            entity_type: rule.entity_type.to_string(),
            mode: rule.mode.to_string(),
            entity_ids: rule.entity_ids.iter().map(EntityRefDto::from_ref).collect(),
            restrict_empty: rule.restrict_empty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictionsBody {
    pub restrictions: Vec<RestrictionRuleDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HideRequest {
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkHideRequest {
    pub items: Vec<BulkHideItem>,
}

/// Optional `?entityType=` filter shared by the hidden-entity routes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeFilter {
    pub entity_type: Option<String>,
}

impl TypeFilter {
    pub fn parse(&self) -> Result<Option<EntityType>, ApiError> {
        self.entity_type
            .as_deref()
            .map(|raw| raw.parse().map_err(|e| ApiError::Validation(format!("{e}"))))
            .transpose()
    }
}
