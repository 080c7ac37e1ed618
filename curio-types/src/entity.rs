//! The closed entity-type vocabulary of the mirror.
//!
//! Entity types arrive from the outside world as strings (HTTP bodies,
//! database rows) and are rejected at the boundary if they fall outside
//! this set, so the engine itself only ever handles exhaustive enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An out-of-vocabulary string was supplied for a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// The kinds of entity the mirror tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    MediaItem,
    Performer,
    Studio,
    Tag,
    ImageCollection,
    ImageItem,
    SceneCollection,
}

impl EntityType {
    /// Every known entity type, in canonical order.
    pub const ALL: [EntityType; 7] = [
        EntityType::MediaItem,
        EntityType::Performer,
        EntityType::Studio,
        EntityType::Tag,
        EntityType::ImageCollection,
        EntityType::ImageItem,
        EntityType::SceneCollection,
    ];

    /// Canonical wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::MediaItem => "media_item",
            EntityType::Performer => "performer",
            EntityType::Studio => "studio",
            EntityType::Tag => "tag",
            EntityType::ImageCollection => "image_collection",
            EntityType::ImageItem => "image_item",
            EntityType::SceneCollection => "scene_collection",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "media_item" => Ok(EntityType::MediaItem),
            "performer" => Ok(EntityType::Performer),
            "studio" => Ok(EntityType::Studio),
            "tag" => Ok(EntityType::Tag),
            "image_collection" => Ok(EntityType::ImageCollection),
            "image_item" => Ok(EntityType::ImageItem),
            "scene_collection" => Ok(EntityType::SceneCollection),
            _ => Err(UnknownValue::new("entity type", s)),
        }
    }
}

/// Relationship edges the catalog can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Performers appearing in a media item or image item.
    Performers,
    /// Media items belonging to a collection, performer, studio, or tag.
    MediaItems,
    /// Image items belonging to an image collection.
    ImageItems,
}

impl Relation {
    /// Canonical wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Performers => "performers",
            Relation::MediaItems => "media_items",
            Relation::ImageItems => "image_items",
        }
    }

    /// The entity type on the far side of the edge.
    pub fn target_type(&self) -> EntityType {
        match self {
            Relation::Performers => EntityType::Performer,
            Relation::MediaItems => EntityType::MediaItem,
            Relation::ImageItems => EntityType::ImageItem,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "performers" => Ok(Relation::Performers),
            "media_items" => Ok(Relation::MediaItems),
            "image_items" => Ok(Relation::ImageItems),
            _ => Err(UnknownValue::new("relation", s)),
        }
    }
}

/// Direction of an admin restriction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RestrictionMode {
    /// Only the listed entities are visible.
    Include,
    /// The listed entities are excluded, everything else is visible.
    Exclude,
}

impl RestrictionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestrictionMode::Include => "INCLUDE",
            RestrictionMode::Exclude => "EXCLUDE",
        }
    }
}

impl fmt::Display for RestrictionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestrictionMode {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCLUDE" => Ok(RestrictionMode::Include),
            "EXCLUDE" => Ok(RestrictionMode::Exclude),
            _ => Err(UnknownValue::new("restriction mode", s)),
        }
    }
}

/// Why an entity is in a user's exclusion set.
///
/// Membership is boolean; the reason is informational. When an entity
/// qualifies more than one way, the stored reason follows fixed
/// precedence: restricted beats hidden beats cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Derived from an admin restriction rule.
    Restricted,
    /// The user hid the entity themselves.
    Hidden,
    /// Everything that would justify showing the entity is itself excluded.
    Cascade,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::Restricted => "restricted",
            ExclusionReason::Hidden => "hidden",
            ExclusionReason::Cascade => "cascade",
        }
    }

    /// Lower rank wins when an entity qualifies multiple ways.
    pub fn rank(&self) -> u8 {
        match self {
            ExclusionReason::Restricted => 0,
            ExclusionReason::Hidden => 1,
            ExclusionReason::Cascade => 2,
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExclusionReason {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restricted" => Ok(ExclusionReason::Restricted),
            "hidden" => Ok(ExclusionReason::Hidden),
            "cascade" => Ok(ExclusionReason::Cascade),
            _ => Err(UnknownValue::new("exclusion reason", s)),
        }
    }
}
