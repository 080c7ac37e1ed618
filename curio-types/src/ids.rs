//! Identifier types used throughout the Curio core.
//!
//! Entity IDs come from upstream library servers and are opaque strings,
//! unique only within one source instance. Deployments mirroring several
//! upstream servers therefore address entities by the composite
//! (instance, id) pair. User IDs are numeric, matching the upstream
//! server's convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one upstream source instance in the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The implicit instance for single-source deployments.
    pub fn local() -> Self {
        Self("local".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An instance-scoped reference to a mirrored entity.
///
/// References are deliberately opaque: a `EntityRef` may point at an
/// entity the mirror has not ingested yet (users can hide things ahead
/// of sync), so no existence check is implied by constructing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub instance: InstanceId,
    pub id: String,
}

impl EntityRef {
    pub fn new(instance: InstanceId, id: impl Into<String>) -> Self {
        Self {
            instance,
            id: id.into(),
        }
    }

    /// Reference on the implicit local instance.
    pub fn local(id: impl Into<String>) -> Self {
        Self::new(InstanceId::local(), id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance, self.id)
    }
}

/// Numeric user identifier from the upstream server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<i64>()?))
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
