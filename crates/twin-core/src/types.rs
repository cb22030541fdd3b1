//! Common type definitions and newtypes for twin resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TwinError};

/// Tag distinguishing entity kinds that share the same cache infrastructure.
///
/// # Example
///
/// ```
/// use twin_core::ResourceType;
///
/// let thing = ResourceType::thing();
/// assert_eq!(thing.as_str(), "thing");
/// assert_ne!(thing, ResourceType::policy());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    /// Resource type of digital twins.
    pub const THING: &'static str = "thing";
    /// Resource type of policies.
    pub const POLICY: &'static str = "policy";

    /// Creates a new resource type tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `thing` resource type.
    pub fn thing() -> Self {
        Self::new(Self::THING)
    }

    /// The `policy` resource type.
    pub fn policy() -> Self {
        Self::new(Self::POLICY)
    }

    /// Returns the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_thing(&self) -> bool {
        self.0 == Self::THING
    }

    pub fn is_policy(&self) -> bool {
        self.0 == Self::POLICY
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque identifier of an entity (thing id, policy id, ...).
///
/// Identifiers are usually namespaced (`org.acme:sensor-1`), but the cache
/// layer never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new identifier without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a new identifier, rejecting empty or whitespace-only input.
    ///
    /// ```
    /// use twin_core::EntityId;
    ///
    /// assert!(EntityId::parse("org.acme:sensor-1").is_ok());
    /// assert!(EntityId::parse("  ").is_err());
    /// ```
    pub fn parse(id: &str) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(TwinError::invalid_identifier(id, "identifier cannot be empty"));
        }
        Ok(Self::new(id))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the namespace part (`org.acme` for `org.acme:sensor-1`), if any.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
