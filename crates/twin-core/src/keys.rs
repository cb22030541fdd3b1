//! Cache keys for entity lookups.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::headers::Headers;
use crate::json::FieldSelector;
use crate::types::{EntityId, ResourceType};

/// What a lookup asked for, beyond the entity itself.
///
/// Holds the requested field selector and the authorization-relevant headers
/// of the requester. Both take part in equality: the same entity seen through
/// different selectors or by different subjects never shares a cache slot.
///
/// The requester's correlation id is carried along so a loader can tag the
/// backing request, but it is excluded from equality and hashing.
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    selector: Option<FieldSelector>,
    headers: Headers,
    correlation_id: Option<String>,
}

impl LookupContext {
    /// Builds a context from the full request headers; only the
    /// authorization-relevant subset is retained.
    pub fn new(headers: &Headers, selector: Option<FieldSelector>) -> Self {
        Self {
            selector,
            headers: headers.authorization_relevant(),
            correlation_id: headers.correlation_id().map(str::to_string),
        }
    }

    pub fn selector(&self) -> Option<&FieldSelector> {
        self.selector.as_ref()
    }

    /// Headers needed to re-issue an equivalent request to the backing service.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

impl PartialEq for LookupContext {
    fn eq(&self, other: &Self) -> bool {
        self.selector == other.selector && self.headers == other.headers
    }
}

impl Eq for LookupContext {}

impl Hash for LookupContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.selector.hash(state);
        self.headers.hash(state);
    }
}

/// Key for every entity cache: resource type, entity id and optional
/// lookup context.
///
/// # Examples
///
/// ```
/// use twin_core::{CacheKey, EntityId, ResourceType};
///
/// let key = CacheKey::new(ResourceType::thing(), EntityId::new("org.acme:sensor-1"));
/// assert_eq!(key.to_string(), "thing:org.acme:sensor-1");
/// assert!(key.context().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource_type: ResourceType,
    entity_id: EntityId,
    context: Option<LookupContext>,
}

impl CacheKey {
    pub fn new(resource_type: ResourceType, entity_id: EntityId) -> Self {
        Self {
            resource_type,
            entity_id,
            context: None,
        }
    }

    pub fn with_context(resource_type: ResourceType, entity_id: EntityId, context: LookupContext) -> Self {
        Self {
            resource_type,
            entity_id,
            context: Some(context),
        }
    }

    /// Shorthand for a thing key without context.
    pub fn thing(id: impl Into<EntityId>) -> Self {
        Self::new(ResourceType::thing(), id.into())
    }

    /// Shorthand for a policy key without context.
    pub fn policy(id: impl Into<EntityId>) -> Self {
        Self::new(ResourceType::policy(), id.into())
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn context(&self) -> Option<&LookupContext> {
        self.context.as_ref()
    }

    /// Returns true if both keys address the same entity, whatever their contexts.
    pub fn same_entity(&self, other: &CacheKey) -> bool {
        self.resource_type == other.resource_type && self.entity_id == other.entity_id
    }
}

/// `resource_type:entity_id`. The context is not printed, so the
/// form can be matched against entity-wide patterns.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.entity_id)
    }
}
