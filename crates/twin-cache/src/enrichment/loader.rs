//! Loader fetching partial things for enrichment.

use async_trait::async_trait;
use tracing::debug;
use twin_core::{CacheKey, EntityId, Entry, JsonObject, project};

use crate::cache::CacheLoader;
use crate::error::LoadError;
use crate::request::SourceRequest;

/// Backing service returning the requested fields of a thing.
#[async_trait]
pub trait PartialThingSource: Send + Sync {
    /// Returns the fields selected by `request` as seen by its requester, or
    /// `None` if the thing is absent or not visible.
    async fn retrieve_thing(
        &self,
        thing_id: &EntityId,
        request: &SourceRequest,
    ) -> Result<Option<JsonObject>, LoadError>;
}

/// Loads thing projections keyed by thing id and lookup context.
///
/// The request is rebuilt from the key's context so the source sees the same
/// selector and authorization headers as the original requester.
pub struct EnrichmentLoader<S> {
    source: S,
}

impl<S> EnrichmentLoader<S> {
    pub const CORRELATION_PREFIX: &'static str = "retrieveThing";

    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: PartialThingSource> CacheLoader<CacheKey, JsonObject> for EnrichmentLoader<S> {
    async fn load(&self, key: &CacheKey) -> Result<Entry<JsonObject>, LoadError> {
        if !key.resource_type().is_thing() {
            return Err(LoadError::unsupported_resource(key.resource_type()));
        }

        let request = SourceRequest::from_context(Self::CORRELATION_PREFIX, key.context());
        debug!(
            thing_id = %key.entity_id(),
            correlation_id = %request.correlation_id(),
            "Retrieving partial thing"
        );

        let Some(thing) = self.source.retrieve_thing(key.entity_id(), &request).await? else {
            return Ok(Entry::nonexistent());
        };

        let thing = match request.selector() {
            Some(selector) => project(&thing, selector),
            None => thing,
        };
        let revision = thing.revision();
        Ok(Entry::existent(thing, revision))
    }
}
