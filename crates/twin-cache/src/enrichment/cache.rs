//! Revision-aware cache of thing projections for signal enrichment.

use tracing::debug;
use twin_core::{
    CacheKey, EntityId, Entry, EventInspector, FieldSelector, Headers, JsonObject, JsonPointer, JsonValue,
    LookupContext, ResourceType, SignalConcern, project, revision_pointer,
};

use crate::cache::{AsyncCache, CacheLoader, InvalidationResult};
use crate::config::EnrichmentConfig;
use crate::error::CacheError;

/// Cache of partial things that follows the event stream.
///
/// Every cached projection carries the thing revision it reflects. When the
/// signal being enriched is the next event after the cached revision, the
/// projection is patched in place instead of reloaded. Any other gap, and any
/// change to who may read the thing, reloads.
///
/// Live signals never touch consistency tracking: they are served from the
/// cache as is.
#[derive(Clone)]
pub struct EnrichmentCache {
    cache: AsyncCache<CacheKey, JsonObject>,
    config: EnrichmentConfig,
}

impl EnrichmentCache {
    pub fn new<L>(config: EnrichmentConfig, loader: L) -> Self
    where
        L: CacheLoader<CacheKey, JsonObject> + 'static,
    {
        let cache = AsyncCache::new("enrichment", &config.cache, loader);
        Self::with_cache(cache, config)
    }

    pub fn with_cache(cache: AsyncCache<CacheKey, JsonObject>, config: EnrichmentConfig) -> Self {
        Self { cache, config }
    }

    /// Returns `selector` of the thing as seen with `headers`, brought up to
    /// date with `signal` when one is given.
    ///
    /// A non-live deletion yields an empty object without any lookup. An
    /// absent thing also yields an empty object.
    pub async fn retrieve(
        &self,
        thing_id: &EntityId,
        selector: &FieldSelector,
        headers: &Headers,
        signal: Option<&dyn EventInspector>,
    ) -> Result<JsonObject, CacheError> {
        let concern = signal.map(|s| s.concern());

        if let Some(SignalConcern::Deleted { live: false }) = concern {
            debug!(thing_id = %thing_id, "Thing deleted, nothing to enrich");
            return Ok(JsonObject::new());
        }

        let enhanced = selector.with_pointer(revision_pointer());
        let key = CacheKey::with_context(
            ResourceType::thing(),
            thing_id.clone(),
            LookupContext::new(headers, Some(enhanced.clone())),
        );

        let current = match concern {
            Some(SignalConcern::Modified {
                live: false,
                revision,
                path,
                payload,
            }) => self.smart_update(&key, &enhanced, revision, &path, payload).await?,
            _ => self.load(&key).await?,
        };

        Ok(project(&current, selector))
    }

    /// Drops every cached projection of a thing.
    pub async fn invalidate_thing(&self, thing_id: &EntityId) -> InvalidationResult {
        self.cache.invalidate_entity(&CacheKey::thing(thing_id.clone())).await
    }

    pub fn cache(&self) -> &AsyncCache<CacheKey, JsonObject> {
        &self.cache
    }

    async fn smart_update(
        &self,
        key: &CacheKey,
        enhanced: &FieldSelector,
        event_revision: i64,
        path: &JsonPointer,
        payload: Option<JsonValue>,
    ) -> Result<JsonObject, CacheError> {
        let cached = self.load(key).await?;
        let cached_revision = cached.revision().unwrap_or(0);

        if cached_revision == event_revision {
            return Ok(cached);
        }

        if cached_revision.checked_add(1) != Some(event_revision) {
            debug!(
                key = %key,
                cached_revision,
                event_revision,
                "Revision gap, reloading"
            );
            return self.reload(key).await;
        }

        if self.config.is_invalidating(path) {
            debug!(key = %key, path = %path, "Access control changed, reloading");
            return self.reload(key).await;
        }

        let mut patched = cached;
        patched.patch(path, payload);
        patched.set_revision(event_revision);
        let patched = project(&patched, enhanced);

        let stored = self
            .cache
            .replace_if(
                key,
                Entry::existent(patched.clone(), Some(event_revision)),
                |current| stored_revision(current) == cached_revision,
            )
            .await;
        if stored {
            debug!(key = %key, revision = event_revision, "Patched cached projection");
        } else {
            debug!(key = %key, revision = event_revision, "Slot changed concurrently, patch not stored");
        }

        Ok(patched)
    }

    /// The cached projection; an absent thing is an empty object.
    async fn load(&self, key: &CacheKey) -> Result<JsonObject, CacheError> {
        Ok(self.cache.get(key).await?.into_value().unwrap_or_default())
    }

    async fn reload(&self, key: &CacheKey) -> Result<JsonObject, CacheError> {
        self.cache.invalidate(key).await;
        self.load(key).await
    }
}

fn stored_revision(entry: &Entry<JsonObject>) -> i64 {
    entry.value().and_then(JsonObject::revision).unwrap_or(0)
}
