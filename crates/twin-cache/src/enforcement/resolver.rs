//! Two-level resolution of an entity to the enforcer that authorizes it.

use std::time::Duration;

use tracing::{debug, warn};
use twin_core::{CacheKey, Entry};

use crate::cache::{AsyncCache, CacheLoader};
use crate::config::EnforcementConfig;
use crate::error::{CacheError, ResolveError};

/// Resolves entities to enforcers through two caches.
///
/// The id cache maps an entity key to the key of its enforcer (a thing to its
/// policy); the enforcer cache maps that key to the enforcer itself. The
/// caller's `decide` function receives both entries and owns the permission
/// decision. Its error is returned untouched and takes precedence over any
/// lookup failure.
///
/// Failed lookups are never retried here; retrying belongs to the loaders.
/// The only reload the resolver issues is for an enforcer older than the
/// revision a caller asked for.
pub struct EnforcerResolver<E> {
    id_cache: AsyncCache<CacheKey, CacheKey>,
    enforcer_cache: AsyncCache<CacheKey, E>,
    reload_delay: Duration,
}

impl<E> Clone for EnforcerResolver<E> {
    fn clone(&self) -> Self {
        Self {
            id_cache: self.id_cache.clone(),
            enforcer_cache: self.enforcer_cache.clone(),
            reload_delay: self.reload_delay,
        }
    }
}

impl<E> EnforcerResolver<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Resolver over existing caches, which may be shared with other users.
    pub fn new(id_cache: AsyncCache<CacheKey, CacheKey>, enforcer_cache: AsyncCache<CacheKey, E>) -> Self {
        Self {
            id_cache,
            enforcer_cache,
            reload_delay: EnforcementConfig::default().reload_delay,
        }
    }

    /// Sets the wait before reloading an outdated enforcer.
    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    /// Builds both caches from configuration and loaders.
    pub fn from_loaders<I, L>(config: &EnforcementConfig, id_loader: I, enforcer_loader: L) -> Self
    where
        I: CacheLoader<CacheKey, CacheKey> + 'static,
        L: CacheLoader<CacheKey, E> + 'static,
    {
        Self::new(
            AsyncCache::new("enforcement_id", &config.id_cache, id_loader),
            AsyncCache::new("enforcer", &config.enforcer_cache, enforcer_loader),
        )
        .with_reload_delay(config.reload_delay)
    }

    /// Looks up the enforcer of `entity_key` and hands both entries to `decide`.
    ///
    /// * An entity without an enforcer reaches `decide` with a nonexistent
    ///   enforcer entry; the enforcer cache is not consulted.
    /// * If a lookup fails, `decide` still runs with nonexistent entries for
    ///   what could not be resolved. A rejection from `decide` is returned as
    ///   [`ResolveError::Decision`]; otherwise the failure is returned as
    ///   [`ResolveError::Lookup`].
    pub async fn retrieve<T, D, F>(&self, entity_key: &CacheKey, decide: F) -> Result<T, ResolveError<D>>
    where
        F: FnOnce(Entry<CacheKey>, Entry<E>) -> Result<T, D>,
    {
        let id_entry = match self.id_cache.get(entity_key).await {
            Ok(entry) => entry,
            Err(error) => {
                let decision = decide(Entry::nonexistent(), Entry::nonexistent());
                return after_lookup_failure(entity_key, error, decision);
            },
        };

        let Some(enforcer_key) = id_entry.value().cloned() else {
            debug!(key = %entity_key, "Entity has no enforcer");
            return decide(id_entry, Entry::nonexistent()).map_err(ResolveError::Decision);
        };

        match self.enforcer_cache.get(&enforcer_key).await {
            Ok(enforcer_entry) => decide(id_entry, enforcer_entry).map_err(ResolveError::Decision),
            Err(error) => {
                let decision = decide(id_entry, Entry::nonexistent());
                after_lookup_failure(&enforcer_key, error, decision)
            },
        }
    }

    /// Looks up an enforcer by its own key, skipping the id cache.
    pub async fn retrieve_by_enforcer_key<T, D, F>(
        &self,
        enforcer_key: &CacheKey,
        decide: F,
    ) -> Result<T, ResolveError<D>>
    where
        F: FnOnce(Entry<E>) -> Result<T, D>,
    {
        match self.enforcer_cache.get(enforcer_key).await {
            Ok(entry) => decide(entry).map_err(ResolveError::Decision),
            Err(error) => after_lookup_failure(enforcer_key, error, decide(Entry::nonexistent())),
        }
    }

    /// Looks up an enforcer known to be at `min_revision` or later.
    ///
    /// A cached entry that is nonexistent or older than `min_revision` is
    /// invalidated and loaded once more after the reload delay. Whatever the
    /// second load returns goes to `decide`.
    pub async fn retrieve_by_enforcer_key_at<T, D, F>(
        &self,
        enforcer_key: &CacheKey,
        min_revision: i64,
        decide: F,
    ) -> Result<T, ResolveError<D>>
    where
        F: FnOnce(Entry<E>) -> Result<T, D>,
    {
        let mut reloaded = false;
        loop {
            let entry = match self.enforcer_cache.get(enforcer_key).await {
                Ok(entry) => entry,
                Err(error) => return after_lookup_failure(enforcer_key, error, decide(Entry::nonexistent())),
            };

            if reloaded || !is_outdated(&entry, min_revision) {
                return decide(entry).map_err(ResolveError::Decision);
            }

            debug!(
                key = %enforcer_key,
                cached = ?entry.revision(),
                min_revision,
                "Cached enforcer is outdated, reloading"
            );
            self.enforcer_cache.invalidate(enforcer_key).await;
            tokio::time::sleep(self.reload_delay).await;
            reloaded = true;
        }
    }

    /// Forgets which enforcer an entity maps to, e.g. after its policy id changed.
    pub async fn invalidate_entity(&self, entity_key: &CacheKey) {
        self.id_cache.invalidate_entity(entity_key).await;
    }

    /// Forgets an enforcer, e.g. after its policy was modified.
    pub async fn invalidate_enforcer(&self, enforcer_key: &CacheKey) {
        self.enforcer_cache.invalidate_entity(enforcer_key).await;
    }

    pub fn id_cache(&self) -> &AsyncCache<CacheKey, CacheKey> {
        &self.id_cache
    }

    pub fn enforcer_cache(&self) -> &AsyncCache<CacheKey, E> {
        &self.enforcer_cache
    }
}

fn is_outdated<E>(entry: &Entry<E>, min_revision: i64) -> bool {
    !entry.exists() || entry.revision().is_some_and(|revision| revision < min_revision)
}

fn after_lookup_failure<T, D>(
    key: &CacheKey,
    error: CacheError,
    decision: Result<T, D>,
) -> Result<T, ResolveError<D>> {
    match decision {
        Err(rejection) => {
            debug!(key = %key, error = %error, "Decision rejected request after failed lookup");
            Err(ResolveError::Decision(rejection))
        },
        Ok(_) => {
            warn!(key = %key, error = %error, "Enforcer lookup failed");
            Err(ResolveError::Lookup(error))
        },
    }
}
