//! The loader contract behind every cache.

use std::future::Future;

use async_trait::async_trait;
use twin_core::Entry;

use crate::error::LoadError;

/// Produces the entry for a key on a cache miss.
///
/// Return `Ok(Entry::Nonexistent)` when the backing source confirms the
/// entity is absent; that answer is cached. Return `Err` when the state could
/// not be determined; errors are handed to the waiters and never cached.
///
/// Loaders may be called concurrently for different keys, but never twice
/// concurrently for the same key of one cache.
#[async_trait]
pub trait CacheLoader<K, V>: Send + Sync {
    async fn load(&self, key: &K) -> Result<Entry<V>, LoadError>;
}

/// A [`CacheLoader`] backed by an async closure.
pub struct FnLoader<F> {
    f: F,
}

/// Wraps an async closure as a [`CacheLoader`].
///
/// ```
/// use twin_cache::cache::loader_fn;
/// use twin_core::Entry;
///
/// let loader = loader_fn(|key: String| async move { Ok(Entry::existent(key.len(), None)) });
/// # let _ = loader;
/// ```
pub fn loader_fn<K, V, F, Fut>(f: F) -> FnLoader<F>
where
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<Entry<V>, LoadError>>,
{
    FnLoader { f }
}

#[async_trait]
impl<K, V, F, Fut> CacheLoader<K, V> for FnLoader<F>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Entry<V>, LoadError>> + Send,
{
    async fn load(&self, key: &K) -> Result<Entry<V>, LoadError> {
        (self.f)(key.clone()).await
    }
}
