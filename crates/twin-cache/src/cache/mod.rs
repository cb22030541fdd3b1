//! Cache layer.
//!
//! This module provides the single-flight [`AsyncCache`] over Moka, the
//! [`CacheLoader`] contract, per-state entry expiration and entity-wide or
//! pattern-based invalidation.

pub mod async_cache;
mod expiry;
pub mod invalidation;
pub mod loader;

// Re-exports
pub use async_cache::AsyncCache;
pub use invalidation::InvalidationResult;
pub use loader::{CacheLoader, FnLoader, loader_fn};
