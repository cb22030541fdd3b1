//! Twin Cache - Resolution and consistency-tracked caching
//!
//! This crate resolves the current state of twin entities through
//! asynchronous, negatively-cacheable lookups:
//!
//! - [`AsyncCache`]: single-flight cache over a [`CacheLoader`]
//! - [`EnforcerResolver`]: entity → enforcer key → enforcer, for authorization
//! - [`EnrichmentCache`]: revision-aware thing projections for signal enrichment
//!
//! plus the ambient pieces the embedding process wires up: configuration,
//! tracing and Prometheus metrics.

pub mod cache;
pub mod config;
pub mod enforcement;
pub mod enrichment;
pub mod error;
pub mod metrics;
pub mod request;
pub mod telemetry;

pub use cache::{AsyncCache, CacheLoader, InvalidationResult, loader_fn};
pub use config::{CacheConfig, EnforcementConfig, EnrichmentConfig, ResolverSettings};
pub use enforcement::{EnforcementIdLoader, EnforcerLoader, EnforcerResolver, EnforcerSource, PolicyIdSource};
pub use enrichment::{EnrichmentCache, EnrichmentLoader, PartialThingSource};
pub use error::{CacheError, LoadError, ResolveError};
pub use request::SourceRequest;
