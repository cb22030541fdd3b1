//! Signal enrichment: cached thing projections kept in step with events.

pub mod cache;
pub mod loader;

pub use cache::EnrichmentCache;
pub use loader::{EnrichmentLoader, PartialThingSource};
