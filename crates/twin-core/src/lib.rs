//! Twin Core - Domain types for twin resolution
//!
//! This crate provides the types shared by the authorization and enrichment
//! caches: entity keys and lookup contexts, the tri-state cache [`Entry`],
//! the JSON projection model, field projection and signal inspection.

pub mod entry;
pub mod error;
pub mod headers;
pub mod json;
pub mod keys;
pub mod projection;
pub mod signal;
pub mod types;

pub use entry::Entry;
pub use error::{Result, TwinError};
pub use headers::Headers;
pub use json::{FieldSelector, JsonObject, JsonPointer, JsonValue, REVISION_FIELD, revision_pointer};
pub use keys::{CacheKey, LookupContext};
pub use projection::project;
pub use signal::{EventInspector, SignalConcern, ThingEvent, ThingEventKind};
pub use types::{EntityId, ResourceType};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
