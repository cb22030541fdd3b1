//! Entity-wide and pattern-based invalidation.

use std::collections::HashSet;

use glob::Pattern;
use tracing::{debug, info};
use twin_core::CacheKey;

use crate::cache::AsyncCache;

/// Outcome of a bulk invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationResult {
    /// Number of slots invalidated.
    pub count: usize,
    /// What was matched: an entity or a glob pattern.
    pub pattern: String,
}

impl<V> AsyncCache<CacheKey, V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Invalidates every slot of the entity addressed by `key`, whatever its
    /// lookup context, including slots whose load is still running.
    pub async fn invalidate_entity(&self, key: &CacheKey) -> InvalidationResult {
        let matched = self.collect_keys(|candidate| candidate.same_entity(key));

        let count = matched.len();
        for candidate in &matched {
            self.invalidate(candidate).await;
        }

        debug!(cache = %self.name(), entity = %key, count, "Entity invalidated");
        InvalidationResult {
            count,
            pattern: key.to_string(),
        }
    }

    /// Invalidates the slots whose `resource_type:entity_id` form matches a
    /// glob pattern, e.g. `thing:org.acme:*`.
    ///
    /// An invalid pattern invalidates nothing.
    pub async fn invalidate_by_pattern(&self, pattern_str: &str) -> InvalidationResult {
        let pattern = match Pattern::new(pattern_str) {
            Ok(p) => p,
            Err(e) => {
                debug!(pattern = %pattern_str, error = %e, "Invalid glob pattern");
                return InvalidationResult {
                    count: 0,
                    pattern: pattern_str.to_string(),
                };
            },
        };

        let matched = self.collect_keys(|candidate| pattern.matches(&candidate.to_string()));

        let count = matched.len();
        for candidate in &matched {
            self.invalidate(candidate).await;
        }

        info!(
            cache = %self.name(),
            pattern = %pattern_str,
            count = count,
            "Cache entries invalidated by pattern"
        );

        InvalidationResult {
            count,
            pattern: pattern_str.to_string(),
        }
    }

    fn collect_keys<F>(&self, matches: F) -> Vec<CacheKey>
    where
        F: Fn(&CacheKey) -> bool,
    {
        let mut seen = HashSet::new();
        self.keys()
            .into_iter()
            .chain(self.keys_in_flight())
            .filter(|candidate| matches(candidate))
            .filter(|candidate| seen.insert(candidate.clone()))
            .collect()
    }
}
