//! Per-entry expiration policy.

use std::time::{Duration, Instant};

use moka::Expiry;
use twin_core::Entry;

use crate::config::CacheConfig;

/// Derives each slot's lifetime from its [`Entry`] state.
///
/// * `Permanent` never expires.
/// * An explicit `valid_until` is honored as is.
/// * Otherwise existent entries live for `expire_after_write` (shortened by
///   `expire_after_access` when idle) and nonexistent entries for
///   `nonexistent_ttl`.
#[derive(Debug, Clone)]
pub(crate) struct EntryExpiry {
    expire_after_write: Duration,
    expire_after_access: Option<Duration>,
    nonexistent_ttl: Duration,
}

impl EntryExpiry {
    pub(crate) fn new(config: &CacheConfig) -> Self {
        Self {
            expire_after_write: config.expire_after_write(),
            expire_after_access: config.expire_after_access(),
            nonexistent_ttl: config.nonexistent_ttl(),
        }
    }

    fn lifetime<V>(&self, entry: &Entry<V>, now: Instant) -> Option<Duration> {
        match entry {
            Entry::Permanent { .. } => None,
            Entry::Existent {
                valid_until: Some(deadline),
                ..
            }
            | Entry::Nonexistent {
                valid_until: Some(deadline),
            } => Some(deadline.saturating_duration_since(now)),
            Entry::Existent { valid_until: None, .. } => Some(match self.expire_after_access {
                Some(tti) => tti.min(self.expire_after_write),
                None => self.expire_after_write,
            }),
            Entry::Nonexistent { valid_until: None } => Some(self.nonexistent_ttl),
        }
    }
}

impl<K, V> Expiry<K, Entry<V>> for EntryExpiry {
    fn expire_after_create(&self, _key: &K, value: &Entry<V>, created_at: Instant) -> Option<Duration> {
        self.lifetime(value, created_at)
    }

    fn expire_after_read(
        &self,
        _key: &K,
        value: &Entry<V>,
        read_at: Instant,
        duration_until_expiry: Option<Duration>,
        last_modified_at: Instant,
    ) -> Option<Duration> {
        match (value, self.expire_after_access) {
            (Entry::Existent { valid_until: None, .. }, Some(tti)) => {
                let written_for = read_at.saturating_duration_since(last_modified_at);
                Some(tti.min(self.expire_after_write.saturating_sub(written_for)))
            },
            _ => duration_until_expiry,
        }
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &Entry<V>,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.lifetime(value, updated_at)
    }
}
