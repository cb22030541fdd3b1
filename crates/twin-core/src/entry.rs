//! Cache entry states.

use std::time::{Duration, Instant};

/// The value held in a cache slot.
///
/// A slot is in exactly one of three states. `Nonexistent` records a
/// confirmed absence so repeated lookups of a missing entity do not reach the
/// backing service again; `Permanent` marks statically known values that never
/// expire.
///
/// `valid_until` of `None` means the owning cache applies its configured
/// default lifetime for that state.
///
/// # Example
///
/// ```
/// use twin_core::Entry;
///
/// let entry = Entry::existent("policy-1", Some(7));
/// assert!(entry.exists());
/// assert_eq!(entry.revision(), Some(7));
///
/// let missing: Entry<&str> = Entry::nonexistent();
/// assert!(!missing.exists());
/// assert_eq!(missing.value(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry<T> {
    /// Confirmed absence.
    Nonexistent { valid_until: Option<Instant> },
    /// A live value, optionally tagged with the revision it was read at.
    Existent {
        value: T,
        revision: Option<i64>,
        valid_until: Option<Instant>,
    },
    /// A value that never expires.
    Permanent { value: T },
}

impl<T> Entry<T> {
    /// A confirmed absence with the cache's default negative lifetime.
    pub fn nonexistent() -> Self {
        Self::Nonexistent { valid_until: None }
    }

    /// A confirmed absence valid for `ttl` from now.
    pub fn nonexistent_for(ttl: Duration) -> Self {
        Self::Nonexistent {
            valid_until: Some(Instant::now() + ttl),
        }
    }

    pub fn existent(value: T, revision: Option<i64>) -> Self {
        Self::Existent {
            value,
            revision,
            valid_until: None,
        }
    }

    /// A present value valid for `ttl` from now.
    pub fn existent_for(value: T, revision: Option<i64>, ttl: Duration) -> Self {
        Self::Existent {
            value,
            revision,
            valid_until: Some(Instant::now() + ttl),
        }
    }

    pub fn permanent(value: T) -> Self {
        Self::Permanent { value }
    }

    /// Returns true if the entry carries a value.
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Nonexistent { .. })
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Existent { value, .. } | Self::Permanent { value } => Some(value),
            Self::Nonexistent { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Existent { value, .. } | Self::Permanent { value } => Some(value),
            Self::Nonexistent { .. } => None,
        }
    }

    /// Revision of the value. Permanent and absent entries have none.
    pub fn revision(&self) -> Option<i64> {
        match self {
            Self::Existent { revision, .. } => *revision,
            _ => None,
        }
    }

    pub fn valid_until(&self) -> Option<Instant> {
        match self {
            Self::Nonexistent { valid_until } | Self::Existent { valid_until, .. } => *valid_until,
            Self::Permanent { .. } => None,
        }
    }

    /// Returns true if an explicit deadline has passed. Entries without a
    /// deadline are never expired by this check.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.valid_until().is_some_and(|deadline| deadline <= now)
    }

    /// Maps the value while keeping state, revision and deadline.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Entry<U> {
        match self {
            Self::Nonexistent { valid_until } => Entry::Nonexistent { valid_until },
            Self::Existent {
                value,
                revision,
                valid_until,
            } => Entry::Existent {
                value: f(value),
                revision,
                valid_until,
            },
            Self::Permanent { value } => Entry::Permanent { value: f(value) },
        }
    }
}
