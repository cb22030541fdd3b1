//! Error types for loaders, caches and resolvers.

use std::sync::Arc;
use std::time::Duration;

/// Errors a [`CacheLoader`](crate::cache::CacheLoader) reports when it could
/// not determine the state of an entity.
///
/// A loader that positively knows an entity is absent returns
/// `Ok(Entry::Nonexistent)` instead; a `LoadError` is never cached.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The backing service answered with an error.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The backing service answered with something we could not interpret.
    #[error("invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },

    /// The backing service could not be reached.
    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },

    /// The loader cannot serve this kind of key.
    #[error("unsupported resource type '{0}'")]
    UnsupportedResource(String),
}

impl LoadError {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn invalid_response(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn unsupported_resource(resource_type: impl ToString) -> Self {
        Self::UnsupportedResource(resource_type.to_string())
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Failure of a cache lookup.
///
/// Every waiter of a shared load receives a clone of the same error, so the
/// loader's error is kept behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The loader returned an error.
    #[error("loading '{key}' failed: {source}")]
    Load {
        key: String,
        #[source]
        source: Arc<LoadError>,
    },

    /// The loader did not finish within the configured load timeout.
    #[error("loading '{key}' timed out after {after:?}")]
    Timeout { key: String, after: Duration },

    /// The load task ended without producing a result (it panicked or the
    /// runtime shut down).
    #[error("loading '{key}' was aborted: {reason}")]
    Aborted { key: String, reason: String },
}

impl CacheError {
    pub fn load(key: impl ToString, source: LoadError) -> Self {
        Self::Load {
            key: key.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn timeout(key: impl ToString, after: Duration) -> Self {
        Self::Timeout {
            key: key.to_string(),
            after,
        }
    }

    pub fn aborted(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::Aborted {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The loader error behind this failure, if the loader produced one.
    pub fn load_error(&self) -> Option<&LoadError> {
        match self {
            Self::Load { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Failure of an [`EnforcerResolver`](crate::enforcement::EnforcerResolver) call.
///
/// `Decision` carries the caller's own error untouched. Whenever the decision
/// function fails, its error is returned, even if a lookup failed before it
/// was called.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError<D> {
    /// The decision function rejected the request.
    #[error("{0}")]
    Decision(D),

    /// A lookup failed and the decision function did not reject the request.
    #[error("enforcer lookup failed: {0}")]
    Lookup(#[source] CacheError),
}

impl<D> ResolveError<D> {
    pub fn is_decision(&self) -> bool {
        matches!(self, Self::Decision(_))
    }

    /// Returns the decision error, if this is one.
    pub fn into_decision(self) -> Option<D> {
        match self {
            Self::Decision(d) => Some(d),
            Self::Lookup(_) => None,
        }
    }
}
