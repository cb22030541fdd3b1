//! Requests re-issued by loaders against backing services.

use twin_core::headers::CORRELATION_ID;
use twin_core::{FieldSelector, Headers, LookupContext};
use uuid::Uuid;

/// Builds the correlation id for a backing request: `<prefix>-<id>`, where
/// `id` is the requester's correlation id or a fresh UUID.
pub fn correlation_id(prefix: &str, requester: Option<&str>) -> String {
    match requester {
        Some(id) => format!("{prefix}-{id}"),
        None => format!("{prefix}-{}", Uuid::now_v7()),
    }
}

/// A request to a backing service on behalf of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    selector: Option<FieldSelector>,
    headers: Headers,
    correlation_id: String,
}

impl SourceRequest {
    /// A request without selector or requester headers.
    pub fn new(correlation_prefix: &str) -> Self {
        Self::from_context(correlation_prefix, None)
    }

    /// Rebuilds the requester's view from a lookup context: its selector and
    /// its authorization-relevant headers, tagged with a derived correlation id.
    pub fn from_context(correlation_prefix: &str, context: Option<&LookupContext>) -> Self {
        let correlation_id = correlation_id(correlation_prefix, context.and_then(LookupContext::correlation_id));
        let headers = context
            .map(|c| c.headers().clone())
            .unwrap_or_default()
            .with(CORRELATION_ID, correlation_id.clone());

        Self {
            selector: context.and_then(|c| c.selector().cloned()),
            headers,
            correlation_id,
        }
    }

    pub fn selector(&self) -> Option<&FieldSelector> {
        self.selector.as_ref()
    }

    /// Headers to send, including the correlation id.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}
