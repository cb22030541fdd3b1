//! Request headers travelling with commands and events.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the request correlation id.
pub const CORRELATION_ID: &str = "correlation-id";
/// Header carrying the comma separated authorization subjects of the requester.
pub const AUTHORIZATION_SUBJECTS: &str = "authorization-subjects";
/// Header carrying the schema version the requester speaks.
pub const SCHEMA_VERSION: &str = "schema-version";
/// Header carrying the signal channel (`twin` or `live`).
pub const CHANNEL: &str = "channel";

/// Headers that change what a requester is allowed to see. Only these take
/// part in cache key identity.
const AUTHORIZATION_RELEVANT: [&str; 2] = [AUTHORIZATION_SUBJECTS, SCHEMA_VERSION];

/// Case-insensitive header map with deterministic ordering.
///
/// # Example
///
/// ```
/// use twin_core::Headers;
///
/// let headers = Headers::new()
///     .with("Correlation-Id", "abc")
///     .with("channel", "live");
/// assert_eq!(headers.correlation_id(), Some("abc"));
/// assert!(headers.is_live());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the given header set. Keys are lowercased.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(key.as_ref().to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.get(CORRELATION_ID)
    }

    pub fn schema_version(&self) -> Option<&str> {
        self.get(SCHEMA_VERSION)
    }

    /// Authorization subjects, trimmed, in header order.
    pub fn authorization_subjects(&self) -> Vec<&str> {
        self.get(AUTHORIZATION_SUBJECTS)
            .map(|subjects| {
                subjects
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns true if the signal travels on the live channel.
    pub fn is_live(&self) -> bool {
        self.get(CHANNEL).is_some_and(|c| c.eq_ignore_ascii_case("live"))
    }

    /// The subset of headers that affects visibility of entity data.
    pub fn authorization_relevant(&self) -> Headers {
        Headers(
            self.0
                .iter()
                .filter(|(k, _)| AUTHORIZATION_RELEVANT.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}
