//! Cache and resolver configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use twin_core::JsonPointer;

/// Configuration of a single [`AsyncCache`](crate::cache::AsyncCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on the number of slots.
    maximum_size: u64,

    /// Lifetime of an existent entry without an explicit deadline.
    #[serde(with = "duration_secs")]
    expire_after_write: Duration,

    /// Idle lifetime of an existent entry; unset keeps entries until
    /// `expire_after_write`.
    #[serde(
        default,
        with = "duration_secs::option",
        skip_serializing_if = "Option::is_none"
    )]
    expire_after_access: Option<Duration>,

    /// Lifetime of a nonexistent entry without an explicit deadline.
    #[serde(with = "duration_secs")]
    nonexistent_ttl: Duration,

    /// How long a single load may take before it fails with a timeout.
    #[serde(with = "duration_secs")]
    load_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            maximum_size: 50_000,
            expire_after_write: Duration::from_secs(15 * 60),
            expire_after_access: None,
            nonexistent_ttl: Duration::from_secs(30),
            load_timeout: Duration::from_secs(10),
        }
    }
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    pub fn maximum_size(&self) -> u64 {
        self.maximum_size
    }

    pub fn expire_after_write(&self) -> Duration {
        self.expire_after_write
    }

    pub fn expire_after_access(&self) -> Option<Duration> {
        self.expire_after_access
    }

    pub fn nonexistent_ttl(&self) -> Duration {
        self.nonexistent_ttl
    }

    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }
}

/// Builder for [`CacheConfig`]. Unset values keep their defaults.
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    maximum_size: Option<u64>,
    expire_after_write: Option<Duration>,
    expire_after_access: Option<Duration>,
    nonexistent_ttl: Option<Duration>,
    load_timeout: Option<Duration>,
}

impl CacheConfigBuilder {
    pub fn maximum_size(mut self, size: u64) -> Self {
        self.maximum_size = Some(size);
        self
    }

    pub fn expire_after_write(mut self, ttl: Duration) -> Self {
        self.expire_after_write = Some(ttl);
        self
    }

    pub fn expire_after_access(mut self, tti: Duration) -> Self {
        self.expire_after_access = Some(tti);
        self
    }

    pub fn nonexistent_ttl(mut self, ttl: Duration) -> Self {
        self.nonexistent_ttl = Some(ttl);
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();
        CacheConfig {
            maximum_size: self.maximum_size.unwrap_or(defaults.maximum_size),
            expire_after_write: self.expire_after_write.unwrap_or(defaults.expire_after_write),
            expire_after_access: self.expire_after_access.or(defaults.expire_after_access),
            nonexistent_ttl: self.nonexistent_ttl.unwrap_or(defaults.nonexistent_ttl),
            load_timeout: self.load_timeout.unwrap_or(defaults.load_timeout),
        }
    }
}

/// Configuration of the two caches behind an
/// [`EnforcerResolver`](crate::enforcement::EnforcerResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    /// Entity id to enforcer key.
    pub id_cache: CacheConfig,
    /// Enforcer key to enforcer.
    pub enforcer_cache: CacheConfig,
    /// Wait before reloading an enforcer found older than the caller expected.
    #[serde(with = "duration_secs")]
    pub reload_delay: Duration,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            id_cache: CacheConfig::default(),
            enforcer_cache: CacheConfig::default(),
            reload_delay: Duration::from_secs(1),
        }
    }
}

/// Configuration of an [`EnrichmentCache`](crate::enrichment::EnrichmentCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub cache: CacheConfig,

    /// Modifications at or below these paths change who may read the entity,
    /// so every cached projection is reloaded instead of patched.
    pub invalidating_paths: Vec<JsonPointer>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            invalidating_paths: vec![
                JsonPointer::from_segments(["policyId"]),
                JsonPointer::from_segments(["acl"]),
            ],
        }
    }
}

impl EnrichmentConfig {
    /// Returns true if a modification at `path` must invalidate instead of patch.
    pub fn is_invalidating(&self, path: &JsonPointer) -> bool {
        self.invalidating_paths.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// All settings of the resolution layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub enforcement: EnforcementConfig,
    pub enrichment: EnrichmentConfig,
}

impl ResolverSettings {
    /// Environment variable prefix, e.g. `TWIN__ENRICHMENT__CACHE__LOAD_TIMEOUT=5`.
    pub const ENV_PREFIX: &'static str = "TWIN";

    /// Loads settings from an optional file, then applies `TWIN__` environment
    /// overrides. Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("enrichment.invalidating_paths"),
            )
            .build()?
            .try_deserialize()
    }
}

/// Durations as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&d.as_secs()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let secs = Option::<u64>::deserialize(deserializer)?;
            Ok(secs.map(Duration::from_secs))
        }
    }
}
