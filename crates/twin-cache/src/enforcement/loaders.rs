//! Loaders for the enforcement caches.

use async_trait::async_trait;
use tracing::debug;
use twin_core::{CacheKey, EntityId, Entry};

use crate::cache::CacheLoader;
use crate::error::LoadError;
use crate::request::SourceRequest;

/// A value read from a backing service together with its revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revisioned<T> {
    pub value: T,
    pub revision: i64,
}

impl<T> Revisioned<T> {
    pub fn new(value: T, revision: i64) -> Self {
        Self { value, revision }
    }
}

/// Backing service answering which policy governs a thing.
#[async_trait]
pub trait PolicyIdSource: Send + Sync {
    /// Returns the thing's policy id at the thing's current revision, `None`
    /// inside when the thing has no policy, or `None` if the thing is absent.
    async fn retrieve_policy_id(
        &self,
        thing_id: &EntityId,
        request: &SourceRequest,
    ) -> Result<Option<Revisioned<Option<EntityId>>>, LoadError>;
}

/// Backing service producing the enforcer of a policy.
#[async_trait]
pub trait EnforcerSource<E>: Send + Sync {
    /// Returns the enforcer built from the policy, or `None` if the policy is absent.
    async fn retrieve_enforcer(
        &self,
        policy_id: &EntityId,
        request: &SourceRequest,
    ) -> Result<Option<Revisioned<E>>, LoadError>;
}

/// Loads entity key → enforcer key.
///
/// Policies are their own enforcers, so a policy key maps permanently to
/// itself without a remote call. A thing key maps to the key of its policy.
pub struct EnforcementIdLoader<S> {
    source: S,
}

impl<S> EnforcementIdLoader<S> {
    pub const CORRELATION_PREFIX: &'static str = "sudoRetrieveThing";

    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: PolicyIdSource> CacheLoader<CacheKey, CacheKey> for EnforcementIdLoader<S> {
    async fn load(&self, key: &CacheKey) -> Result<Entry<CacheKey>, LoadError> {
        let resource_type = key.resource_type();

        if resource_type.is_policy() {
            return Ok(Entry::permanent(CacheKey::new(
                resource_type.clone(),
                key.entity_id().clone(),
            )));
        }
        if !resource_type.is_thing() {
            return Err(LoadError::unsupported_resource(resource_type));
        }

        let request = SourceRequest::from_context(Self::CORRELATION_PREFIX, key.context());
        debug!(
            thing_id = %key.entity_id(),
            correlation_id = %request.correlation_id(),
            "Retrieving policy id of thing"
        );

        let found = self.source.retrieve_policy_id(key.entity_id(), &request).await?;
        Ok(match found {
            Some(Revisioned {
                value: Some(policy_id),
                revision,
            }) => Entry::existent(CacheKey::policy(policy_id), Some(revision)),
            _ => Entry::nonexistent(),
        })
    }
}

/// Loads policy key → enforcer.
pub struct EnforcerLoader<S> {
    source: S,
}

impl<S> EnforcerLoader<S> {
    pub const CORRELATION_PREFIX: &'static str = "sudoRetrievePolicy";

    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<E, S> CacheLoader<CacheKey, E> for EnforcerLoader<S>
where
    E: Send + 'static,
    S: EnforcerSource<E>,
{
    async fn load(&self, key: &CacheKey) -> Result<Entry<E>, LoadError> {
        if !key.resource_type().is_policy() {
            return Err(LoadError::unsupported_resource(key.resource_type()));
        }

        let request = SourceRequest::from_context(Self::CORRELATION_PREFIX, key.context());
        debug!(
            policy_id = %key.entity_id(),
            correlation_id = %request.correlation_id(),
            "Retrieving enforcer of policy"
        );

        Ok(match self.source.retrieve_enforcer(key.entity_id(), &request).await? {
            Some(found) => Entry::existent(found.value, Some(found.revision)),
            None => Entry::nonexistent(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Things {
        policies: HashMap<String, Revisioned<Option<EntityId>>>,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PolicyIdSource for Things {
        async fn retrieve_policy_id(
            &self,
            thing_id: &EntityId,
            request: &SourceRequest,
        ) -> Result<Option<Revisioned<Option<EntityId>>>, LoadError> {
            self.requests.lock().unwrap().push(request.correlation_id().to_string());
            Ok(self.policies.get(thing_id.as_str()).cloned())
        }
    }

    fn things() -> Things {
        let mut things = Things::default();
        things.policies.insert(
            "t:1".to_string(),
            Revisioned::new(Some(EntityId::new("p:1")), 4),
        );
        things.policies.insert("t:legacy".to_string(), Revisioned::new(None, 2));
        things
    }

    #[tokio::test]
    async fn test_thing_maps_to_policy() {
        let loader = EnforcementIdLoader::new(things());

        let entry = loader.load(&CacheKey::thing("t:1")).await.unwrap();

        assert_eq!(entry.value(), Some(&CacheKey::policy("p:1")));
        assert_eq!(entry.revision(), Some(4));
        let requests = loader.source.requests.lock().unwrap();
        assert!(requests[0].starts_with("sudoRetrieveThing-"));
    }

    #[tokio::test]
    async fn test_absent_thing_or_policy_is_nonexistent() {
        let loader = EnforcementIdLoader::new(things());

        assert!(!loader.load(&CacheKey::thing("t:missing")).await.unwrap().exists());
        assert!(!loader.load(&CacheKey::thing("t:legacy")).await.unwrap().exists());
    }

    #[tokio::test]
    async fn test_policy_maps_to_itself_without_remote_call() {
        let loader = EnforcementIdLoader::new(things());

        let entry = loader.load(&CacheKey::policy("p:9")).await.unwrap();

        assert!(entry.is_permanent());
        assert_eq!(entry.value(), Some(&CacheKey::policy("p:9")));
        assert!(loader.source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_resource_type_is_rejected() {
        let loader = EnforcementIdLoader::new(things());
        let key = CacheKey::new("connection".into(), EntityId::new("c:1"));

        let err = loader.load(&key).await.unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedResource(t) if t == "connection"));
    }

    struct Policies;

    #[async_trait]
    impl EnforcerSource<Vec<String>> for Policies {
        async fn retrieve_enforcer(
            &self,
            policy_id: &EntityId,
            _request: &SourceRequest,
        ) -> Result<Option<Revisioned<Vec<String>>>, LoadError> {
            Ok((policy_id.as_str() == "p:1").then(|| Revisioned::new(vec!["nginx:alice".to_string()], 7)))
        }
    }

    #[tokio::test]
    async fn test_enforcer_loader() {
        let loader = EnforcerLoader::new(Policies);

        let entry: Entry<Vec<String>> = loader.load(&CacheKey::policy("p:1")).await.unwrap();
        assert_eq!(entry.revision(), Some(7));

        let missing: Entry<Vec<String>> = loader.load(&CacheKey::policy("p:2")).await.unwrap();
        assert!(!missing.exists());

        let wrong: Result<Entry<Vec<String>>, _> = loader.load(&CacheKey::thing("t:1")).await;
        assert!(wrong.is_err());
    }
}
