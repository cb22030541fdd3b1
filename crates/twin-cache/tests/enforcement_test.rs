use std::time::Duration;

use twin_cache::{CacheConfig, EnforcementConfig, EnforcementIdLoader, EnforcerLoader, EnforcerResolver, ResolveError};
use twin_core::{CacheKey, Entry};

mod common;

use common::{POLICY_ID, PolicyStore, Subjects, THING_ID, ThingStore, sensor_thing};

#[derive(Debug, PartialEq)]
enum AccessDenied {
    UnknownEntity,
    NoPolicy,
    NotGranted(String),
}

fn resolver(things: &ThingStore, policies: &PolicyStore) -> EnforcerResolver<Subjects> {
    EnforcerResolver::from_loaders(
        &EnforcementConfig::default(),
        EnforcementIdLoader::new(things.clone()),
        EnforcerLoader::new(policies.clone()),
    )
}

/// Grants access if `subject` is listed by the enforcer.
fn grant(subject: &str) -> impl FnOnce(Entry<CacheKey>, Entry<Subjects>) -> Result<String, AccessDenied> + '_ {
    move |id, enforcer| {
        if !id.exists() {
            return Err(AccessDenied::UnknownEntity);
        }
        let subjects = enforcer.into_value().ok_or(AccessDenied::NoPolicy)?;
        if subjects.iter().any(|s| s == subject) {
            Ok(subject.to_string())
        } else {
            Err(AccessDenied::NotGranted(subject.to_string()))
        }
    }
}

fn fixtures() -> (ThingStore, PolicyStore) {
    let things = ThingStore::new();
    things.insert(THING_ID, sensor_thing(5));
    let policies = PolicyStore::new();
    policies.insert(POLICY_ID, 1, &["nginx:alice"]);
    (things, policies)
}

#[tokio::test]
async fn test_thing_resolves_through_its_policy() {
    let (things, policies) = fixtures();
    let resolver = resolver(&things, &policies);

    let granted = resolver
        .retrieve(&CacheKey::thing(THING_ID), grant("nginx:alice"))
        .await
        .unwrap();
    assert_eq!(granted, "nginx:alice");

    // The enforcer was fetched under the policy key, not the thing key
    assert_eq!(policies.calls_for(POLICY_ID), 1);
    assert_eq!(policies.calls_for(THING_ID), 0);
    assert_eq!(
        resolver
            .id_cache()
            .get_if_present(&CacheKey::thing(THING_ID))
            .await
            .and_then(Entry::into_value),
        Some(CacheKey::policy(POLICY_ID))
    );
}

#[tokio::test]
async fn test_decision_error_is_returned_unchanged() {
    let (things, policies) = fixtures();
    let resolver = resolver(&things, &policies);

    let err = resolver
        .retrieve(&CacheKey::thing(THING_ID), grant("nginx:mallory"))
        .await
        .unwrap_err();

    match err {
        ResolveError::Decision(AccessDenied::NotGranted(subject)) => assert_eq!(subject, "nginx:mallory"),
        other => panic!("expected the decision error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_thing_never_reaches_enforcer_cache() {
    let (things, policies) = fixtures();
    let resolver = resolver(&things, &policies);

    let err = resolver
        .retrieve(&CacheKey::thing("org.acme:unknown"), grant("nginx:alice"))
        .await
        .unwrap_err();

    assert_eq!(err.into_decision(), Some(AccessDenied::UnknownEntity));
    assert_eq!(policies.calls(), 0);
    assert_eq!(resolver.enforcer_cache().metrics().loads(), 0);
}

#[tokio::test]
async fn test_missing_policy_reaches_decision_as_nonexistent() {
    let (things, policies) = fixtures();
    let mut orphan = sensor_thing(2);
    orphan.insert("policyId", "org.acme:deleted-policy");
    things.insert("org.acme:orphan", orphan);
    let resolver = resolver(&things, &policies);

    let err = resolver
        .retrieve(&CacheKey::thing("org.acme:orphan"), grant("nginx:alice"))
        .await
        .unwrap_err();

    assert_eq!(err.into_decision(), Some(AccessDenied::NoPolicy));
    assert_eq!(policies.calls_for("org.acme:deleted-policy"), 1);
}

#[tokio::test]
async fn test_policy_is_its_own_enforcer() {
    let (things, policies) = fixtures();
    let resolver = resolver(&things, &policies);

    let granted = resolver
        .retrieve(&CacheKey::policy(POLICY_ID), grant("nginx:alice"))
        .await
        .unwrap();

    assert_eq!(granted, "nginx:alice");
    assert_eq!(things.calls(), 0);
}

#[tokio::test]
async fn test_retrieve_by_enforcer_key() {
    let (things, policies) = fixtures();
    let resolver = resolver(&things, &policies);

    let subjects = resolver
        .retrieve_by_enforcer_key(&CacheKey::policy(POLICY_ID), |enforcer| {
            enforcer.into_value().ok_or(AccessDenied::NoPolicy)
        })
        .await
        .unwrap();

    assert_eq!(subjects, vec!["nginx:alice".to_string()]);
    assert_eq!(things.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_lookups() {
    let things = ThingStore::with_delay(Duration::from_millis(20));
    things.insert(THING_ID, sensor_thing(5));
    let policies = PolicyStore::new();
    policies.insert(POLICY_ID, 1, &["nginx:alice"]);
    let resolver = resolver(&things, &policies);

    let mut handles = vec![];
    for _ in 0..50 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            resolver
                .retrieve(&CacheKey::thing(THING_ID), grant("nginx:alice"))
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "nginx:alice");
    }

    assert_eq!(things.calls(), 1);
    assert_eq!(policies.calls(), 1);
}

#[tokio::test]
async fn test_policy_change_is_picked_up_after_invalidation() {
    let (things, policies) = fixtures();
    let resolver = resolver(&things, &policies);
    resolver
        .retrieve(&CacheKey::thing(THING_ID), grant("nginx:alice"))
        .await
        .unwrap();

    policies.insert(POLICY_ID, 2, &["nginx:bob"]);
    resolver.invalidate_enforcer(&CacheKey::policy(POLICY_ID)).await;

    let err = resolver
        .retrieve(&CacheKey::thing(THING_ID), grant("nginx:alice"))
        .await
        .unwrap_err();
    assert!(err.is_decision());
    assert_eq!(things.calls(), 1);
    assert_eq!(policies.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_timeout_surfaces_when_decision_allows() {
    let things = ThingStore::with_delay(Duration::from_secs(60));
    things.insert(THING_ID, sensor_thing(5));
    let policies = PolicyStore::new();
    let config = EnforcementConfig {
        id_cache: CacheConfig::builder().load_timeout(Duration::from_secs(1)).build(),
        ..EnforcementConfig::default()
    };
    let resolver: EnforcerResolver<Subjects> = EnforcerResolver::from_loaders(
        &config,
        EnforcementIdLoader::new(things.clone()),
        EnforcerLoader::new(policies.clone()),
    );

    let err = resolver
        .retrieve(&CacheKey::thing(THING_ID), |_, _| Ok::<_, AccessDenied>(()))
        .await
        .unwrap_err();

    match err {
        ResolveError::Lookup(cause) => assert!(cause.is_timeout()),
        other => panic!("expected a lookup error, got {other:?}"),
    }
}

fn eager_resolver(things: &ThingStore, policies: &PolicyStore) -> EnforcerResolver<Subjects> {
    resolver(things, policies).with_reload_delay(Duration::ZERO)
}

fn subjects(enforcer: Entry<Subjects>) -> Result<Subjects, AccessDenied> {
    enforcer.into_value().ok_or(AccessDenied::NoPolicy)
}

#[tokio::test]
async fn test_outdated_enforcer_is_reloaded_once() {
    let (things, policies) = fixtures();
    let resolver = eager_resolver(&things, &policies);
    let key = CacheKey::policy(POLICY_ID);
    resolver.retrieve_by_enforcer_key(&key, subjects).await.unwrap();

    policies.insert(POLICY_ID, 2, &["nginx:bob"]);
    let current = resolver.retrieve_by_enforcer_key_at(&key, 2, subjects).await.unwrap();

    assert_eq!(current, vec!["nginx:bob".to_string()]);
    assert_eq!(policies.calls_for(POLICY_ID), 2);
    assert_eq!(
        resolver.enforcer_cache().get_if_present(&key).await.and_then(|e| e.revision()),
        Some(2)
    );
}

#[tokio::test]
async fn test_current_enforcer_is_served_from_cache() {
    let (things, policies) = fixtures();
    let resolver = eager_resolver(&things, &policies);
    let key = CacheKey::policy(POLICY_ID);
    resolver.retrieve_by_enforcer_key(&key, subjects).await.unwrap();

    let current = resolver.retrieve_by_enforcer_key_at(&key, 1, subjects).await.unwrap();

    assert_eq!(current, vec!["nginx:alice".to_string()]);
    assert_eq!(policies.calls_for(POLICY_ID), 1);
}

#[tokio::test]
async fn test_enforcer_still_outdated_after_reload_is_used() {
    let (things, policies) = fixtures();
    let resolver = eager_resolver(&things, &policies);
    let key = CacheKey::policy(POLICY_ID);

    // El store sigue en la revision 1: solo se recarga una vez
    let stale = resolver.retrieve_by_enforcer_key_at(&key, 5, subjects).await.unwrap();

    assert_eq!(stale, vec!["nginx:alice".to_string()]);
    assert_eq!(policies.calls_for(POLICY_ID), 2);
}

#[tokio::test]
async fn test_missing_enforcer_is_reloaded_once() {
    let (things, policies) = fixtures();
    let resolver = eager_resolver(&things, &policies);
    let key = CacheKey::policy("org.acme:policy-new");

    resolver.retrieve_by_enforcer_key(&key, subjects).await.unwrap_err();
    policies.insert("org.acme:policy-new", 1, &["nginx:carol"]);

    let created = resolver.retrieve_by_enforcer_key_at(&key, 1, subjects).await.unwrap();
    assert_eq!(created, vec!["nginx:carol".to_string()]);
    assert_eq!(policies.calls_for("org.acme:policy-new"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_outdated_enforcer_reload_waits_for_delay() {
    let (things, policies) = fixtures();
    let config = EnforcementConfig {
        reload_delay: Duration::from_secs(3),
        ..EnforcementConfig::default()
    };
    let resolver: EnforcerResolver<Subjects> = EnforcerResolver::from_loaders(
        &config,
        EnforcementIdLoader::new(things.clone()),
        EnforcerLoader::new(policies.clone()),
    );
    let key = CacheKey::policy(POLICY_ID);
    resolver.retrieve_by_enforcer_key(&key, subjects).await.unwrap();
    policies.insert(POLICY_ID, 2, &["nginx:bob"]);

    let start = tokio::time::Instant::now();
    resolver.retrieve_by_enforcer_key_at(&key, 2, subjects).await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(3));
}
