#![allow(dead_code)]
//! In-memory backing services for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use twin_cache::enforcement::Revisioned;
use twin_cache::{EnforcerSource, LoadError, PartialThingSource, PolicyIdSource, SourceRequest};
use twin_core::{EntityId, FieldSelector, Headers, JsonObject, JsonPointer};

pub const THING_ID: &str = "org.acme:sensor-1";
pub const POLICY_ID: &str = "org.acme:policy-1";

/// Helper to create a JsonObject from a JSON string slice.
pub fn object_from_json(json: &str) -> JsonObject {
    JsonObject::from_json(json).expect("Failed to create test object from JSON")
}

pub fn selector(text: &str) -> FieldSelector {
    FieldSelector::parse(text).expect("Failed to parse test selector")
}

pub fn pointer(text: &str) -> JsonPointer {
    JsonPointer::parse(text).expect("Failed to parse test pointer")
}

pub fn alice() -> Headers {
    Headers::new()
        .with("authorization-subjects", "nginx:alice")
        .with("correlation-id", "it-1")
}

/// The sensor fixture at `revision`.
pub fn sensor_thing(revision: i64) -> JsonObject {
    object_from_json(&format!(
        r#"{{
        "thingId": "{THING_ID}",
        "policyId": "{POLICY_ID}",
        "_revision": {revision},
        "attributes": {{ "model": "T-1000", "serial": "A-1" }},
        "features": {{ "temperature": {{ "properties": {{ "value": 21.5 }} }} }}
    }}"#
    ))
}

struct ThingStoreInner {
    things: DashMap<String, JsonObject>,
    calls: AtomicU32,
    requests: DashMap<u32, SourceRequest>,
    delay: Duration,
}

/// Things by id. Serves both enrichment and policy id lookups and counts calls.
#[derive(Clone)]
pub struct ThingStore(Arc<ThingStoreInner>);

impl ThingStore {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// A store whose answers take `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self(Arc::new(ThingStoreInner {
            things: DashMap::new(),
            calls: AtomicU32::new(0),
            requests: DashMap::new(),
            delay,
        }))
    }

    pub fn insert(&self, id: &str, thing: JsonObject) {
        self.0.things.insert(id.to_string(), thing);
    }

    pub fn remove(&self, id: &str) {
        self.0.things.remove(id);
    }

    pub fn calls(&self) -> u32 {
        self.0.calls.load(Ordering::SeqCst)
    }

    /// The request of the `n`-th call, starting at 0.
    pub fn request(&self, n: u32) -> Option<SourceRequest> {
        self.0.requests.get(&n).map(|r| r.clone())
    }

    async fn fetch(&self, thing_id: &EntityId, request: &SourceRequest) -> Option<JsonObject> {
        let n = self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0.requests.insert(n, request.clone());
        if !self.0.delay.is_zero() {
            tokio::time::sleep(self.0.delay).await;
        }
        self.0.things.get(thing_id.as_str()).map(|t| t.clone())
    }
}

#[async_trait]
impl PartialThingSource for ThingStore {
    async fn retrieve_thing(
        &self,
        thing_id: &EntityId,
        request: &SourceRequest,
    ) -> Result<Option<JsonObject>, LoadError> {
        Ok(self.fetch(thing_id, request).await)
    }
}

#[async_trait]
impl PolicyIdSource for ThingStore {
    async fn retrieve_policy_id(
        &self,
        thing_id: &EntityId,
        request: &SourceRequest,
    ) -> Result<Option<Revisioned<Option<EntityId>>>, LoadError> {
        let Some(thing) = self.fetch(thing_id, request).await else {
            return Ok(None);
        };
        let policy_id = thing
            .get(&pointer("/policyId"))
            .and_then(|v| v.as_str())
            .map(EntityId::new);
        Ok(Some(Revisioned::new(policy_id, thing.revision().unwrap_or(0))))
    }
}

/// Enforcer of a policy in tests: the subjects it grants.
pub type Subjects = Vec<String>;

struct PolicyStoreInner {
    policies: DashMap<String, Revisioned<Subjects>>,
    requested: DashMap<String, u32>,
}

/// Policies by id, recording which ids were requested.
#[derive(Clone)]
pub struct PolicyStore(Arc<PolicyStoreInner>);

impl PolicyStore {
    pub fn new() -> Self {
        Self(Arc::new(PolicyStoreInner {
            policies: DashMap::new(),
            requested: DashMap::new(),
        }))
    }

    pub fn insert(&self, id: &str, revision: i64, subjects: &[&str]) {
        let subjects = subjects.iter().map(|s| s.to_string()).collect();
        self.0.policies.insert(id.to_string(), Revisioned::new(subjects, revision));
    }

    pub fn calls(&self) -> u32 {
        self.0.requested.iter().map(|r| *r.value()).sum()
    }

    pub fn calls_for(&self, id: &str) -> u32 {
        self.0.requested.get(id).map(|r| *r).unwrap_or(0)
    }
}

#[async_trait]
impl EnforcerSource<Subjects> for PolicyStore {
    async fn retrieve_enforcer(
        &self,
        policy_id: &EntityId,
        _request: &SourceRequest,
    ) -> Result<Option<Revisioned<Subjects>>, LoadError> {
        *self.0.requested.entry(policy_id.as_str().to_string()).or_insert(0) += 1;
        Ok(self.0.policies.get(policy_id.as_str()).map(|p| p.clone()))
    }
}
