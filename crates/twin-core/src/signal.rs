//! Inspection of commands and events as far as caching is concerned.
//!
//! The cache layer only needs to know a handful of facts about a signal:
//! whether it deletes the entity, whether it travels on the live channel, and
//! for modifications the new revision, the modified path and the new value.
//! Signal types implement [`EventInspector`] to report these facts once, as a
//! [`SignalConcern`], instead of the cache inspecting concrete types.

use crate::headers::Headers;
use crate::json::{JsonObject, JsonPointer, JsonValue};
use crate::types::EntityId;

/// What a signal means for cached projections of its entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalConcern {
    /// The entity was deleted.
    Deleted { live: bool },
    /// The entity changed at `path` and is now at `revision`.
    ///
    /// `payload` is the new value at `path`; `None` means the value at `path`
    /// was removed.
    Modified {
        live: bool,
        revision: i64,
        path: JsonPointer,
        payload: Option<JsonValue>,
    },
    /// Anything that does not change the entity (commands, messages, ...).
    Other { live: bool },
}

impl SignalConcern {
    /// Live signals are ephemeral and bypass consistency tracking.
    pub fn is_live(&self) -> bool {
        match self {
            Self::Deleted { live } | Self::Modified { live, .. } | Self::Other { live } => *live,
        }
    }
}

/// Capability of a signal to describe itself to the cache layer.
pub trait EventInspector: Send + Sync {
    fn concern(&self) -> SignalConcern;
}

impl EventInspector for SignalConcern {
    fn concern(&self) -> SignalConcern {
        self.clone()
    }
}

/// The kind of change a [`ThingEvent`] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThingEventKind {
    /// The thing was created (or fully replaced) with this content.
    Created(JsonObject),
    /// The value at `path` was created or replaced.
    Modified { path: JsonPointer, value: JsonValue },
    /// The value at `path` was removed.
    FieldDeleted { path: JsonPointer },
    /// The whole thing was deleted.
    Deleted,
}

/// A persisted (or live) change of a thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingEvent {
    thing_id: EntityId,
    revision: i64,
    kind: ThingEventKind,
    headers: Headers,
}

impl ThingEvent {
    pub fn new(thing_id: impl Into<EntityId>, revision: i64, kind: ThingEventKind) -> Self {
        Self {
            thing_id: thing_id.into(),
            revision,
            kind,
            headers: Headers::new(),
        }
    }

    pub fn created(thing_id: impl Into<EntityId>, revision: i64, thing: JsonObject) -> Self {
        Self::new(thing_id, revision, ThingEventKind::Created(thing))
    }

    pub fn modified(
        thing_id: impl Into<EntityId>,
        revision: i64,
        path: JsonPointer,
        value: impl Into<JsonValue>,
    ) -> Self {
        Self::new(
            thing_id,
            revision,
            ThingEventKind::Modified {
                path,
                value: value.into(),
            },
        )
    }

    pub fn field_deleted(thing_id: impl Into<EntityId>, revision: i64, path: JsonPointer) -> Self {
        Self::new(thing_id, revision, ThingEventKind::FieldDeleted { path })
    }

    pub fn deleted(thing_id: impl Into<EntityId>, revision: i64) -> Self {
        Self::new(thing_id, revision, ThingEventKind::Deleted)
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn thing_id(&self) -> &EntityId {
        &self.thing_id
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn kind(&self) -> &ThingEventKind {
        &self.kind
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Path of the thing the event changed; the root for whole-thing events.
    pub fn resource_path(&self) -> JsonPointer {
        match &self.kind {
            ThingEventKind::Modified { path, .. } | ThingEventKind::FieldDeleted { path } => path.clone(),
            ThingEventKind::Created(_) | ThingEventKind::Deleted => JsonPointer::root(),
        }
    }
}

impl EventInspector for ThingEvent {
    fn concern(&self) -> SignalConcern {
        let live = self.headers.is_live();
        let payload = match &self.kind {
            ThingEventKind::Deleted => return SignalConcern::Deleted { live },
            ThingEventKind::Created(thing) => Some(JsonValue::from(thing.clone())),
            ThingEventKind::Modified { value, .. } => Some(value.clone()),
            ThingEventKind::FieldDeleted { .. } => None,
        };
        SignalConcern::Modified {
            live,
            revision: self.revision,
            path: self.resource_path(),
            payload,
        }
    }
}
