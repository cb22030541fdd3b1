use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pointer::JsonPointer;
use crate::error::{Result, TwinError};

/// A JSON value as carried by thing projections and event payloads.
pub type JsonValue = Value;

/// Name of the top-level field holding an entity's revision.
pub const REVISION_FIELD: &str = "_revision";

/// A (partial) thing: a JSON object addressed by [`JsonPointer`]s.
///
/// Field order is preserved, so a projection serializes the way it was built.
/// Besides pointer access it knows the revision it reflects and how to apply
/// the change carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonObject(Map<String, Value>);

impl JsonObject {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Inserts a top-level field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Names of the top-level fields.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The value a pointer addresses. The root pointer addresses the object
    /// itself, which is not a value, so it yields `None`.
    ///
    /// # Example
    /// ```
    /// # use twin_core::{JsonObject, JsonPointer};
    /// let thing = JsonObject::from_json(r#"{"attributes": {"x": 1}}"#).unwrap();
    /// let x = thing.get(&JsonPointer::parse("/attributes/x").unwrap());
    /// assert_eq!(x.and_then(|v| v.as_i64()), Some(1));
    /// ```
    pub fn get(&self, pointer: &JsonPointer) -> Option<&Value> {
        let (first, rest) = pointer.segments().split_first()?;
        rest.iter()
            .try_fold(self.0.get(first)?, |value, segment| value.as_object()?.get(segment))
    }

    pub fn contains(&self, pointer: &JsonPointer) -> bool {
        self.get(pointer).is_some()
    }

    /// Sets the value at `pointer`. Missing or non-object parents become
    /// objects. The root pointer is ignored; see [`JsonObject::merge`].
    pub fn set(&mut self, pointer: &JsonPointer, value: Value) {
        let Some((last, parents)) = pointer.segments().split_last() else {
            return;
        };
        let mut fields = &mut self.0;
        for segment in parents {
            let child = fields
                .entry(segment.as_str())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            fields = match child {
                Value::Object(map) => map,
                _ => return,
            };
        }
        fields.insert(last.clone(), value);
    }

    /// Removes the value at `pointer`, returning it if it was present.
    pub fn remove(&mut self, pointer: &JsonPointer) -> Option<Value> {
        let (last, parents) = pointer.segments().split_last()?;
        let mut fields = &mut self.0;
        for segment in parents {
            fields = fields.get_mut(segment)?.as_object_mut()?;
        }
        fields.shift_remove(last)
    }

    /// Shallow merge: every top-level field of `other` replaces the field of
    /// the same name.
    pub fn merge(&mut self, other: &Map<String, Value>) {
        for (key, value) in other {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Applies the change an event carries at `path`.
    ///
    /// An object payload at the root is merged; any other payload is set at
    /// `path`; no payload removes the field.
    pub fn patch(&mut self, path: &JsonPointer, payload: Option<Value>) {
        match payload {
            Some(Value::Object(fields)) if path.is_empty() => self.merge(&fields),
            Some(value) => self.set(path, value),
            None => {
                self.remove(path);
            },
        }
    }

    /// The revision stored in the [`REVISION_FIELD`], if any.
    pub fn revision(&self) -> Option<i64> {
        self.0.get(REVISION_FIELD).and_then(Value::as_i64)
    }

    pub fn set_revision(&mut self, revision: i64) {
        self.0.insert(REVISION_FIELD.to_string(), revision.into());
    }

    /// Parses a JSON string that must hold an object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TwinError::parse_error_with_cause("json_source", "not a JSON object", e))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TwinError::parse_error("json_target", e.to_string()))
    }
}

/// Pointer to the [`REVISION_FIELD`].
pub fn revision_pointer() -> JsonPointer {
    JsonPointer::from_segments([REVISION_FIELD])
}

impl From<Map<String, Value>> for JsonObject {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<JsonObject> for Value {
    fn from(object: JsonObject) -> Self {
        Value::Object(object.0)
    }
}
