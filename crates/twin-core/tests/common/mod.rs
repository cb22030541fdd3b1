#![allow(dead_code)]
use twin_core::{FieldSelector, JsonObject, JsonPointer};

/// Helper to create a JsonObject from a JSON string slice.
/// Panics if the JSON is invalid (intended for tests).
pub fn object_from_json(json: &str) -> JsonObject {
    JsonObject::from_json(json).expect("Failed to create test object from JSON")
}

pub fn selector(text: &str) -> FieldSelector {
    FieldSelector::parse(text).expect("Failed to parse test selector")
}

pub fn pointer(text: &str) -> JsonPointer {
    JsonPointer::parse(text).expect("Failed to parse test pointer")
}

/// Returns a complete thing fixture at revision 5.
pub fn sensor_thing() -> JsonObject {
    object_from_json(
        r#"{
        "thingId": "org.acme:sensor-1",
        "policyId": "org.acme:policy-1",
        "_revision": 5,
        "attributes": {
            "model": "T-1000",
            "location": { "lat": 48.13, "lon": 11.57 }
        },
        "features": {
            "temperature": { "properties": { "value": 21.5, "unit": "C" } }
        }
    }"#,
    )
}
