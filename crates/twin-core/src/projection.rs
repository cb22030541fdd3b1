use crate::json::{FieldSelector, JsonObject};

/// Narrows `source` down to the fields named by `selector`.
///
/// # Rules
/// 1. Every selected pointer that resolves in `source` is copied to the same
///    location in the result, creating parent objects as needed.
/// 2. Selected pointers that do not resolve are omitted; projection never fails.
/// 3. The root pointer selects nothing, so an empty selector yields an empty object.
///
/// Projection is idempotent: projecting the result again with the same
/// selector returns an equal object.
pub fn project(source: &JsonObject, selector: &FieldSelector) -> JsonObject {
    let mut projected = JsonObject::new();
    // Selector order puts a prefix before its descendants, so a whole
    // subtree is copied before any of its leaves are revisited.
    for pointer in selector.iter() {
        if let Some(value) = source.get(pointer) {
            projected.set(pointer, value.clone());
        }
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonPointer;

    fn thing() -> JsonObject {
        JsonObject::from_json(
            r#"
        {
            "thingId": "org.acme:sensor-1",
            "policyId": "org.acme:policy",
            "_revision": 5,
            "attributes": { "x": 1, "y": { "z": true } },
            "features": { "lamp": { "properties": { "on": false } } }
        }
        "#,
        )
        .unwrap()
    }

    #[test]
    fn test_project_selects_nested_fields() {
        let selector = FieldSelector::parse("attributes/y/z,features/lamp/properties/on").unwrap();

        let projected = project(&thing(), &selector);

        assert_eq!(projected.keys().collect::<Vec<_>>(), vec!["attributes", "features"]);
        let z = JsonPointer::parse("/attributes/y/z").unwrap();
        assert_eq!(projected.get(&z).unwrap().as_bool(), Some(true));
        assert!(!projected.contains(&JsonPointer::parse("/attributes/x").unwrap()));
    }

    #[test]
    fn test_missing_fields_are_omitted() {
        let selector = FieldSelector::parse("attributes/unknown,definition,_revision").unwrap();

        let projected = project(&thing(), &selector);

        assert_eq!(projected.len(), 1);
        assert_eq!(projected.revision(), Some(5));
    }

    #[test]
    fn test_prefix_and_descendant_selected_together() {
        let selector = FieldSelector::parse("attributes,attributes/x").unwrap();

        let projected = project(&thing(), &selector);

        let attributes = JsonPointer::parse("/attributes").unwrap();
        assert_eq!(projected.get(&attributes), thing().get(&attributes));
    }

    #[test]
    fn test_empty_selector_yields_empty_object() {
        assert!(project(&thing(), &FieldSelector::new()).is_empty());
    }

    #[test]
    fn test_projection_is_idempotent() {
        let selector = FieldSelector::parse("policyId,attributes(x,y),_revision").unwrap();

        let once = project(&thing(), &selector);
        let twice = project(&once, &selector);

        assert_eq!(once, twice);
    }
}
