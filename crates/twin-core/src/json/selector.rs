use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use super::pointer::JsonPointer;
use crate::error::{Result, TwinError};

/// A set of JSON pointers selecting parts of an entity.
///
/// The textual form is a comma separated list of pointers where a group of
/// sub-fields sharing a prefix may be written with parentheses:
/// `attributes(model,serial),policyId`. Pointers are kept sorted and
/// deduplicated, so two selectors naming the same fields in a different order
/// are equal and hash the same.
///
/// # Example
///
/// ```
/// use twin_core::FieldSelector;
///
/// let selector = FieldSelector::parse("attributes(model,serial),policyId").unwrap();
/// assert_eq!(selector.len(), 3);
/// assert_eq!(selector.to_string(), "/attributes/model,/attributes/serial,/policyId");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldSelector {
    pointers: BTreeSet<JsonPointer>,
}

impl FieldSelector {
    /// Creates an empty selector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a selector from the given pointers.
    pub fn of<I: IntoIterator<Item = JsonPointer>>(pointers: I) -> Self {
        Self {
            pointers: pointers.into_iter().collect(),
        }
    }

    /// Parses the textual form described on the type.
    pub fn parse(text: &str) -> Result<Self> {
        let mut pointers = BTreeSet::new();
        for part in split_top_level(text)? {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.find('(') {
                Some(open) => {
                    if !part.ends_with(')') {
                        return Err(TwinError::invalid_selector(
                            text,
                            format!("group '{part}' must end with ')'"),
                        ));
                    }
                    let prefix = JsonPointer::parse(&part[..open])?;
                    let inner = &part[open + 1..part.len() - 1];
                    if inner.contains('(') {
                        return Err(TwinError::invalid_selector(text, "nested groups are not supported"));
                    }
                    for sub in inner.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        let sub = JsonPointer::parse(sub)?;
                        let mut segments = prefix.segments().to_vec();
                        segments.extend(sub.segments().iter().cloned());
                        pointers.insert(JsonPointer::from_segments(segments));
                    }
                },
                None => {
                    pointers.insert(JsonPointer::parse(part)?);
                },
            }
        }
        Ok(Self { pointers })
    }

    /// Returns a copy of this selector with `pointer` added.
    pub fn with_pointer(&self, pointer: JsonPointer) -> Self {
        let mut pointers = self.pointers.clone();
        pointers.insert(pointer);
        Self { pointers }
    }

    /// Union of both selectors.
    pub fn union(&self, other: &FieldSelector) -> Self {
        Self {
            pointers: self.pointers.union(&other.pointers).cloned().collect(),
        }
    }

    pub fn contains(&self, pointer: &JsonPointer) -> bool {
        self.pointers.contains(pointer)
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JsonPointer> {
        self.pointers.iter()
    }
}

/// Splits on commas that are not inside a parenthesised group.
fn split_top_level(text: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| TwinError::invalid_selector(text, "unbalanced ')'"))?;
            },
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            },
            _ => {},
        }
    }
    if depth != 0 {
        return Err(TwinError::invalid_selector(text, "unbalanced '('"));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for pointer in &self.pointers {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{pointer}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<JsonPointer> for FieldSelector {
    fn from_iter<I: IntoIterator<Item = JsonPointer>>(iter: I) -> Self {
        Self::of(iter)
    }
}

impl Serialize for FieldSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
