use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Result, TwinError};

/// A pointer into a JSON document (`/attributes/location/lat`).
///
/// Follows RFC 6901 escaping (`~0` for `~`, `~1` for `/`). The leading slash
/// is optional on input and empty segments are ignored, so `attributes/x`,
/// `/attributes/x` and `/attributes//x` all denote the same field. The empty
/// pointer addresses the document root.
///
/// # Example
///
/// ```
/// use twin_core::JsonPointer;
///
/// let ptr = JsonPointer::parse("/attributes/x").unwrap();
/// assert_eq!(ptr.segments(), ["attributes", "x"]);
/// assert!(ptr.starts_with(&JsonPointer::parse("/attributes").unwrap()));
/// assert!(JsonPointer::root().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The pointer to the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a pointer from its textual form.
    pub fn parse(text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for raw in text.split('/').filter(|s| !s.is_empty()) {
            segments.push(unescape(raw).ok_or_else(|| {
                TwinError::invalid_pointer(text, format!("invalid escape sequence in '{raw}'"))
            })?);
        }
        Ok(Self { segments })
    }

    /// Builds a pointer from already unescaped segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    /// Returns true if this is the root pointer.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment, i.e. the top-level field this pointer addresses.
    pub fn root_field(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Returns true if `prefix` is this pointer or one of its ancestors.
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns a new pointer with `segment` appended.
    pub fn append(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::from_segments(segments)
    }
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for JsonPointer {
    type Err = TwinError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
