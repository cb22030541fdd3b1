pub mod object;
pub mod pointer;
pub mod selector;

pub use object::{JsonObject, JsonValue, REVISION_FIELD, revision_pointer};
pub use pointer::JsonPointer;
pub use selector::FieldSelector;
