//! Error types for the twin domain model.
//!
//! Everything in this crate that can fail returns [`Result<T>`], which wraps
//! [`TwinError`]. The variants carry the offending input so callers can log
//! or map them without re-parsing.
//!
//! # Example
//!
//! ```
//! use twin_core::{JsonPointer, Result, TwinError};
//!
//! fn attribute(name: &str) -> Result<JsonPointer> {
//!     if name.is_empty() {
//!         return Err(TwinError::invalid_pointer(name, "attribute name cannot be empty"));
//!     }
//!     JsonPointer::parse(&format!("/attributes/{name}"))
//! }
//!
//! assert!(attribute("serial").is_ok());
//! assert!(attribute("").is_err());
//! ```

use thiserror::Error;

/// Main error type for twin domain operations.
#[derive(Debug, Error)]
pub enum TwinError {
    /// A JSON pointer could not be parsed.
    #[error("Invalid JSON pointer '{pointer}': {reason}")]
    InvalidPointer {
        /// The pointer text that was provided
        pointer: String,
        /// Why it's invalid
        reason: String,
    },

    /// A field selector could not be parsed.
    #[error("Invalid field selector '{selector}': {reason}")]
    InvalidSelector {
        /// The selector text that was provided
        selector: String,
        /// Why it's invalid
        reason: String,
    },

    /// An entity identifier or resource type is malformed.
    #[error("Invalid identifier '{id}': {reason}")]
    InvalidIdentifier {
        /// The identifier that was provided
        id: String,
        /// Why it's invalid
        reason: String,
    },

    /// Error parsing a JSON document.
    #[error("Failed to parse JSON from '{source_name}': {message}")]
    ParseError {
        /// Where the document came from
        source_name: String,
        /// Description of the parse error
        message: String,
        /// Underlying error, if any
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TwinError {
    /// Creates an InvalidPointer error.
    pub fn invalid_pointer(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPointer {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidSelector error.
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidIdentifier error.
    pub fn invalid_identifier(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a ParseError without a cause.
    pub fn parse_error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            source_name: source.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a ParseError with a cause.
    pub fn parse_error_with_cause<E>(
        source: impl Into<String>,
        message: impl Into<String>,
        cause: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ParseError {
            source_name: source.into(),
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this is a parse error.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError { .. })
    }

    /// Returns true if the error was caused by malformed caller input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidPointer { .. } | Self::InvalidSelector { .. } | Self::InvalidIdentifier { .. }
        )
    }
}

/// Type alias for Results with TwinError.
pub type Result<T> = std::result::Result<T, TwinError>;
