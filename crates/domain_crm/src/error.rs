//! CRM domain errors
//!
//! Errors raised while mapping between dynamic records and the typed entity
//! views. They never reach callers directly: the service boundary converts
//! them into [`RemoteFault::Transformation`].

use thiserror::Error;

use core_kernel::RemoteFault;

/// Errors that can occur converting records to typed entities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record belongs to a different entity kind
    #[error("Expected a {expected} record but got {actual}")]
    EntityMismatch {
        expected: String,
        actual: String,
    },

    /// An attribute holds a value of the wrong type
    #[error("Attribute {attribute} holds {actual}, expected {expected}")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// An option set attribute holds a value with no known label
    #[error("Unknown option set value {value} for {attribute}")]
    UnknownOptionValue {
        attribute: String,
        value: i32,
    },
}

impl RecordError {
    /// Creates a TypeMismatch error
    pub fn type_mismatch(attribute: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        RecordError::TypeMismatch {
            attribute: attribute.into(),
            expected,
            actual,
        }
    }
}

impl From<RecordError> for RemoteFault {
    fn from(err: RecordError) -> Self {
        RemoteFault::transformation(err.to_string())
    }
}
