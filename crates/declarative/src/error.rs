//! Error types for the declarative crate

use thiserror::Error;

/// Errors raised while moving attribute data across the provider boundary
#[derive(Error, Debug)]
pub enum Error {
    /// Attribute map could not be decoded into the resource model
    #[error("failed to decode attributes: {0}")]
    Decode(#[source] serde_json::Error),

    /// Attribute is not declared by the schema
    #[error("unsupported attribute \"{0}\"")]
    UnknownAttribute(String),

    /// Attribute value does not match its declared type
    #[error("attribute \"{name}\" expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Provider data slot held a value of another type
    #[error("expected provider data of type {expected}, got: {actual}")]
    ProviderDataType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Result type for declarative operations
pub type Result<T> = std::result::Result<T, Error>;

/// Human-readable name of a JSON value's kind
pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}
