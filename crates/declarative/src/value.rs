//! Attribute values exchanged with the orchestrator
//!
//! Attribute data travels as a JSON object keyed by attribute name. A `null`
//! value and a missing key both mean "unset".

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Attribute name -> value
pub type AttributeMap = serde_json::Map<String, Value>;

/// Decode an attribute map into a typed model
pub fn decode<T: DeserializeOwned>(attributes: &AttributeMap) -> Result<T> {
    serde_json::from_value(Value::Object(attributes.clone())).map_err(Error::Decode)
}

/// Look up an attribute, treating a missing key as null
pub fn attribute<'a>(attributes: &'a AttributeMap, name: &str) -> &'a Value {
    attributes.get(name).unwrap_or(&Value::Null)
}
