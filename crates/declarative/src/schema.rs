//! Attribute schemas for providers and resources
//!
//! Schemas are static metadata the orchestrator reads before planning. They
//! declare attribute names, types, optionality, static defaults and which
//! attribute changes force a resource to be replaced.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, kind_name};
use crate::value::AttributeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Bool,
    String,
    /// Any value, including nested lists and objects
    Dynamic,
}

impl AttributeType {
    /// Name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::Bool => "bool",
            AttributeType::String => "string",
            AttributeType::Dynamic => "dynamic",
        }
    }

    /// Whether a non-null value conforms to this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            AttributeType::Bool => value.is_boolean(),
            AttributeType::String => value.is_string(),
            AttributeType::Dynamic => true,
        }
    }
}

/// When a change to an attribute forces destroy-then-recreate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceTrigger {
    /// A change replaces the resource only if the prior value was set
    OnChangeFromSet,
}

impl ReplaceTrigger {
    /// Whether moving from `prior` to `planned` requires replacement
    pub fn fires(&self, prior: &Value, planned: &Value) -> bool {
        match self {
            ReplaceTrigger::OnChangeFromSet => !prior.is_null() && prior != planned,
        }
    }
}

/// A single attribute declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub optional: bool,
    pub computed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<ReplaceTrigger>,
}

impl Attribute {
    fn new(attribute_type: AttributeType) -> Self {
        Self {
            attribute_type,
            description: String::new(),
            optional: true,
            computed: false,
            default: None,
            replace: None,
        }
    }

    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool)
    }

    pub fn optional_string() -> Self {
        Self::new(AttributeType::String)
    }

    pub fn optional_dynamic() -> Self {
        Self::new(AttributeType::Dynamic)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Static default used when the configuration leaves the attribute unset
    ///
    /// An attribute with a default is also computed.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self.computed = true;
        self
    }

    pub fn with_replace(mut self, trigger: ReplaceTrigger) -> Self {
        self.replace = Some(trigger);
        self
    }
}

/// Schema of a provider or resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Conform raw configuration to this schema
    ///
    /// Rejects undeclared attributes and type mismatches. The result holds
    /// every declared attribute: unset values take their static default when
    /// one exists and are null otherwise.
    pub fn conform(&self, raw: &AttributeMap) -> Result<AttributeMap, Diagnostics> {
        let mut diags = Diagnostics::new();

        for (name, value) in raw {
            let Some(attribute) = self.attributes.get(name) else {
                diags.add_error(
                    "Unsupported argument",
                    Error::UnknownAttribute(name.clone()).to_string(),
                );
                continue;
            };
            if !value.is_null() && !attribute.attribute_type.accepts(value) {
                let err = Error::TypeMismatch {
                    name: name.clone(),
                    expected: attribute.attribute_type.name(),
                    actual: kind_name(value),
                };
                diags.add_error("Incorrect attribute value type", err.to_string());
            }
        }

        let mut conformed = AttributeMap::new();
        for (name, attribute) in &self.attributes {
            let value = raw.get(name).cloned().unwrap_or(Value::Null);
            let value = match (&value, &attribute.default) {
                (Value::Null, Some(default)) => default.clone(),
                _ => value,
            };
            conformed.insert(name.clone(), value);
        }

        if diags.has_error() {
            Err(diags)
        } else {
            Ok(conformed)
        }
    }
}
