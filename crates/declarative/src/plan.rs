//! Plan computation for a single resource instance

use crate::schema::Schema;
use crate::value::{AttributeMap, attribute};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the orchestrator will do to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Action {
    /// Planned attributes equal the prior state
    NoOp,
    /// No prior state exists
    Create,
    /// Change applied in place
    Update,
    /// Destroy then recreate, triggered by the listed attributes
    Replace { because: Vec<String> },
    /// Instance is no longer declared
    Delete,
}

impl Action {
    /// Whether this action invokes the resource's delete verb
    pub fn destroys(&self) -> bool {
        matches!(self, Action::Replace { .. } | Action::Delete)
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Action::NoOp)
    }

    /// Single-character marker used when rendering plans
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::NoOp => " ",
            Action::Create => "+",
            Action::Update => "~",
            Action::Replace { .. } => "-/+",
            Action::Delete => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::NoOp => write!(f, "no changes"),
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update in-place"),
            Action::Replace { because } => {
                write!(f, "must be replaced ({} forces replacement)", because.join(", "))
            }
            Action::Delete => write!(f, "destroy"),
        }
    }
}

/// Attributes that force replacement when moving from `prior` to `planned`
pub fn replacement_triggers(
    schema: &Schema,
    prior: &AttributeMap,
    planned: &AttributeMap,
) -> Vec<String> {
    schema
        .attributes
        .iter()
        .filter_map(|(name, attr)| {
            let trigger = attr.replace?;
            trigger
                .fires(attribute(prior, name), attribute(planned, name))
                .then(|| name.clone())
        })
        .collect()
}

/// Compute the action for one instance
///
/// `planned` must already be conformed to `schema`.
pub fn plan_action(
    schema: &Schema,
    prior: Option<&AttributeMap>,
    planned: Option<&AttributeMap>,
) -> Action {
    match (prior, planned) {
        (None, None) => Action::NoOp,
        (None, Some(_)) => Action::Create,
        (Some(_), None) => Action::Delete,
        (Some(prior), Some(planned)) => {
            let because = replacement_triggers(schema, prior, planned);
            if !because.is_empty() {
                log::debug!("replacement forced by {}", because.join(", "));
                Action::Replace { because }
            } else if differs(schema, prior, planned) {
                Action::Update
            } else {
                Action::NoOp
            }
        }
    }
}

/// Compare the declared attributes of two maps, treating missing as null
fn differs(schema: &Schema, prior: &AttributeMap, planned: &AttributeMap) -> bool {
    schema
        .attributes
        .keys()
        .any(|name| attribute(prior, name) != attribute(planned, name))
}
