//! # Declarative
//!
//! Provider plumbing for declarative infrastructure tools.
//!
//! This crate holds the vocabulary shared by a provider and the orchestrator
//! that drives it: attribute schemas, diagnostics, lifecycle request and
//! response envelopes, and plan computation.
//!
//! ## Core Concepts
//!
//! - **Provider**: Configured once, then hands shared data to its resources
//! - **Resource**: A type with create, read, update and delete verbs
//! - **Schema**: Static attribute metadata read before planning
//! - **Diagnostics**: Warnings and errors returned from every call
//! - **Action**: The planned change for one instance (create, update, replace, delete)
//!
//! ## Provider Data
//!
//! Provider configuration yields a [`ProviderData`] value, an untyped slot
//! that each resource downcasts in [`Resource::configure`]. A slot holding
//! the wrong type is reported as an error diagnostic by the resource.

pub mod diagnostics;
pub mod error;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod value;

// Re-export main types at crate root
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use plan::{Action, plan_action, replacement_triggers};
pub use provider::{
    Provider, ProviderConfigureRequest, ProviderConfigureResponse, ProviderData,
    ProviderMetadata, resource_registry,
};
pub use resource::{
    BoxedResource, ConfigureRequest, CreateRequest, DeleteRequest, DeleteResponse, ReadRequest,
    Resource, ResourceFactory, StateResponse, UpdateRequest,
};
pub use schema::{Attribute, AttributeType, ReplaceTrigger, Schema};
pub use value::{AttributeMap, attribute, decode};
