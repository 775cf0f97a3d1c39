//! Resource lifecycle trait and its request/response envelopes
//!
//! The orchestrator drives every transition. A resource never decides when
//! a verb runs; it only turns each request into new state plus diagnostics.

use crate::diagnostics::Diagnostics;
use crate::provider::ProviderData;
use crate::schema::Schema;
use crate::value::AttributeMap;
use std::fmt;

/// Configure request carrying the value produced by provider configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigureRequest {
    /// `None` when the provider has not been configured yet
    pub provider_data: Option<ProviderData>,
}

/// Create from a planned attribute map
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub planned: AttributeMap,
}

/// Refresh persisted state
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub state: AttributeMap,
}

/// Replace prior state with a planned attribute map
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub prior: AttributeMap,
    pub planned: AttributeMap,
}

/// Destroy the instance described by the persisted state
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub state: AttributeMap,
}

/// Response to create, read and update
///
/// `state` is what the orchestrator persists. It is only trusted when the
/// diagnostics contain no error.
#[derive(Debug, Clone, Default)]
pub struct StateResponse {
    pub state: Option<AttributeMap>,
    pub diagnostics: Diagnostics,
}

impl StateResponse {
    pub fn with_state(state: AttributeMap) -> Self {
        Self {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            state: None,
            diagnostics,
        }
    }
}

/// Response to delete
///
/// The orchestrator removes the persisted state only when no error is present.
#[derive(Debug, Clone, Default)]
pub struct DeleteResponse {
    pub diagnostics: Diagnostics,
}

impl DeleteResponse {
    /// Whether the instance should be removed from state
    pub fn removed(&self) -> bool {
        !self.diagnostics.has_error()
    }
}

/// Core trait for resource types served by a provider
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, Schema, StateResponse, DeleteResponse};
///
/// #[derive(Debug, Default)]
/// struct Marker;
///
/// impl Resource for Marker {
///     fn type_name(&self, provider: &str) -> String {
///         format!("{provider}_marker")
///     }
///     fn schema(&self) -> Schema {
///         Schema::new()
///     }
///     fn create(&self, req: CreateRequest) -> StateResponse {
///         StateResponse::with_state(req.planned)
///     }
///     fn read(&self, req: ReadRequest) -> StateResponse {
///         StateResponse::with_state(req.state)
///     }
///     fn update(&self, req: UpdateRequest) -> StateResponse {
///         StateResponse::with_state(req.planned)
///     }
///     fn delete(&self, _req: DeleteRequest) -> DeleteResponse {
///         DeleteResponse::default()
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Full type name, derived from the provider's type name
    fn type_name(&self, provider_type_name: &str) -> String;

    /// Attribute schema for this resource type
    fn schema(&self) -> Schema;

    /// Receive provider data before any lifecycle verb runs
    ///
    /// Called once per instance. The default ignores provider data.
    fn configure(&mut self, _req: ConfigureRequest) -> Diagnostics {
        Diagnostics::new()
    }

    fn create(&self, req: CreateRequest) -> StateResponse;

    fn read(&self, req: ReadRequest) -> StateResponse;

    fn update(&self, req: UpdateRequest) -> StateResponse;

    fn delete(&self, req: DeleteRequest) -> DeleteResponse;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Constructor for a fresh, unconfigured resource instance
pub type ResourceFactory = fn() -> BoxedResource;
