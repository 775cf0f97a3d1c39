//! Provider trait and the provider data slot
//!
//! Provider configuration produces one value that is handed to every
//! resource instance's configure step. The slot is untyped at the protocol
//! boundary, so resources recover their concrete type with
//! [`ProviderData::downcast`].

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::resource::{BoxedResource, ResourceFactory};
use crate::schema::Schema;
use crate::value::AttributeMap;
use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared, read-only value produced by provider configuration
#[derive(Clone)]
pub struct ProviderData {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ProviderData {
    pub fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    /// Recover the concrete value
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| Error::ProviderDataType {
                expected: type_name::<T>(),
                actual: self.type_name,
            })
    }
}

impl fmt::Debug for ProviderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderData")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Provider identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub type_name: String,
    pub version: String,
}

/// Provider configuration request
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigureRequest {
    /// Provider block attributes, conformed to the provider schema
    pub config: AttributeMap,
}

/// Provider configuration response
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigureResponse {
    /// Value passed to every resource instance's configure step
    pub resource_data: Option<ProviderData>,
    pub diagnostics: Diagnostics,
}

/// Core trait for providers
pub trait Provider: Send + Sync {
    fn metadata(&self) -> ProviderMetadata;

    /// Schema of the provider configuration block
    fn schema(&self) -> Schema;

    fn configure(&self, req: ProviderConfigureRequest) -> ProviderConfigureResponse;

    /// Factories for every resource type this provider serves
    fn resources(&self) -> Vec<ResourceFactory>;
}

/// Resource factories keyed by full type name
pub fn resource_registry(provider: &dyn Provider) -> BTreeMap<String, ResourceFactory> {
    let provider_type = provider.metadata().type_name;
    provider
        .resources()
        .into_iter()
        .map(|factory| {
            let probe: BoxedResource = factory();
            (probe.type_name(&provider_type), factory)
        })
        .collect()
}
