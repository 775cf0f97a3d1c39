//! A configured provider ready to serve lifecycle calls

use std::collections::BTreeMap;

use declarative::{
    AttributeMap, BoxedResource, ConfigureRequest, Diagnostics, Provider,
    ProviderConfigureRequest, ProviderData, ResourceFactory, Schema, resource_registry,
};

/// Provider plus the data its configuration produced
///
/// Configuration happens exactly once, in [`Session::start`], before any
/// resource call is dispatched. Afterwards the session is only read, so it
/// can be shared across worker threads.
pub struct Session {
    provider: Box<dyn Provider>,
    registry: BTreeMap<String, ResourceFactory>,
    provider_data: Option<ProviderData>,
}

impl Session {
    /// Conform the provider block to the provider schema and configure
    pub fn start(provider: Box<dyn Provider>, block: &AttributeMap) -> Result<Self, Diagnostics> {
        let config = provider.schema().conform(block)?;
        let resp = provider.configure(ProviderConfigureRequest { config });
        if resp.diagnostics.has_error() {
            return Err(resp.diagnostics);
        }

        let registry = resource_registry(provider.as_ref());
        log::debug!(
            "provider {} serves {} resource types",
            provider.metadata().type_name,
            registry.len()
        );

        Ok(Self {
            provider,
            registry,
            provider_data: resp.resource_data,
        })
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Full type names of every resource the provider serves
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    /// Schema of a resource type
    pub fn schema(&self, resource_type: &str) -> Result<Schema, Diagnostics> {
        Ok(self.factory(resource_type)?().schema())
    }

    /// Create and configure a fresh instance of a resource type
    pub fn instantiate(&self, resource_type: &str) -> Result<BoxedResource, Diagnostics> {
        let mut resource = self.factory(resource_type)?();
        let diags = resource.configure(ConfigureRequest {
            provider_data: self.provider_data.clone(),
        });
        if diags.has_error() {
            return Err(diags);
        }
        Ok(resource)
    }

    fn factory(&self, resource_type: &str) -> Result<ResourceFactory, Diagnostics> {
        self.registry.get(resource_type).copied().ok_or_else(|| {
            let mut diags = Diagnostics::new();
            diags.add_error(
                "Invalid resource type",
                format!(
                    "The provider {} does not support resource type \"{}\".",
                    self.provider.metadata().type_name,
                    resource_type
                ),
            );
            diags
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderConfig, UtilProvider};
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn start(block: serde_json::Value) -> Result<Session, Diagnostics> {
        Session::start(
            Box::new(UtilProvider::with_env("test", no_env)),
            block.as_object().unwrap(),
        )
    }

    #[test]
    fn test_start_shares_provider_config() {
        let session = start(json!({"bypass_indestructible": true})).unwrap();
        let data = session.provider_data.as_ref().unwrap();
        assert!(data.downcast::<ProviderConfig>().unwrap().bypass_indestructible);
    }

    #[test]
    fn test_start_rejects_unknown_provider_attribute() {
        let diags = start(json!({"bypass": true})).err().unwrap();
        assert!(diags.has_error());
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let session = start(json!({})).unwrap();
        let diags = session.instantiate("util_nothing").unwrap_err();
        assert_eq!(diags.iter().next().unwrap().summary, "Invalid resource type");
    }

    #[test]
    fn test_resource_types() {
        let session = start(json!({})).unwrap();
        let types: Vec<_> = session.resource_types().collect();
        assert_eq!(types, vec!["util_indestructable", "util_indestructible"]);
        assert!(session.schema("util_indestructible").is_ok());
    }
}
