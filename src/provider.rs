//! The `util` provider
//!
//! Provider configuration resolves a single [`ProviderConfig`] and shares it
//! read-only with every resource instance.

use std::sync::{Arc, OnceLock};

use declarative::{
    Attribute, Provider, ProviderConfigureRequest, ProviderConfigureResponse, ProviderData,
    ProviderMetadata, ResourceFactory, Schema, decode,
};
use serde::Deserialize;

use crate::guard::BYPASS_ENV_VAR;
use crate::resource::indestructible;

/// Provider type name; resource types are prefixed with it
pub const PROVIDER_TYPE_NAME: &str = "util";

/// Provider block as written in configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderModel {
    #[serde(default)]
    pub bypass_indestructible: Option<bool>,
}

/// Resolved provider settings shared by all resource instances
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub bypass_indestructible: bool,
}

impl ProviderConfig {
    /// Resolve settings from the provider block and the environment
    ///
    /// An explicit `bypass_indestructible` wins. Otherwise the environment
    /// variable enables the bypass only when it is exactly `"true"`.
    pub fn resolve(model: &ProviderModel, env_bypass: Option<&str>) -> Self {
        let bypass_indestructible = model
            .bypass_indestructible
            .unwrap_or_else(|| env_bypass == Some("true"));
        Self {
            bypass_indestructible,
        }
    }
}

/// Reads an environment variable
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub struct UtilProvider {
    version: String,
    env: EnvLookup,
    config: OnceLock<Arc<ProviderConfig>>,
}

impl UtilProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self::with_env(version, process_env)
    }

    /// Create a provider that reads the environment through `env`
    pub fn with_env(version: impl Into<String>, env: EnvLookup) -> Self {
        Self {
            version: version.into(),
            env,
            config: OnceLock::new(),
        }
    }
}

impl Default for UtilProvider {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

impl Provider for UtilProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: self.version.clone(),
        }
    }

    fn schema(&self) -> Schema {
        Schema::new().with_attribute(
            "bypass_indestructible",
            Attribute::optional_bool().with_description(
                "Globally bypasses destruction protection on util_indestructible resource that allow it.",
            ),
        )
    }

    fn configure(&self, req: ProviderConfigureRequest) -> ProviderConfigureResponse {
        let mut resp = ProviderConfigureResponse::default();

        let model: ProviderModel = match decode(&req.config) {
            Ok(model) => model,
            Err(err) => {
                resp.diagnostics
                    .add_error("Invalid provider configuration", err.to_string());
                return resp;
            }
        };

        let config = self.config.get_or_init(|| {
            let env_bypass = (self.env)(BYPASS_ENV_VAR);
            let config = ProviderConfig::resolve(&model, env_bypass.as_deref());
            log::debug!(
                "provider configured: bypass_indestructible={}",
                config.bypass_indestructible
            );
            Arc::new(config)
        });

        resp.resource_data = Some(ProviderData::new(Arc::clone(config)));
        resp
    }

    fn resources(&self) -> Vec<ResourceFactory> {
        vec![
            indestructible::new_indestructible,
            indestructible::new_indestructable,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{AttributeMap, resource_registry};
    use serde_json::json;

    fn env_true(_: &str) -> Option<String> {
        Some("true".to_string())
    }

    fn env_yes(_: &str) -> Option<String> {
        Some("yes".to_string())
    }

    fn env_unset(_: &str) -> Option<String> {
        None
    }

    fn config(value: serde_json::Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    fn configured_bypass(provider: &UtilProvider, block: serde_json::Value) -> bool {
        let resp = provider.configure(ProviderConfigureRequest {
            config: config(block),
        });
        assert!(!resp.diagnostics.has_error());
        let data = resp.resource_data.unwrap();
        data.downcast::<ProviderConfig>()
            .unwrap()
            .bypass_indestructible
    }

    #[test]
    fn test_resolve_precedence() {
        let unset = ProviderModel::default();
        let on = ProviderModel {
            bypass_indestructible: Some(true),
        };
        let off = ProviderModel {
            bypass_indestructible: Some(false),
        };

        assert!(!ProviderConfig::resolve(&unset, None).bypass_indestructible);
        assert!(ProviderConfig::resolve(&unset, Some("true")).bypass_indestructible);
        assert!(!ProviderConfig::resolve(&unset, Some("TRUE")).bypass_indestructible);
        assert!(!ProviderConfig::resolve(&unset, Some("1")).bypass_indestructible);
        assert!(ProviderConfig::resolve(&on, None).bypass_indestructible);
        assert!(!ProviderConfig::resolve(&off, Some("true")).bypass_indestructible);
    }

    #[test]
    fn test_env_default_enables_bypass() {
        let provider = UtilProvider::with_env("test", env_true);
        assert!(configured_bypass(&provider, json!({})));
    }

    #[test]
    fn test_explicit_null_falls_back_to_env() {
        let provider = UtilProvider::with_env("test", env_true);
        assert!(configured_bypass(
            &provider,
            json!({"bypass_indestructible": null})
        ));
    }

    #[test]
    fn test_explicit_false_overrides_env() {
        let provider = UtilProvider::with_env("test", env_true);
        assert!(!configured_bypass(
            &provider,
            json!({"bypass_indestructible": false})
        ));
    }

    #[test]
    fn test_other_env_values_do_not_enable() {
        let provider = UtilProvider::with_env("test", env_yes);
        assert!(!configured_bypass(&provider, json!({})));
    }

    #[test]
    fn test_resolved_once() {
        let provider = UtilProvider::with_env("test", env_unset);
        assert!(configured_bypass(
            &provider,
            json!({"bypass_indestructible": true})
        ));
        // A second configure call reuses the first resolution
        assert!(configured_bypass(
            &provider,
            json!({"bypass_indestructible": false})
        ));
        assert!(provider.config.get().unwrap().bypass_indestructible);
    }

    #[test]
    fn test_invalid_block_reports_error() {
        let provider = UtilProvider::with_env("test", env_unset);
        let resp = provider.configure(ProviderConfigureRequest {
            config: config(json!({"bypass_indestructible": "sure"})),
        });
        assert!(resp.diagnostics.has_error());
        assert!(resp.resource_data.is_none());
        assert!(provider.config.get().is_none());
    }

    #[test]
    fn test_metadata_and_resource_types() {
        let provider = UtilProvider::with_env("1.2.3", env_unset);
        let meta = provider.metadata();
        assert_eq!(meta.type_name, "util");
        assert_eq!(meta.version, "1.2.3");

        let registry = resource_registry(&provider);
        let names: Vec<_> = registry.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["util_indestructable", "util_indestructible"]);
    }

    #[test]
    fn test_schema_declares_bypass() {
        let schema = UtilProvider::default().schema();
        let attr = schema.attribute("bypass_indestructible").unwrap();
        assert!(attr.optional);
        assert!(attr.default.is_none());
    }
}
