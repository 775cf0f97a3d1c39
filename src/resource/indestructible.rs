//! Indestructible resource - a graph node that refuses to be destroyed
//!
//! Other resources depend on this node, so the orchestrator must destroy it
//! before them. Refusing that destroy blocks teardown of the whole subgraph
//! until `allow_destroy` is set and applied.

use std::sync::Arc;

use declarative::{
    Attribute, ConfigureRequest, CreateRequest, DeleteRequest, DeleteResponse, Diagnostics,
    ReadRequest, ReplaceTrigger, Resource, Schema, StateResponse, UpdateRequest, decode,
};
use serde::Deserialize;
use serde_json::Value;

use crate::guard::{self, BYPASS_SUMMARY, DENY_DETAIL, DENY_SUMMARY, Decision, GuardPolicy};
use crate::provider::ProviderConfig;

const DESCRIPTION: &str = "
The `util_indestructible` resource creates a node in the resource graph that
cannot be destroyed unless the `allow_destroy` attribute is set to `true` in
the state. This provides a workaround to a
[well-known shortcoming](https://github.com/hashicorp/terraform/issues/17599)
of the `prevent_destroy` lifecycle attribute by exploiting dependency order to
prevent the destruction of resources that are dependencies of the
indestructible resource, since it must be destroyed before the dependencies
are.
";

const LEGACY_DENY_SUMMARY: &str = "Not Allowed";

const LEGACY_DENY_DETAIL: &str =
    "cannot destroy indestructable resource unless allow_destroy is set in state";

/// Persisted attributes of an indestructible instance
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndestructibleModel {
    #[serde(default)]
    pub allow_destroy: Option<bool>,
    #[serde(default)]
    pub allow_bypass: Option<bool>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Only compared against prior state; the content is never interpreted
    #[serde(default)]
    pub protected_value: Option<Value>,
}

impl From<&IndestructibleModel> for GuardPolicy {
    fn from(model: &IndestructibleModel) -> Self {
        Self {
            allow_destroy: model.allow_destroy.unwrap_or(false),
            allow_bypass: model.allow_bypass.unwrap_or(true),
            error_message: model.error_message.clone(),
        }
    }
}

/// Persisted attributes of a legacy `util_indestructable` instance
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyModel {
    #[serde(default)]
    pub allow_destroy: Option<bool>,
}

impl From<&LegacyModel> for GuardPolicy {
    fn from(model: &LegacyModel) -> Self {
        Self {
            allow_destroy: model.allow_destroy.unwrap_or(false),
            allow_bypass: false,
            error_message: None,
        }
    }
}

/// Which externally visible resource type an instance serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// `util_indestructible`
    Indestructible,
    /// `util_indestructable`: `allow_destroy` only, never bypassed
    Legacy,
}

impl Variant {
    fn suffix(&self) -> &'static str {
        match self {
            Variant::Indestructible => "indestructible",
            Variant::Legacy => "indestructable",
        }
    }

    fn supports_bypass(&self) -> bool {
        matches!(self, Variant::Indestructible)
    }

    /// Summary and base detail of the deny diagnostic
    fn deny_text(&self) -> (&'static str, &'static str) {
        match self {
            Variant::Indestructible => (DENY_SUMMARY, DENY_DETAIL),
            Variant::Legacy => (LEGACY_DENY_SUMMARY, LEGACY_DENY_DETAIL),
        }
    }
}

#[derive(Debug)]
pub struct IndestructibleResource {
    variant: Variant,
    config: Option<Arc<ProviderConfig>>,
}

pub fn new_indestructible() -> declarative::BoxedResource {
    Box::new(IndestructibleResource::new(Variant::Indestructible))
}

pub fn new_indestructable() -> declarative::BoxedResource {
    Box::new(IndestructibleResource::new(Variant::Legacy))
}

impl IndestructibleResource {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            config: None,
        }
    }

    /// Provider bypass as seen by this instance; false until configured
    fn provider_bypass(&self) -> bool {
        self.variant.supports_bypass()
            && self
                .config
                .as_ref()
                .is_some_and(|c| c.bypass_indestructible)
    }

    /// Decode attributes with the model of this variant
    fn policy(&self, attributes: &declarative::AttributeMap) -> Result<GuardPolicy, Diagnostics> {
        let decoded = match self.variant {
            Variant::Indestructible => {
                decode::<IndestructibleModel>(attributes).map(|m| GuardPolicy::from(&m))
            }
            Variant::Legacy => decode::<LegacyModel>(attributes).map(|m| GuardPolicy::from(&m)),
        };
        decoded.map_err(|err| {
            let mut diags = Diagnostics::new();
            diags.add_error("Invalid resource data", err.to_string());
            diags
        })
    }

    /// Validate a planned payload and persist it as given
    fn persist(&self, planned: declarative::AttributeMap) -> StateResponse {
        match self.policy(&planned) {
            Ok(_) => StateResponse::with_state(planned),
            Err(diags) => StateResponse::failed(diags),
        }
    }
}

impl Resource for IndestructibleResource {
    fn type_name(&self, provider_type_name: &str) -> String {
        format!("{}_{}", provider_type_name, self.variant.suffix())
    }

    fn schema(&self) -> Schema {
        let schema = Schema::new().with_attribute(
            "allow_destroy",
            Attribute::optional_bool().with_description("Whether to allow destruction."),
        );

        match self.variant {
            Variant::Legacy => schema.with_description("Indestructable resource"),
            Variant::Indestructible => schema
                .with_description(DESCRIPTION)
                .with_attribute(
                    "allow_bypass",
                    Attribute::optional_bool()
                        .with_description(
                            "Whether to allow destruction when `bypass_indestructible` is set on the provider.",
                        )
                        .with_default(true),
                )
                .with_attribute(
                    "error_message",
                    Attribute::optional_string().with_description(
                        "Additional message to include in the error message when attempting to destroy when `allow_destroy` is `false`.",
                    ),
                )
                .with_attribute(
                    "protected_value",
                    Attribute::optional_dynamic()
                        .with_description(
                            "Value whose change forces replacement once it has been set, routing the change through the destroy guard.",
                        )
                        .with_replace(ReplaceTrigger::OnChangeFromSet),
                ),
        }
    }

    fn configure(&mut self, req: ConfigureRequest) -> Diagnostics {
        let mut diags = Diagnostics::new();

        // Provider not configured yet; bypass stays off
        let Some(data) = req.provider_data else {
            return diags;
        };

        match data.downcast::<ProviderConfig>() {
            Ok(config) => self.config = Some(config),
            Err(err) => diags.add_error(
                "Unexpected Resource Configure Type",
                format!("{}. Please report this issue to the provider developers.", err),
            ),
        }
        diags
    }

    fn create(&self, req: CreateRequest) -> StateResponse {
        log::debug!("creating {}", self.variant.suffix());
        self.persist(req.planned)
    }

    fn read(&self, req: ReadRequest) -> StateResponse {
        // no-op
        StateResponse::with_state(req.state)
    }

    fn update(&self, req: UpdateRequest) -> StateResponse {
        log::debug!("updating {}", self.variant.suffix());
        self.persist(req.planned)
    }

    fn delete(&self, req: DeleteRequest) -> DeleteResponse {
        let mut resp = DeleteResponse::default();

        let policy = match self.policy(&req.state) {
            Ok(policy) => policy,
            Err(diags) => {
                resp.diagnostics = diags;
                return resp;
            }
        };

        let (deny_summary, deny_detail) = self.variant.deny_text();
        let decision = guard::evaluate(&policy, self.provider_bypass(), deny_detail);
        log::debug!(
            "{}: destroy {}",
            self.variant.suffix(),
            if decision.permits_destroy() {
                "permitted"
            } else {
                "refused"
            }
        );
        match decision {
            Decision::Allow => {}
            Decision::Warn(detail) => {
                log::warn!("destroy protection bypassed");
                resp.diagnostics.add_warning(BYPASS_SUMMARY, detail);
            }
            Decision::Deny(detail) => resp.diagnostics.add_error(deny_summary, detail),
        }
        resp
    }
}
