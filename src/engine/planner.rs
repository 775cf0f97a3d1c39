//! Planner - diffs declared resources against persisted state

use std::collections::BTreeSet;

use declarative::{Action, AttributeMap, Diagnostics, ReadRequest, plan_action};

use super::session::Session;
use crate::config::DriverConfig;
use crate::state::StateFile;

/// Whether the plan converges to the configuration or tears everything down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    Apply,
    Destroy,
}

/// The planned change for one named instance
#[derive(Debug, Clone)]
pub struct PlannedInstance {
    pub name: String,
    pub action: Action,
    /// Type recorded in state, if any
    pub prior_type: Option<String>,
    /// Type declared in configuration, if any
    pub planned_type: Option<String>,
    /// Refreshed prior attributes
    pub prior: Option<AttributeMap>,
    /// Attributes conformed to the schema
    pub planned: Option<AttributeMap>,
}

impl PlannedInstance {
    /// Type shown to the user: the declared one, else the persisted one
    pub fn display_type(&self) -> &str {
        self.planned_type
            .as_deref()
            .or(self.prior_type.as_deref())
            .unwrap_or("unknown")
    }

    /// Address in `type.name` form
    pub fn address(&self) -> String {
        format!("{}.{}", self.display_type(), self.name)
    }
}

/// A full plan
#[derive(Debug, Default)]
pub struct Plan {
    pub instances: Vec<PlannedInstance>,
    /// Errors found while refreshing or conforming; a plan with errors is not executed
    pub diagnostics: Diagnostics,
}

impl Plan {
    /// Instances whose action is not a no-op
    pub fn changes(&self) -> impl Iterator<Item = &PlannedInstance> {
        self.instances.iter().filter(|i| i.action.is_change())
    }

    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Count of (create, update, replace, delete) actions
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        self.instances
            .iter()
            .fold((0, 0, 0, 0), |(c, u, r, d), i| match i.action {
                Action::Create => (c + 1, u, r, d),
                Action::Update => (c, u + 1, r, d),
                Action::Replace { .. } => (c, u, r + 1, d),
                Action::Delete => (c, u, r, d + 1),
                Action::NoOp => (c, u, r, d),
            })
    }
}

/// Build a plan
///
/// Every persisted instance is refreshed through its read verb first.
/// `target` restricts the plan to a single instance name.
pub fn plan(
    session: &Session,
    config: &DriverConfig,
    state: &StateFile,
    mode: PlanMode,
    target: Option<&str>,
) -> Plan {
    let mut plan = Plan::default();

    let declared: BTreeSet<&str> = match mode {
        PlanMode::Apply => config.resources.keys().map(String::as_str).collect(),
        PlanMode::Destroy => BTreeSet::new(),
    };
    let names: BTreeSet<&str> = declared
        .iter()
        .copied()
        .chain(state.resources.keys().map(String::as_str))
        .filter(|name| target.is_none_or(|t| t == *name))
        .collect();

    for name in names {
        let prior_type = state.get(name).map(|i| i.resource_type.clone());
        let prior = match state.get(name) {
            Some(instance) => match refresh(session, &instance.resource_type, &instance.attributes) {
                Ok(attrs) => Some(attrs),
                Err(diags) => {
                    plan.diagnostics.append(diags);
                    continue;
                }
            },
            None => None,
        };

        let block = declared
            .contains(name)
            .then(|| &config.resources[name]);
        let planned_type = block.map(|b| b.resource_type.clone());
        let planned = match block {
            Some(block) => match session
                .schema(&block.resource_type)
                .and_then(|schema| schema.conform(&block.attributes))
            {
                Ok(attrs) => Some(attrs),
                Err(diags) => {
                    plan.diagnostics.append(diags);
                    continue;
                }
            },
            None => None,
        };

        let action = match (&prior_type, &planned_type) {
            (Some(from), Some(to)) if from != to => Action::Replace {
                because: vec!["type".to_string()],
            },
            (_, Some(to)) => match session.schema(to) {
                Ok(schema) => plan_action(&schema, prior.as_ref(), planned.as_ref()),
                Err(diags) => {
                    plan.diagnostics.append(diags);
                    continue;
                }
            },
            _ => plan_action(&Default::default(), prior.as_ref(), planned.as_ref()),
        };

        log::debug!("{}: {}", name, action);
        plan.instances.push(PlannedInstance {
            name: name.to_string(),
            action,
            prior_type,
            planned_type,
            prior,
            planned,
        });
    }

    if let Some(t) = target
        && plan.instances.is_empty()
        && !plan.diagnostics.has_error()
    {
        log::info!("target {} matched no declared or persisted instance", t);
    }

    plan
}

/// Run the read verb against persisted attributes
fn refresh(
    session: &Session,
    resource_type: &str,
    attributes: &AttributeMap,
) -> Result<AttributeMap, Diagnostics> {
    let resource = session.instantiate(resource_type)?;
    let resp = resource.read(ReadRequest {
        state: attributes.clone(),
    });
    if resp.diagnostics.has_error() {
        return Err(resp.diagnostics);
    }
    Ok(resp.state.unwrap_or_else(|| attributes.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::UtilProvider;
    use crate::state::InstanceState;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn session() -> Session {
        Session::start(
            Box::new(UtilProvider::with_env("test", no_env)),
            &AttributeMap::new(),
        )
        .ok()
        .unwrap()
    }

    fn persisted(attrs: serde_json::Value) -> StateFile {
        let mut state = StateFile::default();
        state.put(
            "guard",
            InstanceState {
                resource_type: "util_indestructible".to_string(),
                attributes: attrs.as_object().cloned().unwrap(),
            },
        );
        state
    }

    fn config(toml: &str) -> DriverConfig {
        DriverConfig::parse(toml).unwrap()
    }

    #[test]
    fn test_plan_create_fills_defaults() {
        let config = config("[resources.guard]\ntype = \"util_indestructible\"\n");
        let plan = plan(&session(), &config, &StateFile::default(), PlanMode::Apply, None);

        assert!(plan.diagnostics.is_empty());
        let guard = &plan.instances[0];
        assert_eq!(guard.action, Action::Create);
        assert_eq!(guard.planned.as_ref().unwrap()["allow_bypass"], json!(true));
        assert_eq!(plan.counts(), (1, 0, 0, 0));
    }

    #[test]
    fn test_plan_no_changes() {
        let config = config("[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = false\n");
        let state = persisted(json!({
            "allow_destroy": false,
            "allow_bypass": true,
            "error_message": null,
            "protected_value": null
        }));
        let plan = plan(&session(), &config, &state, PlanMode::Apply, None);
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_plan_update_and_replace() {
        let state = persisted(json!({"allow_destroy": false, "protected_value": "v1"}));

        let update = config(
            "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = true\nprotected_value = \"v1\"\n",
        );
        let p = plan(&session(), &update, &state, PlanMode::Apply, None);
        assert_eq!(p.instances[0].action, Action::Update);

        let replace = config(
            "[resources.guard]\ntype = \"util_indestructible\"\nprotected_value = \"v2\"\n",
        );
        let p = plan(&session(), &replace, &state, PlanMode::Apply, None);
        assert_eq!(
            p.instances[0].action,
            Action::Replace {
                because: vec!["protected_value".to_string()]
            }
        );
    }

    #[test]
    fn test_plan_type_change_replaces() {
        let state = persisted(json!({"allow_destroy": true}));
        let config = config("[resources.guard]\ntype = \"util_indestructable\"\nallow_destroy = true\n");
        let p = plan(&session(), &config, &state, PlanMode::Apply, None);
        assert_eq!(
            p.instances[0].action,
            Action::Replace {
                because: vec!["type".to_string()]
            }
        );
    }

    #[test]
    fn test_plan_undeclared_instance_is_deleted() {
        let state = persisted(json!({"allow_destroy": false}));
        let p = plan(&session(), &DriverConfig::default(), &state, PlanMode::Apply, None);
        assert_eq!(p.instances[0].action, Action::Delete);
        assert_eq!(p.instances[0].address(), "util_indestructible.guard");
    }

    #[test]
    fn test_plan_destroy_mode_ignores_config() {
        let config = config("[resources.guard]\ntype = \"util_indestructible\"\n[resources.other]\ntype = \"util_indestructible\"\n");
        let state = persisted(json!({"allow_destroy": false}));
        let p = plan(&session(), &config, &state, PlanMode::Destroy, None);
        assert_eq!(p.instances.len(), 1);
        assert_eq!(p.instances[0].action, Action::Delete);
    }

    #[test]
    fn test_plan_target_filters() {
        let config = config("[resources.a]\ntype = \"util_indestructible\"\n[resources.b]\ntype = \"util_indestructible\"\n");
        let p = plan(&session(), &config, &StateFile::default(), PlanMode::Apply, Some("b"));
        assert_eq!(p.instances.len(), 1);
        assert_eq!(p.instances[0].name, "b");
    }

    #[test]
    fn test_plan_reports_bad_attributes() {
        let config = config("[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = \"yes\"\n");
        let p = plan(&session(), &config, &StateFile::default(), PlanMode::Apply, None);
        assert!(p.diagnostics.has_error());
        assert!(p.instances.is_empty());
    }

    #[test]
    fn test_plan_legacy_rejects_bypass_attribute() {
        let config = config("[resources.old]\ntype = \"util_indestructable\"\nallow_bypass = true\n");
        let p = plan(&session(), &config, &StateFile::default(), PlanMode::Apply, None);
        assert!(p.diagnostics.has_error());
    }

    #[test]
    fn test_plan_unknown_type() {
        let config = config("[resources.guard]\ntype = \"util_unbreakable\"\n");
        let p = plan(&session(), &config, &StateFile::default(), PlanMode::Apply, None);
        assert_eq!(
            p.diagnostics.iter().next().unwrap().summary,
            "Invalid resource type"
        );
    }
}
