//! Execution engine - runs planned actions through the lifecycle verbs

use anyhow::{Context as AnyhowContext, Result};
use declarative::{
    Action, AttributeMap, CreateRequest, DeleteRequest, Diagnostics, UpdateRequest,
};
use rayon::prelude::*;

use super::planner::{Plan, PlannedInstance};
use super::session::Session;
use crate::state::{InstanceState, StateFile};

/// What happens to the persisted state of one instance
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Leave whatever is persisted untouched
    Keep,
    /// Persist new attributes
    Put(InstanceState),
    /// Remove the instance from state
    Remove,
}

/// Result of executing one planned instance
#[derive(Debug, Clone)]
pub struct Outcome {
    pub address: String,
    pub name: String,
    pub action: Action,
    pub diagnostics: Diagnostics,
    pub change: StateChange,
}

impl Outcome {
    pub fn failed(&self) -> bool {
        self.diagnostics.has_error()
    }
}

/// Summary of execution results
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub destroyed: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.destroyed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Add an outcome to the summary
    pub fn add_outcome(&mut self, outcome: &Outcome) {
        self.warnings += outcome.diagnostics.warnings().count();
        if outcome.failed() {
            self.failed += 1;
            return;
        }
        match outcome.action {
            Action::Create => self.created += 1,
            Action::Update => self.updated += 1,
            Action::Replace { .. } => self.replaced += 1,
            Action::Delete => self.destroyed += 1,
            Action::NoOp => {}
        }
    }
}

/// Execute every change in the plan
///
/// Distinct instances run in parallel on a pool of `jobs` threads. Outcomes
/// come back in plan order.
pub fn execute(session: &Session, plan: &Plan, jobs: usize) -> Result<Vec<Outcome>> {
    let changes: Vec<&PlannedInstance> = plan.changes().collect();
    if changes.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create apply thread pool")?;

    let outcomes: Vec<Outcome> = pool.install(|| {
        changes
            .par_iter()
            .map(|instance| execute_instance(session, instance))
            .collect()
    });

    Ok(outcomes)
}

/// Fold outcomes into the state file
pub fn reconcile(state: &mut StateFile, outcomes: &[Outcome]) -> ExecuteSummary {
    let mut summary = ExecuteSummary::default();
    for outcome in outcomes {
        match &outcome.change {
            StateChange::Keep => {}
            StateChange::Put(instance) => state.put(&outcome.name, instance.clone()),
            StateChange::Remove => {
                state.remove(&outcome.name);
            }
        }
        summary.add_outcome(outcome);
    }
    summary
}

fn execute_instance(session: &Session, instance: &PlannedInstance) -> Outcome {
    let mut diagnostics = Diagnostics::new();
    let change = match &instance.action {
        Action::NoOp => StateChange::Keep,
        Action::Create => create(session, instance, &mut diagnostics),
        Action::Update => update(session, instance, &mut diagnostics),
        Action::Delete => match delete(session, instance, &mut diagnostics) {
            true => StateChange::Remove,
            false => StateChange::Keep,
        },
        Action::Replace { .. } => {
            if delete(session, instance, &mut diagnostics) {
                match create(session, instance, &mut diagnostics) {
                    StateChange::Keep => StateChange::Remove,
                    put => put,
                }
            } else {
                log::debug!("{}: destroy refused, skipping create", instance.name);
                StateChange::Keep
            }
        }
    };

    Outcome {
        address: instance.address(),
        name: instance.name.clone(),
        action: instance.action.clone(),
        diagnostics,
        change,
    }
}

fn create(session: &Session, instance: &PlannedInstance, diags: &mut Diagnostics) -> StateChange {
    let (Some(resource_type), Some(planned)) = (&instance.planned_type, &instance.planned) else {
        diags.add_error("Invalid plan", format!("{} has nothing to create", instance.name));
        return StateChange::Keep;
    };
    let resource = match session.instantiate(resource_type) {
        Ok(resource) => resource,
        Err(d) => {
            diags.append(d);
            return StateChange::Keep;
        }
    };

    let resp = resource.create(CreateRequest {
        planned: planned.clone(),
    });
    persisted(resource_type, resp.state, resp.diagnostics, diags)
}

fn update(session: &Session, instance: &PlannedInstance, diags: &mut Diagnostics) -> StateChange {
    let (Some(resource_type), Some(prior), Some(planned)) =
        (&instance.planned_type, &instance.prior, &instance.planned)
    else {
        diags.add_error("Invalid plan", format!("{} has nothing to update", instance.name));
        return StateChange::Keep;
    };
    let resource = match session.instantiate(resource_type) {
        Ok(resource) => resource,
        Err(d) => {
            diags.append(d);
            return StateChange::Keep;
        }
    };

    let resp = resource.update(UpdateRequest {
        prior: prior.clone(),
        planned: planned.clone(),
    });
    persisted(resource_type, resp.state, resp.diagnostics, diags)
}

/// Returns whether the instance was removed
fn delete(session: &Session, instance: &PlannedInstance, diags: &mut Diagnostics) -> bool {
    let (Some(resource_type), Some(prior)) = (&instance.prior_type, &instance.prior) else {
        // Nothing persisted, nothing to destroy
        return true;
    };
    let resource = match session.instantiate(resource_type) {
        Ok(resource) => resource,
        Err(d) => {
            diags.append(d);
            return false;
        }
    };

    let resp = resource.delete(DeleteRequest {
        state: prior.clone(),
    });
    let removed = resp.removed();
    diags.append(resp.diagnostics);
    removed
}

fn persisted(
    resource_type: &str,
    state: Option<AttributeMap>,
    resp_diags: Diagnostics,
    diags: &mut Diagnostics,
) -> StateChange {
    let failed = resp_diags.has_error();
    diags.append(resp_diags);
    match state {
        Some(attributes) if !failed => StateChange::Put(InstanceState {
            resource_type: resource_type.to_string(),
            attributes,
        }),
        _ => StateChange::Keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::engine::planner::{PlanMode, plan};
    use crate::provider::UtilProvider;
    use declarative::Severity;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_true(_: &str) -> Option<String> {
        Some("true".to_string())
    }

    fn session_with(provider: UtilProvider, block: &str) -> Session {
        let config = DriverConfig::parse(block).unwrap();
        Session::start(Box::new(provider), &config.provider)
            .ok()
            .unwrap()
    }

    fn session(provider_block: &str) -> Session {
        session_with(UtilProvider::with_env("test", no_env), provider_block)
    }

    /// Plan and execute against `state`, returning the outcomes
    fn run(
        session: &Session,
        toml: &str,
        state: &mut StateFile,
        mode: PlanMode,
    ) -> (Vec<Outcome>, ExecuteSummary) {
        let config = DriverConfig::parse(toml).unwrap();
        let plan = plan(session, &config, state, mode, None);
        assert!(plan.diagnostics.is_empty(), "{:?}", plan.diagnostics);
        let outcomes = execute(session, &plan, 2).unwrap();
        let summary = reconcile(state, &outcomes);
        (outcomes, summary)
    }

    const GUARD: &str = "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = false\n";

    #[test]
    fn test_create_then_destroy_is_denied() {
        let session = session("");
        let mut state = StateFile::default();

        let (_, summary) = run(&session, GUARD, &mut state, PlanMode::Apply);
        assert_eq!(summary.created, 1);
        assert!(state.get("guard").is_some());

        let (outcomes, summary) = run(&session, GUARD, &mut state, PlanMode::Destroy);
        assert_eq!(summary.failed, 1);
        assert_eq!(outcomes[0].change, StateChange::Keep);
        let diag = outcomes[0].diagnostics.iter().next().unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.summary, "Destruction Not Allowed");
        assert!(state.get("guard").is_some());
    }

    #[test]
    fn test_allow_destroy_then_destroy_succeeds() {
        let session = session("");
        let mut state = StateFile::default();
        run(&session, GUARD, &mut state, PlanMode::Apply);

        let allowed = "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = true\n";
        let (_, summary) = run(&session, allowed, &mut state, PlanMode::Apply);
        assert_eq!(summary.updated, 1);
        assert_eq!(
            state.get("guard").unwrap().attributes["allow_destroy"],
            json!(true)
        );

        let (outcomes, summary) = run(&session, allowed, &mut state, PlanMode::Destroy);
        assert_eq!(summary.destroyed, 1);
        assert!(outcomes[0].diagnostics.is_empty());
        assert!(state.get("guard").is_none());
    }

    #[test]
    fn test_provider_bypass_warns_and_destroys() {
        let session = session("[provider]\nbypass_indestructible = true\n");
        let mut state = StateFile::default();
        let guard = "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = false\nallow_bypass = true\n";
        run(&session, guard, &mut state, PlanMode::Apply);

        let (outcomes, summary) = run(&session, guard, &mut state, PlanMode::Destroy);
        assert_eq!(summary.destroyed, 1);
        assert_eq!(summary.warnings, 1);
        let diag = outcomes[0].diagnostics.iter().next().unwrap();
        assert_eq!(diag.severity, Severity::Warning);
        assert!(state.get("guard").is_none());
    }

    #[test]
    fn test_instance_refuses_provider_bypass() {
        let session = session("[provider]\nbypass_indestructible = true\n");
        let mut state = StateFile::default();
        let guard = "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = false\nallow_bypass = false\n";
        run(&session, guard, &mut state, PlanMode::Apply);

        let (_, summary) = run(&session, guard, &mut state, PlanMode::Destroy);
        assert_eq!(summary.failed, 1);
        assert!(state.get("guard").is_some());
    }

    #[test]
    fn test_env_bypass_without_provider_attribute() {
        let session = session_with(UtilProvider::with_env("test", env_true), "");
        let mut state = StateFile::default();
        run(&session, GUARD, &mut state, PlanMode::Apply);

        let (_, summary) = run(&session, GUARD, &mut state, PlanMode::Destroy);
        assert_eq!(summary.destroyed, 1);
        assert_eq!(summary.warnings, 1);
    }

    #[test]
    fn test_removing_declaration_goes_through_guard() {
        let session = session("");
        let mut state = StateFile::default();
        run(&session, GUARD, &mut state, PlanMode::Apply);

        let (_, summary) = run(&session, "", &mut state, PlanMode::Apply);
        assert_eq!(summary.failed, 1);
        assert!(state.get("guard").is_some());
    }

    #[test]
    fn test_protected_value_change_is_guarded() {
        let session = session("");
        let mut state = StateFile::default();
        let v1 = "[resources.guard]\ntype = \"util_indestructible\"\nprotected_value = \"v1\"\n";
        let v2 = "[resources.guard]\ntype = \"util_indestructible\"\nprotected_value = \"v2\"\n";
        run(&session, v1, &mut state, PlanMode::Apply);

        let (outcomes, summary) = run(&session, v2, &mut state, PlanMode::Apply);
        assert!(matches!(outcomes[0].action, Action::Replace { .. }));
        assert_eq!(summary.failed, 1);
        assert_eq!(
            state.get("guard").unwrap().attributes["protected_value"],
            json!("v1")
        );
    }

    #[test]
    fn test_replacement_after_consent() {
        let session = session("");
        let mut state = StateFile::default();
        let v1 = "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = true\nprotected_value = \"v1\"\n";
        let v2 = "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = true\nprotected_value = \"v2\"\n";
        run(&session, v1, &mut state, PlanMode::Apply);

        let (_, summary) = run(&session, v2, &mut state, PlanMode::Apply);
        assert_eq!(summary.replaced, 1);
        assert_eq!(
            state.get("guard").unwrap().attributes["protected_value"],
            json!("v2")
        );
    }

    #[test]
    fn test_first_protected_value_updates_in_place() {
        let session = session("");
        let mut state = StateFile::default();
        run(&session, GUARD, &mut state, PlanMode::Apply);

        let pinned = "[resources.guard]\ntype = \"util_indestructible\"\nallow_destroy = false\nprotected_value = { id = 1 }\n";
        let (_, summary) = run(&session, pinned, &mut state, PlanMode::Apply);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_independent_instances_run_in_parallel() {
        let session = session("");
        let mut state = StateFile::default();
        let many: String = (0..8)
            .map(|i| format!("[resources.g{i}]\ntype = \"util_indestructible\"\nallow_destroy = {}\n", i % 2 == 0))
            .collect();
        run(&session, &many, &mut state, PlanMode::Apply);
        assert_eq!(state.resources.len(), 8);

        let (outcomes, summary) = run(&session, &many, &mut state, PlanMode::Destroy);
        assert_eq!(outcomes.len(), 8);
        assert_eq!(summary.destroyed, 4);
        assert_eq!(summary.failed, 4);
        assert_eq!(state.resources.len(), 4);
    }

    #[test]
    fn test_empty_plan_executes_nothing() {
        let session = session("");
        let plan = Plan::default();
        assert!(execute(&session, &plan, 4).unwrap().is_empty());
    }
}
