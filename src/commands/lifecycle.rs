//! Lifecycle commands
//!
//! - `plan` - Show what apply would change
//! - `apply` - Converge persisted state to the configuration
//! - `destroy` - Destroy persisted instances through the destroy guard

use anyhow::{Result, bail};

use crate::Context;
use crate::cli::{ApplyArgs, TargetArgs};
use crate::config::DriverConfig;
use crate::engine::display::{display_diagnostic, display_outcomes, display_plan, print_summary};
use crate::engine::{self, Plan, PlanMode, Session};
use crate::provider::UtilProvider;
use crate::state::StateFile;
use crate::ui;

pub fn plan(ctx: &Context, args: TargetArgs) -> Result<()> {
    let config = DriverConfig::load(&ctx.config_path)?;
    let state = StateFile::load(&ctx.state_path)?;
    let session = start_session(&config)?;

    let plan = engine::plan(
        &session,
        &config,
        &state,
        PlanMode::Apply,
        args.target.as_deref(),
    );
    check_plan(&plan)?;
    display_plan(&plan);
    Ok(())
}

pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = DriverConfig::load(&ctx.config_path)?;
    run(ctx, &config, args, PlanMode::Apply)
}

pub fn destroy(ctx: &Context, args: ApplyArgs) -> Result<()> {
    // Only the provider block matters when destroying
    let config = DriverConfig::load_or_default(&ctx.config_path)?;
    run(ctx, &config, args, PlanMode::Destroy)
}

fn run(ctx: &Context, config: &DriverConfig, args: ApplyArgs, mode: PlanMode) -> Result<()> {
    let mut state = StateFile::load(&ctx.state_path)?;
    let session = start_session(config)?;

    let plan = engine::plan(&session, config, &state, mode, args.target.as_deref());
    check_plan(&plan)?;

    if !ctx.quiet {
        display_plan(&plan);
    }
    if !plan.has_changes() {
        return Ok(());
    }

    if args.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(());
    }

    if !args.yes && !confirm_proceed(mode)? {
        println!();
        ui::error("Aborted");
        return Ok(());
    }

    let outcomes = engine::execute(&session, &plan, args.jobs)?;
    let summary = engine::reconcile(&mut state, &outcomes);
    println!();
    if state.is_dirty() {
        state.save(&ctx.state_path)?;
        if !ctx.quiet {
            ui::success(&format!(
                "State saved to {} (serial {})",
                ctx.state_path.display(),
                state.serial
            ));
        }
    }

    display_outcomes(&outcomes);
    print_summary(&summary, mode);
    log::info!(
        "{} changes, {} failures",
        summary.total_changes(),
        summary.failed
    );

    if !summary.is_success() {
        bail!("{} operation(s) reported errors", summary.failed);
    }
    Ok(())
}

/// Configure the provider from the `[provider]` block
fn start_session(config: &DriverConfig) -> Result<Session> {
    match Session::start(Box::new(UtilProvider::default()), &config.provider) {
        Ok(session) => Ok(session),
        Err(diags) => {
            for diagnostic in &diags {
                display_diagnostic("provider.util", diagnostic);
            }
            bail!("Provider configuration failed")
        }
    }
}

/// Surface plan diagnostics, refusing to continue on errors
fn check_plan(plan: &Plan) -> Result<()> {
    for diagnostic in &plan.diagnostics {
        display_diagnostic("plan", diagnostic);
    }
    if plan.diagnostics.has_error() {
        bail!("Planning failed");
    }

    let (create, update, replace, delete) = plan.counts();
    log::info!(
        "plan: {} to add, {} to change, {} to replace, {} to destroy",
        create,
        update,
        replace,
        delete
    );
    Ok(())
}

/// Confirm with user
fn confirm_proceed(mode: PlanMode) -> Result<bool> {
    use dialoguer::Confirm;
    use std::io::IsTerminal;

    let prompt = match mode {
        PlanMode::Apply => "Apply these changes?",
        PlanMode::Destroy => "Destroy these instances?",
    };
    if !std::io::stdin().is_terminal() {
        ui::warn("Not running interactively; pass --yes to proceed");
        return Ok(false);
    }

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(confirmed)
}
