//! Plan and outcome display

use colored::Colorize;
use declarative::{Action, AttributeMap, Diagnostic, Severity};
use similar::{ChangeTag, TextDiff};

use super::executor::{ExecuteSummary, Outcome};
use super::planner::{Plan, PlanMode, PlannedInstance};

/// Display a plan in a user-friendly format
pub fn display_plan(plan: &Plan) {
    if !plan.has_changes() {
        println!();
        println!("  {} No changes. State matches configuration.", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for instance in plan.changes() {
        display_instance(instance);
    }

    let (create, update, replace, delete) = plan.counts();
    println!("│");
    println!(
        "└─ Plan: {} to add, {} to change, {} to replace, {} to destroy",
        create.to_string().green(),
        update.to_string().yellow(),
        replace.to_string().yellow(),
        delete.to_string().red()
    );
}

fn display_instance(instance: &PlannedInstance) {
    let symbol = match instance.action {
        Action::Create => instance.action.symbol().green(),
        Action::Update | Action::Replace { .. } => instance.action.symbol().yellow(),
        Action::Delete => instance.action.symbol().red(),
        Action::NoOp => instance.action.symbol().dimmed(),
    };

    println!(
        "│ {} {} {}",
        symbol,
        instance.address().bold(),
        format!("will {}", instance.action).dimmed()
    );

    if instance.action.destroys() {
        println!(
            "│     {}",
            "destroy goes through the indestructible guard".dimmed()
        );
    }

    for line in attribute_diff(instance.prior.as_ref(), instance.planned.as_ref()) {
        println!("│     {}", line);
    }
}

/// Line-level diff of pretty-printed attributes
fn attribute_diff(prior: Option<&AttributeMap>, planned: Option<&AttributeMap>) -> Vec<String> {
    let render = |attrs: Option<&AttributeMap>| {
        attrs
            .and_then(|a| serde_json::to_string_pretty(a).ok())
            .unwrap_or_default()
    };
    let old = render(prior);
    let new = render(planned);

    TextDiff::from_lines(&old, &new)
        .iter_all_changes()
        .filter_map(|change| {
            let text = change.value().trim_end();
            match change.tag() {
                ChangeTag::Delete => Some(format!("- {}", text).red().to_string()),
                ChangeTag::Insert => Some(format!("+ {}", text).green().to_string()),
                ChangeTag::Equal => None,
            }
        })
        .collect()
}

/// Print one diagnostic attached to an address
pub fn display_diagnostic(address: &str, diagnostic: &Diagnostic) {
    let label = match diagnostic.severity {
        Severity::Error => "Error:".red().bold(),
        Severity::Warning => "Warning:".yellow().bold(),
    };
    println!();
    println!("{} {}", label, diagnostic.summary.bold());
    println!("  {} {}", "with".dimmed(), address);
    for line in diagnostic.detail.lines() {
        println!("  {}", line);
    }
}

/// Print diagnostics for every outcome
pub fn display_outcomes(outcomes: &[Outcome]) {
    for outcome in outcomes {
        let symbol = if outcome.failed() {
            "✗".red()
        } else if outcome.diagnostics.warnings().next().is_some() {
            "⚠".yellow()
        } else {
            "✓".green()
        };
        println!("  {} {} ({})", symbol, outcome.address, outcome.action);
    }
    for outcome in outcomes {
        for diagnostic in &outcome.diagnostics {
            display_diagnostic(&outcome.address, diagnostic);
        }
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, mode: PlanMode) {
    println!();
    let headline = summary_headline(mode, summary.is_success());
    if summary.is_success() {
        println!("  {} {}", "✓".green().bold(), headline);
    } else {
        println!("  {} {}", "⚠".yellow().bold(), headline);
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} resources updated", summary.updated);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.destroyed > 0 {
        println!("    • {} resources destroyed", summary.destroyed);
    }
    if summary.warnings > 0 {
        println!("    • {} {}", summary.warnings, "warnings".yellow());
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

fn summary_headline(mode: PlanMode, success: bool) -> &'static str {
    match (mode, success) {
        (PlanMode::Apply, true) => "Apply complete!",
        (PlanMode::Apply, false) => "Apply finished with errors",
        (PlanMode::Destroy, true) => "Destroy complete!",
        (PlanMode::Destroy, false) => "Destroy finished with errors",
    }
}
