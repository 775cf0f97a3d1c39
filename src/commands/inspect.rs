//! Read-only commands: `show` and `schema`

use anyhow::{Context as AnyhowContext, Result};
use declarative::{Diagnostics, Schema};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::Context;
use crate::config::DriverConfig;
use crate::engine::Session;
use crate::engine::display::display_diagnostic;
use crate::provider::UtilProvider;
use crate::state::StateFile;
use crate::ui;

pub fn show(ctx: &Context) -> Result<()> {
    let state = StateFile::load(&ctx.state_path)?;

    if state.resources.is_empty() {
        ui::info("No instances in state");
        return Ok(());
    }

    ui::kv("State", &ctx.state_path.display().to_string());
    ui::kv("Serial", &state.serial.to_string());
    ui::kv("Updated", &state.last_updated.to_rfc3339());

    for (name, instance) in &state.resources {
        ui::header(&format!("{}.{}", instance.resource_type, name));
        if instance.attributes.is_empty() {
            ui::dim("(no attributes)");
        }
        for (key, value) in &instance.attributes {
            ui::kv(key, &ui::format_value(value));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ProviderSchemas {
    provider: ProviderSchemaEntry,
    resources: BTreeMap<String, Schema>,
}

#[derive(Serialize)]
struct ProviderSchemaEntry {
    type_name: String,
    version: String,
    schema: Schema,
}

pub fn schema(_ctx: &Context) -> Result<()> {
    // Schemas are static, so an empty provider block is enough to list them
    let session = Session::start(
        Box::new(UtilProvider::default()),
        &DriverConfig::default().provider,
    )
    .map_err(|diags| {
        report("provider.util", &diags, "Provider rejected an empty configuration")
    })?;
    let metadata = session.provider().metadata();

    let mut resources = BTreeMap::new();
    for resource_type in session.resource_types() {
        let schema = session
            .schema(resource_type)
            .map_err(|diags| report(resource_type, &diags, "No schema available"))?;
        resources.insert(resource_type.to_string(), schema);
    }

    let out = ProviderSchemas {
        provider: ProviderSchemaEntry {
            type_name: metadata.type_name,
            version: metadata.version,
            schema: session.provider().schema(),
        },
        resources,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("Failed to serialize schemas")?
    );
    Ok(())
}

/// Render diagnostics, then fold their summaries into an error
fn report(address: &str, diags: &Diagnostics, message: &str) -> anyhow::Error {
    for diagnostic in diags {
        display_diagnostic(address, diagnostic);
    }
    let summaries: Vec<&str> = diags.iter().map(|d| d.summary.as_str()).collect();
    anyhow::anyhow!("{} ({}): {}", message, address, summaries.join(", "))
}
