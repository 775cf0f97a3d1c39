use anyhow::{Context, Result};
use declarative::AttributeMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Declared configuration: the provider block and every resource block
///
/// ```toml
/// [provider]
/// bypass_indestructible = false
///
/// [resources.database_guard]
/// type = "util_indestructible"
/// allow_destroy = false
/// error_message = "The primary database lives behind this guard."
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(default)]
    pub provider: AttributeMap,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceBlock {
    /// Full resource type name
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(flatten)]
    pub attributes: AttributeMap,
}

impl DriverConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Load configuration, or an empty one if the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("Config {} does not exist, using empty config", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML configuration")
    }
}
