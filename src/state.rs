use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::AttributeMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Persisted state of every managed instance
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    /// Format version
    pub version: u32,

    /// Incremented on every save that changed an instance
    #[serde(default)]
    pub serial: u64,

    /// Last time an instance changed
    pub last_updated: DateTime<Utc>,

    /// Instances keyed by name
    #[serde(default)]
    pub resources: BTreeMap<String, InstanceState>,

    #[serde(skip)]
    dirty: bool,
}

/// Persisted snapshot of one instance
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InstanceState {
    /// Full resource type name (e.g., "util_indestructible")
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Attributes exactly as returned by the last create or update
    pub attributes: AttributeMap,
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    pub const VERSION: u32 = 1;

    /// Load state from disk, or return empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version != Self::VERSION {
            anyhow::bail!(
                "Unsupported state version {} in {} (expected {})",
                state.version,
                path.display(),
                Self::VERSION
            );
        }

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    ///
    /// Bumps the serial and timestamp when an instance changed since load.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if self.dirty {
            self.serial += 1;
            self.last_updated = Utc::now();
        }

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        self.dirty = false;
        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&InstanceState> {
        self.resources.get(name)
    }

    /// Record the state returned by create or update
    pub fn put(&mut self, name: &str, instance: InstanceState) {
        self.resources.insert(name.to_string(), instance);
        self.dirty = true;
    }

    /// Forget an instance after a successful destroy
    pub fn remove(&mut self, name: &str) -> Option<InstanceState> {
        let removed = self.resources.remove(name);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Whether an instance changed since the last load or save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: Self::VERSION,
            serial: 0,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
            dirty: false,
        }
    }
}

/// Expand `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

// ============================================================================
// Tests
// ============================================================================
