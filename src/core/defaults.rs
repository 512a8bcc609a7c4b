use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-project settings file, next to the `.pbip` file.
pub const CONFIG_FILE: &str = ".pbip-refactor.json";

/// Which batches are gated on the canonical-form validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Validate after every batch.
    #[default]
    AllKinds,
    /// Validate after table batches only; column and measure batches
    /// succeed whatever the validator would say.
    TablesOnly,
}

/// Settings read from `.pbip-refactor.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactorConfig {
    #[serde(default = "default_auto_backup")]
    pub auto_backup: bool,

    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    #[serde(default = "default_reject_collisions")]
    pub reject_collisions: bool,

    #[serde(default)]
    pub validation: ValidationPolicy,
}

impl Default for RefactorConfig {
    fn default() -> Self {
        Self {
            auto_backup: default_auto_backup(),
            backup_suffix: default_backup_suffix(),
            reject_collisions: default_reject_collisions(),
            validation: ValidationPolicy::default(),
        }
    }
}

impl RefactorConfig {
    /// Whether a batch of `kind` runs the validator under this policy.
    pub fn validates(&self, kind: crate::refactor::RenameKind) -> bool {
        match self.validation {
            ValidationPolicy::AllKinds => true,
            ValidationPolicy::TablesOnly => kind == crate::refactor::RenameKind::Table,
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_auto_backup() -> bool {
    true
}

fn default_backup_suffix() -> String {
    "_backup_".to_string()
}

fn default_reject_collisions() -> bool {
    true
}

// =============================================================================
// Loading functions
// =============================================================================

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Load the project config, falling back to defaults on any error.
pub fn load_config(root: &Path) -> RefactorConfig {
    load_config_from_file(root).unwrap_or_default()
}

fn load_config_from_file(root: &Path) -> crate::Result<RefactorConfig> {
    let path = config_path(root);

    let content = fs::read_to_string(&path).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        crate::Error::validation_invalid_json(e, Some(format!("parse {}", CONFIG_FILE)), None)
    })
}

/// Save config to the project folder (creates if missing).
pub fn save_config(root: &Path, config: &RefactorConfig) -> crate::Result<()> {
    let path = config_path(root);

    let content = serde_json::to_string_pretty(config).map_err(|e| {
        crate::Error::internal_json(e.to_string(), Some(format!("serialize {}", CONFIG_FILE)))
    })?;

    fs::write(&path, content).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("write {}", path.display())))
    })?;

    Ok(())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> RefactorConfig {
    RefactorConfig::default()
}
