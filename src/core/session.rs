//! Session backup and rollback.
//!
//! A `SessionState` is owned by the caller and passed into every mutating
//! call, so several projects can be worked on side by side without sharing
//! state. It holds two recovery mechanisms:
//!
//! - a full copy of the project directory, taken once per session
//!   (`create_backup`);
//! - the pre-write content of every file the session has touched
//!   (`rollback`). The first cached content of a path wins.

use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::project::Project;
use crate::refactor::validate::ValidationError;
use crate::utils::io;

#[derive(Debug, Default)]
pub struct SessionState {
    original_files: BTreeMap<PathBuf, String>,
    backup_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackResult {
    pub restored: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ValidationError>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache `content` as the original of `path` unless one is already cached.
    ///
    /// Returns true when this call populated the cache.
    pub fn remember_original(&mut self, path: &Path, content: &str) -> bool {
        if self.original_files.contains_key(path) {
            return false;
        }
        self.original_files
            .insert(path.to_path_buf(), content.to_string());
        true
    }

    pub fn original(&self, path: &Path) -> Option<&str> {
        self.original_files.get(path).map(String::as_str)
    }

    pub fn has_changes(&self) -> bool {
        !self.original_files.is_empty()
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_dir.as_deref()
    }

    /// Copy the project directory to a timestamped sibling folder.
    ///
    /// Idempotent: a second call returns the folder created by the first.
    pub fn create_backup(&mut self, project: &Project, suffix: &str) -> Result<PathBuf> {
        if let Some(existing) = &self.backup_dir {
            return Ok(existing.clone());
        }

        let parent = project.root.parent().ok_or_else(|| {
            Error::internal_io(
                "project root has no parent directory",
                Some(format!("backup {}", project.root.display())),
            )
        })?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let base = format!("{}{}{}", project.name(), suffix, stamp);
        let mut target = parent.join(&base);
        let mut attempt = 1;
        while target.exists() {
            attempt += 1;
            target = parent.join(format!("{}_{}", base, attempt));
        }

        let copied = io::copy_dir_recursive(&project.root, &target)?;
        crate::log_status!(
            "backup",
            "Copied {} file(s) to {}",
            copied,
            target.display()
        );

        self.backup_dir = Some(target.clone());
        Ok(target)
    }

    /// Restore every cached file to its original content.
    ///
    /// Restored paths leave the cache; a path that cannot be written stays
    /// cached and is reported as a failure.
    pub fn rollback(&mut self) -> Result<RollbackResult> {
        if self.original_files.is_empty() {
            return Err(Error::session_nothing_to_rollback());
        }

        let mut restored = Vec::new();
        let mut failures = Vec::new();
        let cached = std::mem::take(&mut self.original_files);

        for (path, content) in cached {
            match io::write_file(&path, &content, "restore") {
                Ok(()) => restored.push(path.display().to_string()),
                Err(e) => {
                    crate::log_status!(
                        "rollback",
                        "Failed to restore {}: {}",
                        path.display(),
                        e.detailed_message()
                    );
                    failures.push(ValidationError::file_access(&path, &e));
                    self.original_files.insert(path, content);
                }
            }
        }

        crate::log_status!("rollback", "Restored {} file(s)", restored.len());

        Ok(RollbackResult { restored, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ReportLayer;
    use std::fs;

    fn project_in(dir: &Path) -> Project {
        let root = dir.join("Sales");
        let def = root.join("Sales.SemanticModel/definition/tables/Sales.tmdl");
        fs::create_dir_all(def.parent().unwrap()).unwrap();
        fs::write(&def, "table Sales\n").unwrap();
        Project::new(root, vec![def], ReportLayer::Legacy(None))
    }

    #[test]
    fn first_write_wins() {
        let mut session = SessionState::new();
        let path = Path::new("/p/model.tmdl");
        assert!(session.remember_original(path, "v1"));
        assert!(!session.remember_original(path, "v2"));
        assert_eq!(session.original(path), Some("v1"));
    }

    #[test]
    fn rollback_on_empty_cache_fails() {
        let err = SessionState::new().rollback().unwrap_err();
        assert_eq!(err.code.as_str(), "session.nothing_to_rollback");
    }

    #[test]
    fn rollback_restores_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let project = project_in(dir.path());
        let file = project.definition_files[0].clone();

        let mut session = SessionState::new();
        session.remember_original(&file, "table Sales\n");
        fs::write(&file, "table 'Order Data'\n").unwrap();

        let result = session.rollback().unwrap();
        assert_eq!(result.restored.len(), 1);
        assert!(result.failures.is_empty());
        assert_eq!(fs::read_to_string(&file).unwrap(), "table Sales\n");
        assert!(!session.has_changes());
        assert!(session.rollback().is_err());
    }

    #[test]
    fn backup_is_sibling_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let project = project_in(dir.path());

        let mut session = SessionState::new();
        let first = session.create_backup(&project, "_backup_").unwrap();
        let second = session.create_backup(&project, "_backup_").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.parent(), project.root.parent());
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Sales_backup_"), "{}", name);
        assert!(first
            .join("Sales.SemanticModel/definition/tables/Sales.tmdl")
            .is_file());
        assert_eq!(session.backup_path(), Some(first.as_path()));
    }
}
