//! Quoting normalization.
//!
//! Rewrites every bare reference to a declared table whose name requires
//! quoting into the quoted spelling. Each such table is put through a table
//! rename onto itself: the quoted-form rules find nothing to change, the
//! bare-form rules rewrite exactly the unquoted spellings. A second run
//! therefore changes nothing.
//!
//! Longer names go first, so `Zoo Z Data[...]` is requoted as a whole before
//! `Z Data` is considered.

use serde::Serialize;
use std::cmp::Reverse;

use super::batch::{execute, BatchResult, RenameSummary};
use super::engine::{current_content, ContentOverlay, RenamePlan};
use super::operation::{RenameKind, RenameOperation};
use super::quoting::needs_quoting;
use super::validate::{declared_tables, validate_with};
use crate::defaults::RefactorConfig;
use crate::error::Result;
use crate::project::Project;
use crate::session::SessionState;

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeResult {
    /// Tables that had at least one reference requoted.
    pub tables_fixed: Vec<String>,
    #[serde(flatten)]
    pub outcome: BatchResult,
}

pub fn normalize_quoting(
    project: &Project,
    session: &mut SessionState,
    config: &RefactorConfig,
    dry_run: bool,
) -> Result<NormalizeResult> {
    // Unreadable files are skipped here; the validator reports them.
    let documents: Vec<String> = project
        .definition_files
        .iter()
        .filter_map(|path| current_content(path, &ContentOverlay::new()).ok())
        .collect();

    let mut tables: Vec<String> = declared_tables(documents.iter().map(String::as_str))
        .into_iter()
        .filter(|name| needs_quoting(name))
        .collect();
    tables.sort_by_key(|name| Reverse(name.len()));

    let ops: Vec<RenameOperation> = tables
        .iter()
        .map(|name| RenameOperation::table(name, name))
        .collect();

    crate::log_status!("normalize", "{} table name(s) require quoting", ops.len());

    let execution = execute(project, session, &ops, config, dry_run)?;

    let fixed: Vec<&RenamePlan> = execution
        .plans
        .iter()
        .filter(|p| p.total_references > 0)
        .collect();
    let files_modified = execution.files_modified();
    let references_updated = execution.references();
    let validation_errors = execution.findings(validate_with(project, &execution.overlay));
    let success = validation_errors.is_empty();

    let message = format!(
        "{} {} reference(s) for {} table(s) in {} file(s)",
        if dry_run { "Would requote" } else { "Requoted" },
        references_updated,
        fixed.len(),
        files_modified.len()
    );
    crate::log_status!("normalize", "{}", message);

    Ok(NormalizeResult {
        tables_fixed: fixed.iter().map(|p| p.operation.old_name.clone()).collect(),
        outcome: BatchResult {
            success,
            message,
            kind: RenameKind::Table,
            dry_run,
            files_modified,
            references_updated,
            validated: true,
            validation_errors,
            backup_path: session.backup_path().map(|p| p.display().to_string()),
            renames: fixed.into_iter().map(RenameSummary::from).collect(),
        },
    })
}
