//! Batch orchestration: several same-kind renames in one session.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::engine::{apply_plan, plan_rename, ContentOverlay, RenamePlan};
use super::model_index::ModelIndex;
use super::operation::{RenameKind, RenameOperation};
use super::validate::{validate_with, ValidationCategory, ValidationError};
use crate::defaults::RefactorConfig;
use crate::error::{Error, Result};
use crate::project::Project;
use crate::session::SessionState;

/// Per-operation line of a batch result.
#[derive(Debug, Clone, Serialize)]
pub struct RenameSummary {
    pub operation: RenameOperation,
    pub references: usize,
    pub files: Vec<String>,
    pub rule_hits: BTreeMap<&'static str, usize>,
}

impl From<&RenamePlan> for RenameSummary {
    fn from(plan: &RenamePlan) -> Self {
        RenameSummary {
            operation: plan.operation.clone(),
            references: plan.total_references,
            files: plan.files_modified(),
            rule_hits: plan.rule_hits(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub success: bool,
    pub message: String,
    pub kind: RenameKind,
    pub dry_run: bool,
    pub files_modified: Vec<String>,
    pub references_updated: usize,
    /// Whether the canonical-form validator ran for this batch.
    pub validated: bool,
    pub validation_errors: Vec<ValidationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    pub renames: Vec<RenameSummary>,
}

/// Plans produced by running a list of operations, plus the overlay they
/// were chained through (empty unless dry-run).
pub(crate) struct Execution {
    pub plans: Vec<RenamePlan>,
    pub overlay: ContentOverlay,
}

impl Execution {
    pub fn files_modified(&self) -> Vec<String> {
        self.plans
            .iter()
            .flat_map(|p| p.files_modified())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn references(&self) -> usize {
        self.plans.iter().map(|p| p.total_references).sum()
    }

    fn failures(&self) -> Vec<ValidationError> {
        self.plans.iter().flat_map(|p| p.failures.clone()).collect()
    }

    /// Plan failures followed by validator findings, one file-access row per path.
    pub fn findings(&self, validator: Vec<ValidationError>) -> Vec<ValidationError> {
        let mut seen = BTreeSet::new();
        self.failures()
            .into_iter()
            .chain(validator)
            .filter(|e| {
                e.category != ValidationCategory::FileAccessFailure
                    || seen.insert(e.file_path.clone())
            })
            .collect()
    }
}

/// Run `ops` in order. Dry runs chain edits through an overlay; real runs
/// take the backup right before the first write, then apply each plan.
pub(crate) fn execute(
    project: &Project,
    session: &mut SessionState,
    ops: &[RenameOperation],
    config: &RefactorConfig,
    dry_run: bool,
) -> Result<Execution> {
    let mut overlay = ContentOverlay::new();
    let mut plans = Vec::with_capacity(ops.len());

    for op in ops {
        let mut plan = plan_rename(project, op, &overlay)?;

        if dry_run {
            for edit in &plan.edits {
                overlay.insert(edit.path.clone(), edit.new_content.clone());
            }
        } else if !plan.edits.is_empty() {
            if config.auto_backup {
                session.create_backup(project, &config.backup_suffix)?;
            }
            apply_plan(&mut plan, session);
        }

        crate::log_status!(
            "rename",
            "{}{}: {} reference(s) in {} file(s)",
            if dry_run { "[dry-run] " } else { "" },
            op.describe(),
            plan.total_references,
            plan.edits.len()
        );
        plans.push(plan);
    }

    Ok(Execution { plans, overlay })
}

/// Rename several objects of one kind.
///
/// Preconditions (names present, single kind, a loaded model, no
/// collisions when configured) are checked before anything is touched. Per-file failures
/// and validator findings are reported in the result, not as errors.
pub fn batch_rename(
    project: &Project,
    session: &mut SessionState,
    ops: &[RenameOperation],
    config: &RefactorConfig,
    dry_run: bool,
) -> Result<BatchResult> {
    let kind = check_preconditions(project, ops, config)?;

    let execution = execute(project, session, ops, config, dry_run)?;

    let validated = config.validates(kind);
    let validator = if validated {
        validate_with(project, &execution.overlay)
    } else {
        Vec::new()
    };
    let validation_errors = execution.findings(validator);

    let files_modified = execution.files_modified();
    let references_updated = execution.references();
    let success = validation_errors.is_empty();

    let message = format!(
        "{} {} {}(s): {} reference(s) in {} file(s){}",
        if dry_run { "Would rename" } else { "Renamed" },
        ops.len(),
        kind.as_str(),
        references_updated,
        files_modified.len(),
        if success {
            String::new()
        } else {
            format!(", {} validation error(s)", validation_errors.len())
        }
    );

    Ok(BatchResult {
        success,
        message,
        kind,
        dry_run,
        files_modified,
        references_updated,
        validated,
        validation_errors,
        backup_path: session.backup_path().map(|p| p.display().to_string()),
        renames: execution.plans.iter().map(RenameSummary::from).collect(),
    })
}

fn check_preconditions(
    project: &Project,
    ops: &[RenameOperation],
    config: &RefactorConfig,
) -> Result<RenameKind> {
    let Some(first) = ops.first() else {
        return Err(Error::validation_missing_argument(vec!["renames".to_string()]));
    };

    let kinds: BTreeSet<&'static str> = ops.iter().map(|op| op.kind.as_str()).collect();
    if kinds.len() > 1 {
        return Err(Error::rename_mixed_kinds(
            kinds.into_iter().map(String::from).collect(),
        ));
    }

    for op in ops {
        op.validate()?;
    }

    if project.definition_files.is_empty() {
        return Err(Error::project_not_loaded());
    }

    if config.reject_collisions {
        let (mut index, _) = ModelIndex::load(project, &ContentOverlay::new());
        for op in ops {
            if index.collides(op) {
                return Err(Error::rename_name_collision(
                    op.kind.as_str(),
                    op.old_name.clone(),
                    op.new_name.clone(),
                    op.owning_table.clone(),
                ));
            }
            index.record(op);
        }
    }

    Ok(first.kind)
}
