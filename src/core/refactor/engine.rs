//! Rewrite engine: apply one rename operation to a project.
//!
//! Planning and applying are split the same way as the rest of the refactor
//! commands: `plan_rename` computes per-file edits without touching disk,
//! `apply_plan` caches originals in the session and writes. A plan can be
//! computed against an in-memory overlay so that dry-run batches see the
//! effect of earlier operations.
//!
//! Per file, the structural pass (column renames in per-visual report
//! documents) runs first, then the text rules in catalog order. A
//! `Property` string that both strategies could claim is therefore decided
//! by the structural pass; the text rules only see what it left behind.
//!
//! A bare table spelling that is only the last words of a longer declared
//! table (`Sales Data` inside `Leads Sales Data[Amount]`) is not a reference
//! to the shorter table and is skipped.

use regex::Captures;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::catalog::{self, CompiledRule, Guard};
use super::operation::{RenameKind, RenameOperation};
use super::quoting::unquote;
use super::structural;
use super::validate::{
    declaration_name, declared_tables, extends_to_longer_table, ValidationError,
};
use crate::error::Result;
use crate::project::{FileFamily, Project};
use crate::session::SessionState;
use crate::utils::io;

/// In-memory file content that takes precedence over disk.
pub type ContentOverlay = BTreeMap<PathBuf, String>;

// ============================================================================
// Types
// ============================================================================

/// Result of rewriting one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRewrite {
    pub content: String,
    pub replacements: usize,
    pub rule_hits: BTreeMap<&'static str, usize>,
}

/// An edit to apply to one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileEdit {
    pub file: String,
    pub family: FileFamily,
    pub replacements: usize,
    pub rule_hits: BTreeMap<&'static str, usize>,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(skip)]
    pub original_content: String,
    #[serde(skip)]
    pub new_content: String,
}

/// Planned (and possibly applied) outcome of one rename operation.
#[derive(Debug, Clone, Serialize)]
pub struct RenamePlan {
    pub operation: RenameOperation,
    pub edits: Vec<FileEdit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ValidationError>,
    pub total_references: usize,
    pub applied: bool,
}

impl RenamePlan {
    pub fn files_modified(&self) -> Vec<String> {
        self.edits.iter().map(|e| e.file.clone()).collect()
    }

    /// Occurrences per catalog rule, summed over files.
    pub fn rule_hits(&self) -> BTreeMap<&'static str, usize> {
        let mut hits = BTreeMap::new();
        for edit in &self.edits {
            for (rule, count) in &edit.rule_hits {
                *hits.entry(*rule).or_insert(0) += count;
            }
        }
        hits
    }
}

// ============================================================================
// Content rewriting
// ============================================================================

/// Apply every rule for `op` in `family` to `content`.
///
/// Only the tables declared in `content` itself are known here; use
/// [`plan_rename`] to rewrite with the whole model in view.
pub fn rewrite_content(
    content: &str,
    op: &RenameOperation,
    family: FileFamily,
) -> Result<ContentRewrite> {
    let rules = catalog::compile(op, family)?;
    let declared = declared_tables(std::iter::once(content));
    Ok(rewrite_with(content, op, family, &rules, &declared))
}

fn rewrite_with(
    content: &str,
    op: &RenameOperation,
    family: FileFamily,
    rules: &[CompiledRule],
    declared: &BTreeSet<String>,
) -> ContentRewrite {
    let mut current = content.to_string();
    let mut rule_hits = BTreeMap::new();
    let mut replacements = 0;

    for rule in catalog::structural_rules(op.kind, family) {
        let (next, count) = structural::rewrite_entity_property(
            &current,
            op.table_name(),
            &op.old_name,
            &op.new_name,
        );
        if count > 0 {
            current = next;
            replacements += count;
            rule_hits.insert(rule.id, count);
        }
    }

    for rule in rules {
        let (next, count) = apply_rule(&current, rule, declared);
        if count > 0 {
            current = next;
            replacements += count;
            *rule_hits.entry(rule.rule.id).or_insert(0) += count;
        }
    }

    ContentRewrite {
        content: current,
        replacements,
        rule_hits,
    }
}

fn apply_rule(
    content: &str,
    rule: &CompiledRule,
    declared: &BTreeSet<String>,
) -> (String, usize) {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    let mut count = 0;

    for caps in rule.regex.captures_iter(content) {
        let Some(old) = caps.name("old") else {
            continue;
        };
        if let Some(tail) = &rule.tail {
            if !tail.is_match(&content[old.end()..]) {
                continue;
            }
        }
        if !guard_allows(rule, content, &caps, old.start()) {
            continue;
        }
        let table = caps
            .name("table")
            .or_else(|| (rule.rule.kind == RenameKind::Table).then_some(old));
        if table.is_some_and(|m| extends_to_longer_table(content, m.range(), declared)) {
            continue;
        }
        if old.as_str() == rule.replacement {
            continue;
        }

        out.push_str(&content[last..old.start()]);
        out.push_str(&rule.replacement);
        last = old.end();
        count += 1;
    }

    if count == 0 {
        return (content.to_string(), 0);
    }
    out.push_str(&content[last..]);
    (out, count)
}

fn guard_allows(rule: &CompiledRule, content: &str, caps: &Captures, at: usize) -> bool {
    match rule.rule.guard {
        Guard::None => true,
        Guard::OutsideStringLiteral => !inside_string_literal(content, at),
        Guard::OwningTableBlock => owning_table(enclosing_block(content, at))
            .is_some_and(|table| table.eq_ignore_ascii_case(&rule.table)),
        Guard::RelationshipEndIsTable => {
            let Some(end) = caps.name("end") else {
                return false;
            };
            let end = end.as_str().to_ascii_lowercase();
            relationship_table(enclosing_block(content, at), &end)
                .is_some_and(|table| table.eq_ignore_ascii_case(&rule.table))
        }
    }
}

/// Odd number of `"` between the start of the line and `at`.
fn inside_string_literal(content: &str, at: usize) -> bool {
    let line_start = content[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    content[line_start..at].matches('"').count() % 2 == 1
}

/// The top-level block (unindented header line plus its indented body)
/// that contains byte offset `at`.
fn enclosing_block(content: &str, at: usize) -> &str {
    let mut start = 0;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.starts_with(|c: char| !c.is_whitespace()) {
            if offset > at {
                return &content[start..offset];
            }
            start = offset;
        }
        offset += line.len();
    }
    &content[start..]
}

fn owning_table(block: &str) -> Option<String> {
    let header = block.lines().next()?;
    declaration_name(header, "table").map(unquote)
}

fn relationship_table(block: &str, end: &str) -> Option<String> {
    let mut lines = block.lines();
    declaration_name(lines.next()?, "relationship")?;
    let field = format!("{}Table", end);
    lines.find_map(|line| {
        let value = line.trim_start().strip_prefix(field.as_str())?;
        let value = value.trim_start().strip_prefix(':')?;
        Some(unquote(value.trim()))
    })
}

// ============================================================================
// Planning
// ============================================================================

/// Current content of `path`: overlay first, then disk.
pub fn current_content(path: &Path, overlay: &ContentOverlay) -> Result<String> {
    match overlay.get(path) {
        Some(content) => Ok(content.clone()),
        None => io::read_file(path, "read"),
    }
}

fn display_path(project: &Project, path: &Path) -> String {
    path.strip_prefix(&project.root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// Compute the edits `op` would make, without writing anything.
pub fn plan_rename(
    project: &Project,
    op: &RenameOperation,
    overlay: &ContentOverlay,
) -> Result<RenamePlan> {
    op.validate()?;

    // Unreadable definition files are reported by the loop below.
    let definitions: Vec<String> = project
        .definition_files
        .iter()
        .filter_map(|path| current_content(path, overlay).ok())
        .collect();
    let declared = declared_tables(definitions.iter().map(String::as_str));

    let mut compiled: HashMap<FileFamily, Vec<CompiledRule>> = HashMap::new();
    let mut edits = Vec::new();
    let mut failures = Vec::new();

    for (family, path) in project.classified_files() {
        let content = match current_content(path, overlay) {
            Ok(content) => content,
            Err(e) => {
                crate::log_status!(
                    "rename",
                    "Skipping {}: {}",
                    path.display(),
                    e.detailed_message()
                );
                failures.push(ValidationError::file_access(path, &e));
                continue;
            }
        };

        let rules = match compiled.entry(family) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(catalog::compile(op, family)?)
            }
        };

        let rewrite = rewrite_with(&content, op, family, rules, &declared);
        if rewrite.replacements == 0 {
            continue;
        }

        edits.push(FileEdit {
            file: display_path(project, path),
            family,
            replacements: rewrite.replacements,
            rule_hits: rewrite.rule_hits,
            path: path.to_path_buf(),
            original_content: content,
            new_content: rewrite.content,
        });
    }

    let total_references = edits.iter().map(|e| e.replacements).sum();

    Ok(RenamePlan {
        operation: op.clone(),
        edits,
        failures,
        total_references,
        applied: false,
    })
}

/// Write a plan's edits, caching each file's original content first.
///
/// A file that cannot be written is recorded in `plan.failures` and dropped
/// from `plan.edits`; the remaining files are still written.
pub fn apply_plan(plan: &mut RenamePlan, session: &mut SessionState) {
    let mut written = Vec::with_capacity(plan.edits.len());

    for edit in plan.edits.drain(..) {
        session.remember_original(&edit.path, &edit.original_content);
        match io::write_file(&edit.path, &edit.new_content, "write") {
            Ok(()) => written.push(edit),
            Err(e) => {
                crate::log_status!(
                    "rename",
                    "Failed to write {}: {}",
                    edit.path.display(),
                    e.detailed_message()
                );
                plan.failures
                    .push(ValidationError::file_access(&edit.path, &e));
            }
        }
    }

    plan.edits = written;
    plan.total_references = plan.edits.iter().map(|e| e.replacements).sum();
    plan.applied = true;
}

/// Plan and apply one rename operation.
pub fn rename(
    project: &Project,
    session: &mut SessionState,
    op: &RenameOperation,
) -> Result<RenamePlan> {
    let mut plan = plan_rename(project, op, &ContentOverlay::new())?;
    apply_plan(&mut plan, session);

    crate::log_status!(
        "rename",
        "{}: {} reference(s) in {} file(s)",
        op.describe(),
        plan.total_references,
        plan.edits.len()
    );

    Ok(plan)
}
