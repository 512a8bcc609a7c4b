//! Canonical-form validation of model-definition text.
//!
//! Re-derives the declared tables from the files themselves, then flags
//! every place where a name that requires quoting is spelled bare. Nothing
//! is carried over from the rename that preceded it, so problems that were
//! already in the project are reported too.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::Path;

use super::engine::{current_content, ContentOverlay};
use super::quoting::{is_quoted, needs_quoting, unquote};
use crate::error::Error;
use crate::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    UnquotedDeclaration,
    UnquotedRelationshipReference,
    UnquotedDaxReference,
    FileAccessFailure,
}

impl ValidationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCategory::UnquotedDeclaration => "unquoted_declaration",
            ValidationCategory::UnquotedRelationshipReference => "unquoted_relationship_reference",
            ValidationCategory::UnquotedDaxReference => "unquoted_dax_reference",
            ValidationCategory::FileAccessFailure => "file_access_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub file_path: String,
    /// 1-indexed; 0 when the finding concerns the whole file.
    pub line_number: usize,
    pub category: ValidationCategory,
    pub message: String,
    pub context_line: String,
}

impl ValidationError {
    pub fn file_access(path: &Path, error: &Error) -> Self {
        ValidationError {
            file_path: path.display().to_string(),
            line_number: 0,
            category: ValidationCategory::FileAccessFailure,
            message: error.detailed_message(),
            context_line: String::new(),
        }
    }
}

/// Validate the project as it is on disk.
pub fn validate(project: &Project) -> Vec<ValidationError> {
    validate_with(project, &ContentOverlay::new())
}

/// Validate the project with `overlay` content taking precedence over disk.
pub fn validate_with(project: &Project, overlay: &ContentOverlay) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut documents = Vec::new();

    for path in &project.definition_files {
        match current_content(path, overlay) {
            Ok(content) => documents.push((path.as_path(), content)),
            Err(e) => errors.push(ValidationError::file_access(path, &e)),
        }
    }

    let declared = declared_tables(documents.iter().map(|(_, c)| c.as_str()));
    let dax_patterns: Vec<(String, Regex)> = declared
        .iter()
        .filter(|name| needs_quoting(name))
        .filter_map(|name| unquoted_bracket_pattern(name).map(|re| (name.clone(), re)))
        .collect();

    for (path, content) in &documents {
        scan_document(path, content, &declared, &dax_patterns, &mut errors);
    }

    crate::log_status!(
        "validate",
        "{} declared table(s), {} finding(s)",
        declared.len(),
        errors.len()
    );

    errors
}

/// Logical names of every `table` declaration, quoted or bare.
pub fn declared_tables<'a>(documents: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    for content in documents {
        for line in content.lines() {
            if let Some(spelling) = declaration_name(line, "table") {
                tables.insert(unquote(spelling));
            }
        }
    }
    tables
}

/// The spelling after `keyword` on a declaration line, if the line is one.
pub(crate) fn declaration_name<'l>(line: &'l str, keyword: &str) -> Option<&'l str> {
    let rest = line.trim_start().strip_prefix(keyword)?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let name = rest.trim();
    (!name.is_empty()).then_some(name)
}

fn relationship_table_value(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("fromTable")
        .or_else(|| trimmed.strip_prefix("toTable"))?;
    let value = rest.trim_start().strip_prefix(':')?.trim();
    (!value.is_empty()).then_some(value)
}

/// Whether `span` is the trailing words of a longer declared table spelled
/// bare, as `Sales Data` is in `Leads Sales Data[Amount]`.
pub(crate) fn extends_to_longer_table(
    content: &str,
    span: Range<usize>,
    declared: &BTreeSet<String>,
) -> bool {
    let mut before = content[..span.start].chars().rev();
    let separated = matches!(before.next(), Some(' ' | '\t'))
        && before.next().is_some_and(|c| c.is_alphanumeric() || c == '_');
    if !separated {
        return false;
    }

    declared.iter().any(|name| {
        name.len() > span.len()
            && span.end >= name.len()
            && content
                .get(span.end - name.len()..span.end)
                .is_some_and(|text| text.eq_ignore_ascii_case(name))
    })
}

fn unquoted_bracket_pattern(name: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)(?:^|[^\w'.\]])(?P<name>{})[ \t]*\[",
        regex::escape(name)
    ))
    .ok()
}

fn scan_document(
    path: &Path,
    content: &str,
    declared: &BTreeSet<String>,
    dax_patterns: &[(String, Regex)],
    errors: &mut Vec<ValidationError>,
) {
    let file_path = path.display().to_string();
    let mut expression_indent: Option<usize> = None;

    for (index, line) in content.lines().enumerate() {
        let push = |errors: &mut Vec<ValidationError>, category, message: String| {
            errors.push(ValidationError {
                file_path: file_path.clone(),
                line_number: index + 1,
                category,
                message,
                context_line: line.trim_end().to_string(),
            });
        };

        if let Some(name) = declaration_name(line, "table") {
            if !is_quoted(name) && name.contains(char::is_whitespace) {
                push(
                    errors,
                    ValidationCategory::UnquotedDeclaration,
                    format!("Table declaration '{}' must be quoted", name),
                );
            }
        }

        if let Some(value) = relationship_table_value(line) {
            if !is_quoted(value) && value.contains(char::is_whitespace) {
                push(
                    errors,
                    ValidationCategory::UnquotedRelationshipReference,
                    format!("Relationship table reference '{}' must be quoted", value),
                );
            }
        }

        let indent = line.len() - line.trim_start().len();
        let continuation = match expression_indent {
            Some(base) if line.trim().is_empty() || indent > base => true,
            _ => {
                expression_indent = None;
                false
            }
        };
        if line.trim_end().ends_with('=') {
            expression_indent = Some(indent);
        }

        if continuation || line.contains('=') {
            for (name, pattern) in dax_patterns {
                let unquoted = pattern
                    .captures_iter(line)
                    .filter_map(|caps| caps.name("name"))
                    .any(|m| !extends_to_longer_table(line, m.range(), declared));
                if unquoted {
                    push(
                        errors,
                        ValidationCategory::UnquotedDaxReference,
                        format!("Reference to table '{}' must be quoted", name),
                    );
                }
            }
        }
    }
}
