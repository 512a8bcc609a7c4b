//! Declared tables, columns and measures, read from model-definition text.

use serde::Serialize;
use std::collections::BTreeMap;

use super::engine::{current_content, ContentOverlay};
use super::operation::{RenameKind, RenameOperation};
use super::quoting::unquote;
use super::validate::{declaration_name, ValidationError};
use crate::project::Project;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub columns: Vec<String>,
    pub measures: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelIndex {
    pub tables: BTreeMap<String, TableEntry>,
}

impl ModelIndex {
    /// Index a set of model-definition documents.
    pub fn scan<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut index = ModelIndex::default();

        for content in documents {
            let mut current: Option<String> = None;
            for line in content.lines() {
                let top_level = line.starts_with(|c: char| !c.is_whitespace());
                if top_level {
                    current = declaration_name(line, "table").map(unquote);
                    if let Some(table) = &current {
                        index.tables.entry(table.clone()).or_default();
                    }
                    continue;
                }

                let Some(table) = &current else {
                    continue;
                };
                let entry = index.tables.entry(table.clone()).or_default();
                if let Some(rest) = declaration_name(line, "column") {
                    entry.columns.push(member_name(rest));
                } else if let Some(rest) = declaration_name(line, "measure") {
                    entry.measures.push(member_name(rest));
                }
            }
        }

        index
    }

    /// Index the project's definition files; unreadable files are reported.
    pub fn load(project: &Project, overlay: &ContentOverlay) -> (Self, Vec<ValidationError>) {
        let mut documents = Vec::new();
        let mut failures = Vec::new();
        for path in &project.definition_files {
            match current_content(path, overlay) {
                Ok(content) => documents.push(content),
                Err(e) => failures.push(ValidationError::file_access(path, &e)),
            }
        }
        (Self::scan(documents.iter().map(String::as_str)), failures)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.keys().any(|t| t.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table)
            .is_some_and(|t| t.columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }

    pub fn has_measure(&self, name: &str) -> bool {
        self.tables
            .values()
            .any(|t| t.measures.iter().any(|m| m.eq_ignore_ascii_case(name)))
    }

    fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(name))
            .map(|(_, entry)| entry)
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut TableEntry> {
        self.tables
            .iter_mut()
            .find(|(t, _)| t.eq_ignore_ascii_case(name))
            .map(|(_, entry)| entry)
    }

    /// Whether `op` would give an object the name of another existing object.
    ///
    /// Case-only renames of the same object are not collisions.
    pub fn collides(&self, op: &RenameOperation) -> bool {
        if op.old_name.eq_ignore_ascii_case(&op.new_name) {
            return false;
        }
        match op.kind {
            RenameKind::Table => self.has_table(&op.new_name),
            RenameKind::Column => self.has_column(op.table_name(), &op.new_name),
            RenameKind::Measure => self.has_measure(&op.new_name),
        }
    }

    /// Reflect `op` in the index, so later operations of a batch are checked
    /// against the renamed model.
    pub fn record(&mut self, op: &RenameOperation) {
        match op.kind {
            RenameKind::Table => {
                let key = self
                    .tables
                    .keys()
                    .find(|t| t.eq_ignore_ascii_case(&op.old_name))
                    .cloned();
                if let Some(entry) = key.and_then(|k| self.tables.remove(&k)) {
                    self.tables.insert(op.new_name.clone(), entry);
                }
            }
            RenameKind::Column => {
                if let Some(entry) = self.table_mut(op.table_name()) {
                    rename_in(&mut entry.columns, &op.old_name, &op.new_name);
                }
            }
            RenameKind::Measure => {
                for entry in self.tables.values_mut() {
                    rename_in(&mut entry.measures, &op.old_name, &op.new_name);
                }
            }
        }
    }

    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }

    pub fn measure_count(&self) -> usize {
        self.tables.values().map(|t| t.measures.len()).sum()
    }
}

fn rename_in(names: &mut [String], old: &str, new: &str) {
    for name in names.iter_mut().filter(|n| n.eq_ignore_ascii_case(old)) {
        *name = new.to_string();
    }
}

/// Logical member name from the text after `column`/`measure`.
fn member_name(rest: &str) -> String {
    if let Some(quoted) = rest.strip_prefix('\'') {
        // Closing quote is the first single quote not doubled.
        let bytes = quoted.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                return unquote(&rest[..i + 2]);
            }
            i += 1;
        }
        return unquote(rest);
    }

    let end = rest.find(['=', ':']).unwrap_or(rest.len());
    rest[..end].trim().to_string()
}
