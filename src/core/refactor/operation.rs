use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of model object being renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameKind {
    Table,
    Column,
    Measure,
}

impl RenameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenameKind::Table => "table",
            RenameKind::Column => "column",
            RenameKind::Measure => "measure",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" | "tables" => Ok(RenameKind::Table),
            "column" | "columns" => Ok(RenameKind::Column),
            "measure" | "measures" => Ok(RenameKind::Measure),
            _ => Err(Error::validation_invalid_argument(
                "kind",
                format!("Unknown kind '{}'. Use: table, column, measure", s),
                None,
                None,
            )),
        }
    }
}

/// One rename request. `owning_table` is required for columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOperation {
    pub kind: RenameKind,
    pub old_name: String,
    pub new_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "table_name")]
    pub owning_table: Option<String>,
}

impl RenameOperation {
    pub fn table(old_name: &str, new_name: &str) -> Self {
        RenameOperation {
            kind: RenameKind::Table,
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            owning_table: None,
        }
    }

    pub fn column(table: &str, old_name: &str, new_name: &str) -> Self {
        RenameOperation {
            kind: RenameKind::Column,
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            owning_table: Some(table.to_string()),
        }
    }

    pub fn measure(old_name: &str, new_name: &str) -> Self {
        RenameOperation {
            kind: RenameKind::Measure,
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            owning_table: None,
        }
    }

    /// Owning table, or an empty string for kinds that have none.
    pub fn table_name(&self) -> &str {
        self.owning_table.as_deref().unwrap_or("")
    }

    /// Precondition check, run before anything is touched.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.old_name.is_empty() {
            missing.push("old_name".to_string());
        }
        if self.new_name.is_empty() {
            missing.push("new_name".to_string());
        }
        if self.kind == RenameKind::Column && self.table_name().is_empty() {
            missing.push("table_name".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation_missing_argument(missing))
        }
    }

    pub fn describe(&self) -> String {
        match self.kind {
            RenameKind::Column => format!(
                "column '{}'[{}] -> [{}]",
                self.table_name(),
                self.old_name,
                self.new_name
            ),
            kind => format!(
                "{} '{}' -> '{}'",
                kind.as_str(),
                self.old_name,
                self.new_name
            ),
        }
    }
}
