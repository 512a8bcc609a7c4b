use clap::Args;
use serde::{Deserialize, Serialize};

use pbip_refactor::defaults;
use pbip_refactor::refactor::{self, BatchResult, RenameKind, RenameOperation};
use pbip_refactor::{Error, SessionState};

use crate::commands::{read_json_spec_to_string, CmdResult, GlobalArgs, EXIT_VALIDATION_FAILED};

#[derive(Args)]
pub struct RenameArgs {
    /// Object kind: tables, columns, measures
    kind: String,
    /// JSON list of renames (supports @file and - for stdin)
    #[arg(long, value_name = "JSON")]
    spec: Option<String>,
    /// Name to rename from (single rename, alternative to --spec)
    #[arg(long, requires = "to", conflicts_with = "spec")]
    from: Option<String>,
    /// Name to rename to
    #[arg(long, requires = "from")]
    to: Option<String>,
    /// Owning table (required for columns)
    #[arg(long)]
    table: Option<String>,
    /// Apply changes to disk (default is dry-run)
    #[arg(long)]
    write: bool,
}

/// One entry of a `--spec` list.
#[derive(Debug, Deserialize)]
struct RenameEntry {
    #[serde(alias = "from")]
    old_name: String,
    #[serde(alias = "to")]
    new_name: String,
    #[serde(default, alias = "table")]
    table_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RenameSpec {
    List(Vec<RenameEntry>),
    Wrapped { renames: Vec<RenameEntry> },
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RenameOutput {
    #[serde(rename = "rename")]
    Rename(BatchResult),
}

pub fn run(args: RenameArgs, global: &GlobalArgs) -> CmdResult<RenameOutput> {
    let kind = RenameKind::from_str(&args.kind)?;
    let ops = collect_operations(kind, &args)?;

    let project = global.load_project()?;
    let config = defaults::load_config(&project.root);
    let mut session = SessionState::new();

    let result = refactor::batch_rename(&project, &mut session, &ops, &config, !args.write)?;
    let exit_code = if result.success {
        0
    } else {
        EXIT_VALIDATION_FAILED
    };

    Ok((RenameOutput::Rename(result), exit_code))
}

fn collect_operations(
    kind: RenameKind,
    args: &RenameArgs,
) -> pbip_refactor::Result<Vec<RenameOperation>> {
    let entries = match (&args.spec, &args.from, &args.to) {
        (Some(spec), _, _) => parse_spec(spec)?,
        (None, Some(from), Some(to)) => vec![RenameEntry {
            old_name: from.clone(),
            new_name: to.clone(),
            table_name: None,
        }],
        _ => {
            return Err(Error::validation_missing_argument(vec![
                "spec".to_string(),
                "from/to".to_string(),
            ]))
        }
    };

    Ok(entries
        .into_iter()
        .map(|entry| RenameOperation {
            kind,
            old_name: entry.old_name,
            new_name: entry.new_name,
            owning_table: entry.table_name.or_else(|| args.table.clone()),
        })
        .collect())
}

fn parse_spec(spec: &str) -> pbip_refactor::Result<Vec<RenameEntry>> {
    let raw = read_json_spec_to_string(spec)?;
    let parsed: RenameSpec = serde_json::from_str(&raw).map_err(|e| {
        Error::validation_invalid_json(
            e,
            Some("parse rename spec".to_string()),
            Some(raw.chars().take(200).collect::<String>()),
        )
    })?;

    Ok(match parsed {
        RenameSpec::List(entries) | RenameSpec::Wrapped { renames: entries } => entries,
    })
}
