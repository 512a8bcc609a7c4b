use clap::Args;
use serde::Serialize;

use pbip_refactor::defaults;
use pbip_refactor::SessionState;

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct BackupArgs {
    /// Folder-name suffix before the timestamp (defaults to the project config)
    #[arg(long)]
    suffix: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum BackupOutput {
    #[serde(rename = "backup")]
    Backup { project: String, backup_path: String },
}

pub fn run(args: BackupArgs, global: &GlobalArgs) -> CmdResult<BackupOutput> {
    let project = global.load_project()?;
    let suffix = args
        .suffix
        .unwrap_or_else(|| defaults::load_config(&project.root).backup_suffix);

    let path = SessionState::new().create_backup(&project, &suffix)?;

    Ok((
        BackupOutput::Backup {
            project: project.root.display().to_string(),
            backup_path: path.display().to_string(),
        },
        0,
    ))
}
