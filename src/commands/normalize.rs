use clap::Args;
use serde::Serialize;

use pbip_refactor::defaults;
use pbip_refactor::refactor::{self, NormalizeResult};
use pbip_refactor::SessionState;

use crate::commands::{CmdResult, GlobalArgs, EXIT_VALIDATION_FAILED};

#[derive(Args)]
pub struct NormalizeArgs {
    /// Apply changes to disk (default is dry-run)
    #[arg(long)]
    write: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum NormalizeOutput {
    #[serde(rename = "normalize")]
    Normalize(NormalizeResult),
}

pub fn run(args: NormalizeArgs, global: &GlobalArgs) -> CmdResult<NormalizeOutput> {
    let project = global.load_project()?;
    let config = defaults::load_config(&project.root);
    let mut session = SessionState::new();

    let result = refactor::normalize_quoting(&project, &mut session, &config, !args.write)?;
    let exit_code = if result.outcome.success {
        0
    } else {
        EXIT_VALIDATION_FAILED
    };

    Ok((NormalizeOutput::Normalize(result), exit_code))
}
