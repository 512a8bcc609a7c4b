use clap::Args;
use serde::Serialize;

use pbip_refactor::refactor::{self, ValidationError};

use crate::commands::{CmdResult, GlobalArgs, EXIT_VALIDATION_FAILED};

#[derive(Args)]
pub struct ValidateArgs {}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ValidateOutput {
    #[serde(rename = "validate")]
    Validate {
        valid: bool,
        files_checked: usize,
        errors: Vec<ValidationError>,
    },
}

pub fn run(_args: ValidateArgs, global: &GlobalArgs) -> CmdResult<ValidateOutput> {
    let project = global.load_project()?;
    let errors = refactor::validate(&project);
    let valid = errors.is_empty();

    Ok((
        ValidateOutput::Validate {
            valid,
            files_checked: project.definition_files.len(),
            errors,
        },
        if valid { 0 } else { EXIT_VALIDATION_FAILED },
    ))
}
