use clap::Args;
use serde::Serialize;

use pbip_refactor::project::ProjectInfo;
use pbip_refactor::refactor::ModelIndex;
use pbip_refactor::refactor::{ContentOverlay, ValidationError};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct InfoArgs {
    /// Include the per-table column and measure lists
    #[arg(long)]
    detailed: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum InfoOutput {
    #[serde(rename = "info")]
    Info {
        project: ProjectInfo,
        table_count: usize,
        column_count: usize,
        measure_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<ModelIndex>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        unreadable: Vec<ValidationError>,
    },
}

pub fn run(args: InfoArgs, global: &GlobalArgs) -> CmdResult<InfoOutput> {
    let project = global.load_project()?;
    let (index, unreadable) = ModelIndex::load(&project, &ContentOverlay::new());

    Ok((
        InfoOutput::Info {
            project: project.info(),
            table_count: index.tables.len(),
            column_count: index.column_count(),
            measure_count: index.measure_count(),
            model: args.detailed.then_some(index),
            unreadable,
        },
        0,
    ))
}
