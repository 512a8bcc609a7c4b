use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{backup, info, normalize, rename, validate};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pbip-refactor")]
#[command(version = VERSION)]
#[command(about = "Rename tables, columns and measures across a Power BI project")]
struct Cli {
    /// Path to the .pbip file or the folder containing it
    #[arg(long, global = true, default_value = ".")]
    project: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the project's file set and declared model objects
    Info(info::InfoArgs),
    /// Check model-definition files for unquoted names that require quoting
    Validate(validate::ValidateArgs),
    /// Quote every bare reference to a table whose name requires quoting
    Normalize(normalize::NormalizeArgs),
    /// Rename tables, columns or measures everywhere they are referenced
    Rename(rename::RenameArgs),
    /// Copy the project folder to a timestamped sibling folder
    Backup(backup::BackupArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Info(_) => "info",
            Commands::Validate(_) => "validate",
            Commands::Normalize(_) => "normalize",
            Commands::Rename(_) => "rename",
            Commands::Backup(_) => "backup",
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        project: cli.project,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err.detailed_message());
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
