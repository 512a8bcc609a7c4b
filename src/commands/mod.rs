use std::io::Read;
use std::path::{Path, PathBuf};

use pbip_refactor::Project;

pub type CmdResult<T> = pbip_refactor::Result<(T, i32)>;

/// Exit code for a command that completed but reported validation findings.
pub(crate) const EXIT_VALIDATION_FAILED: i32 = 3;

pub(crate) struct GlobalArgs {
    /// `.pbip` file or the folder containing one.
    pub project: String,
}

impl GlobalArgs {
    pub fn project_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.project).to_string())
    }

    pub fn load_project(&self) -> pbip_refactor::Result<Project> {
        Project::load(&self.project_path())
    }
}

// ============================================================================
// JSON Input Parsing (CLI layer)
// ============================================================================

/// Read JSON spec from string, file (@path), or stdin (-).
pub(crate) fn read_json_spec_to_string(spec: &str) -> pbip_refactor::Result<String> {
    use std::io::IsTerminal;

    if spec.trim() == "-" {
        let mut buf = String::new();
        let mut stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Err(pbip_refactor::Error::validation_invalid_argument(
                "spec",
                "Cannot read JSON from stdin when stdin is a TTY",
                None,
                None,
            ));
        }
        stdin.read_to_string(&mut buf).map_err(|e| {
            pbip_refactor::Error::internal_io(e.to_string(), Some("read stdin".to_string()))
        })?;
        return Ok(buf);
    }

    if let Some(path) = spec.strip_prefix('@') {
        if path.trim().is_empty() {
            return Err(pbip_refactor::Error::validation_invalid_argument(
                "spec",
                "Invalid JSON spec '@' (missing file path)",
                None,
                None,
            ));
        }
        let expanded = shellexpand::tilde(path).to_string();
        return std::fs::read_to_string(Path::new(&expanded)).map_err(|e| {
            pbip_refactor::Error::internal_io(e.to_string(), Some(format!("read {}", path)))
        });
    }

    Ok(spec.to_string())
}

pub mod backup;
pub mod info;
pub mod normalize;
pub mod rename;
pub mod validate;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (pbip_refactor::Result<serde_json::Value>, i32) {
    crate::tty::status(&format!(
        "pbip-refactor {}: {}",
        command.name(),
        global.project_path().display()
    ));

    match command {
        crate::Commands::Info(args) => dispatch!(args, global, info),
        crate::Commands::Validate(args) => dispatch!(args, global, validate),
        crate::Commands::Normalize(args) => dispatch!(args, global, normalize),
        crate::Commands::Rename(args) => dispatch!(args, global, rename),
        crate::Commands::Backup(args) => dispatch!(args, global, backup),
    }
}
