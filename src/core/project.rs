//! PBIP project file set.
//!
//! A `Project` is the already-classified set of files a rename operates on:
//! model-definition text (TMDL), the report layer in one of two layouts, and
//! ancillary linguistic-schema / diagram-layout files. It is built once and
//! never mutated afterwards.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Report layer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Single `report.json` with stringified visual configs.
    Legacy,
    /// `definition/` folder with one JSON document per page/visual.
    Enhanced,
}

/// Report files, one monolithic document XOR many per-visual documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLayer {
    Legacy(Option<PathBuf>),
    Enhanced(Vec<PathBuf>),
}

impl ReportLayer {
    pub fn format(&self) -> ReportFormat {
        match self {
            ReportLayer::Legacy(_) => ReportFormat::Legacy,
            ReportLayer::Enhanced(_) => ReportFormat::Enhanced,
        }
    }

    pub fn files(&self) -> Vec<&Path> {
        match self {
            ReportLayer::Legacy(file) => file.iter().map(PathBuf::as_path).collect(),
            ReportLayer::Enhanced(files) => files.iter().map(PathBuf::as_path).collect(),
        }
    }
}

/// Which family of syntax a file belongs to. Selects the rule subset the
/// catalog applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFamily {
    ModelDefinition,
    LegacyReport,
    EnhancedReport,
    LinguisticSchema,
    DiagramLayout,
}

impl FileFamily {
    pub const ALL: [FileFamily; 5] = [
        FileFamily::ModelDefinition,
        FileFamily::LegacyReport,
        FileFamily::EnhancedReport,
        FileFamily::LinguisticSchema,
        FileFamily::DiagramLayout,
    ];
}

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub pbip_file: Option<PathBuf>,
    /// Sorted, disjoint from `linguistic_schema_files`.
    pub definition_files: Vec<PathBuf>,
    pub report: ReportLayer,
    pub linguistic_schema_files: Vec<PathBuf>,
    pub diagram_layout_file: Option<PathBuf>,
}

/// Serializable project summary.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub root_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pbip_file: Option<String>,
    pub report_format: ReportFormat,
    pub definition_file_count: usize,
    pub report_file_count: usize,
    pub linguistic_schema_file_count: usize,
    pub has_diagram_layout: bool,
}

impl Project {
    /// Build a project from an already-classified file set.
    pub fn new(
        root: impl Into<PathBuf>,
        definition_files: Vec<PathBuf>,
        report: ReportLayer,
    ) -> Self {
        let mut definition_files = definition_files;
        definition_files.sort();
        definition_files.dedup();

        Project {
            root: root.into(),
            pbip_file: None,
            definition_files,
            report,
            linguistic_schema_files: Vec::new(),
            diagram_layout_file: None,
        }
    }

    pub fn with_linguistic_schema_files(mut self, files: Vec<PathBuf>) -> Self {
        self.linguistic_schema_files = files;
        self
    }

    pub fn with_diagram_layout(mut self, file: Option<PathBuf>) -> Self {
        self.diagram_layout_file = file;
        self
    }

    pub fn report_format(&self) -> ReportFormat {
        self.report.format()
    }

    /// Files the catalog applies to for one family.
    pub fn files_for(&self, family: FileFamily) -> Vec<&Path> {
        match family {
            FileFamily::ModelDefinition => {
                self.definition_files.iter().map(PathBuf::as_path).collect()
            }
            FileFamily::LegacyReport => match &self.report {
                ReportLayer::Legacy(_) => self.report.files(),
                ReportLayer::Enhanced(_) => Vec::new(),
            },
            FileFamily::EnhancedReport => match &self.report {
                ReportLayer::Enhanced(_) => self.report.files(),
                ReportLayer::Legacy(_) => Vec::new(),
            },
            FileFamily::LinguisticSchema => self
                .linguistic_schema_files
                .iter()
                .map(PathBuf::as_path)
                .collect(),
            FileFamily::DiagramLayout => {
                self.diagram_layout_file.iter().map(PathBuf::as_path).collect()
            }
        }
    }

    /// Every file of the project paired with its family, in processing order.
    pub fn classified_files(&self) -> Vec<(FileFamily, &Path)> {
        FileFamily::ALL
            .iter()
            .flat_map(|family| {
                self.files_for(*family)
                    .into_iter()
                    .map(move |path| (*family, path))
            })
            .collect()
    }

    /// Project folder name, used to name backups.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    }

    pub fn info(&self) -> ProjectInfo {
        ProjectInfo {
            root_path: self.root.display().to_string(),
            pbip_file: self.pbip_file.as_ref().map(|p| p.display().to_string()),
            report_format: self.report_format(),
            definition_file_count: self.definition_files.len(),
            report_file_count: self.report.files().len(),
            linguistic_schema_file_count: self.linguistic_schema_files.len(),
            has_diagram_layout: self.diagram_layout_file.is_some(),
        }
    }

    /// Load a project from a `.pbip` file or the folder containing one.
    pub fn load(path: &Path) -> Result<Self> {
        let pbip_file = resolve_pbip_file(path)?;
        let root = pbip_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::project_not_found(path.display().to_string()))?;

        let stem = pbip_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let semantic_model = pick_artifact_folder(&root, "SemanticModel", &stem)?;
        let report_folder = pick_artifact_folder(&root, "Report", &stem)?;

        let mut definition_files = Vec::new();
        let mut linguistic_schema_files = Vec::new();
        let mut diagram_layout_file = None;

        if let Some(model) = &semantic_model {
            for file in glob_sorted(model, "**/*.tmdl")?
                .into_iter()
                .chain(glob_sorted(model, "**/*.tmd")?)
            {
                if is_culture_file(&file) {
                    linguistic_schema_files.push(file);
                } else {
                    definition_files.push(file);
                }
            }

            linguistic_schema_files.extend(glob_sorted(model, "**/*linguistic*.json")?);

            let diagram = model.join("diagramLayout.json");
            if diagram.is_file() {
                diagram_layout_file = Some(diagram);
            }
        }

        let report = match &report_folder {
            Some(folder) if folder.join("definition").is_dir() => {
                ReportLayer::Enhanced(glob_sorted(&folder.join("definition"), "**/*.json")?)
            }
            Some(folder) => {
                let report_json = folder.join("report.json");
                ReportLayer::Legacy(report_json.is_file().then_some(report_json))
            }
            None => ReportLayer::Legacy(None),
        };

        let mut project = Project::new(root, definition_files, report)
            .with_linguistic_schema_files(linguistic_schema_files)
            .with_diagram_layout(diagram_layout_file);
        project.pbip_file = Some(pbip_file);

        crate::log_status!(
            "project",
            "Loaded {} ({} definition file(s), {:?} report)",
            project.name(),
            project.definition_files.len(),
            project.report_format()
        );

        Ok(project)
    }
}

fn resolve_pbip_file(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        return glob_sorted(path, "*.pbip")?
            .into_iter()
            .next()
            .ok_or_else(|| Error::project_not_found(path.display().to_string()));
    }

    let is_pbip = path.extension().and_then(|e| e.to_str()) == Some("pbip");
    if path.is_file() && is_pbip {
        Ok(path.to_path_buf())
    } else {
        Err(Error::project_not_found(path.display().to_string()))
    }
}

/// Pick `<stem>.<suffix>` when present, else the first `*.<suffix>` folder.
fn pick_artifact_folder(root: &Path, suffix: &str, stem: &str) -> Result<Option<PathBuf>> {
    let preferred = root.join(format!("{}.{}", stem, suffix));
    if preferred.is_dir() {
        return Ok(Some(preferred));
    }

    Ok(glob_sorted(root, &format!("*.{}", suffix))?
        .into_iter()
        .find(|p| p.is_dir()))
}

fn is_culture_file(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str().eq_ignore_ascii_case("cultures"))
}

fn glob_sorted(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&base.to_string_lossy()),
        pattern
    );

    let paths = glob::glob(&full).map_err(|e| {
        Error::internal_unexpected(format!("invalid glob pattern '{}': {}", full, e))
    })?;

    let mut files: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
    files.sort();
    Ok(files)
}
