use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    ProjectNotFound,
    ProjectNotLoaded,

    RenameNameCollision,
    RenameMixedKinds,

    SessionNothingToRollback,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::ProjectNotFound => "project.not_found",
            ErrorCode::ProjectNotLoaded => "project.not_loaded",

            ErrorCode::RenameNameCollision => "rename.name_collision",
            ErrorCode::RenameMixedKinds => "rename.mixed_kinds",

            ErrorCode::SessionNothingToRollback => "session.nothing_to_rollback",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// True for failures reported before any file is touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationMissingArgument
                | ErrorCode::ValidationInvalidArgument
                | ErrorCode::ValidationInvalidJson
                | ErrorCode::ProjectNotLoaded
                | ErrorCode::RenameNameCollision
                | ErrorCode::RenameMixedKinds
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCollisionDetails {
    pub kind: String,
    pub old_name: String,
    pub new_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(
        err: serde_json::Error,
        context: Option<String>,
        input: Option<String>,
    ) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
            "input": input,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn project_not_found(id: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            "PBIP project not found",
            to_details(NotFoundDetails { id: id.into() }),
        )
        .with_hint("Pass the .pbip file or the folder that contains it")
        .with_hint("In Power BI Desktop use File > Save as > Power BI Project (.pbip)")
    }

    pub fn project_not_loaded() -> Self {
        Self::new(
            ErrorCode::ProjectNotLoaded,
            "No semantic model definition files are loaded",
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Check that the project has a *.SemanticModel/definition folder")
    }

    pub fn rename_name_collision(
        kind: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
        table: Option<String>,
    ) -> Self {
        let kind = kind.into();
        let new_name = new_name.into();
        let details = to_details(NameCollisionDetails {
            kind: kind.clone(),
            old_name: old_name.into(),
            new_name: new_name.clone(),
            table,
        });

        Self::new(
            ErrorCode::RenameNameCollision,
            format!("A {} named '{}' already exists", kind, new_name),
            details,
        )
        .with_hint("Pick a different target name or set \"reject_collisions\": false in .pbip-refactor.json")
    }

    pub fn rename_mixed_kinds(kinds: Vec<String>) -> Self {
        Self::new(
            ErrorCode::RenameMixedKinds,
            "A batch must contain renames of a single kind",
            serde_json::json!({ "kinds": kinds }),
        )
    }

    pub fn session_nothing_to_rollback() -> Self {
        Self::new(
            ErrorCode::SessionNothingToRollback,
            "No original files cached for rollback",
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Rollback only restores files modified during this session")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    /// Message plus the underlying cause, when the details carry one.
    pub fn detailed_message(&self) -> String {
        match self.details.get("error").and_then(Value::as_str) {
            Some(cause) => format!("{}: {}", self.message, cause),
            None => self.message.clone(),
        }
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
