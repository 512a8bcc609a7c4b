pub mod defaults;
pub mod error;
pub mod project;
pub mod refactor;
pub mod session;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use project::{FileFamily, Project, ReportFormat, ReportLayer};
pub use session::SessionState;
