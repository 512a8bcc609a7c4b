//! Rename refactoring for PBIP projects.
//!
//! Renames tables, columns and measures across model-definition text, the
//! report layer and ancillary JSON, keeping every reference spelled the way
//! the quoting grammar requires.

pub mod batch;
pub mod catalog;
pub mod engine;
pub mod model_index;
pub mod normalize;
pub mod operation;
pub mod quoting;
pub mod structural;
pub mod validate;

pub use batch::{batch_rename, BatchResult, RenameSummary};
pub use catalog::{ReferencePatternRule, SyntacticPosition, CATALOG};
pub use engine::{
    apply_plan, plan_rename, rename, rewrite_content, ContentOverlay, ContentRewrite, FileEdit,
    RenamePlan,
};
pub use model_index::ModelIndex;
pub use normalize::{normalize_quoting, NormalizeResult};
pub use operation::{RenameKind, RenameOperation};
pub use quoting::{needs_quoting, quote, unquote};
pub use validate::{validate, validate_with, ValidationCategory, ValidationError};
