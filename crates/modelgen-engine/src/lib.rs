//! modelgen engine - Generation pipeline
//!
//! This crate wires the catalog, transformation rules, emitter and rewriter
//! into generation runs:
//! - Deprecated column filtering
//! - Field transformation
//! - Post-generation rewrites and formatting
//! - Drift detection against embedded fingerprints

pub mod deprecated;
pub mod drift_detector;
pub mod format;
pub mod generate;
mod lexer;
pub mod output;
pub mod rewrite;
pub mod transform;

pub use deprecated::DeprecatedColumnFilter;
pub use drift_detector::{DriftCheck, DriftDetection};
pub use format::{
    formatter_for, FormatError, GoImportsFormatter, ImportFormatter, NoopFormatter,
    SourceFormatter,
};
pub use generate::{
    prepare_table, GenerateError, GenerationSummary, Generator, OutputLayout, PreparedTable,
    TableOutcome,
};
pub use rewrite::{RewriteOutcome, SourceRewriter};
pub use transform::FieldTransformer;
