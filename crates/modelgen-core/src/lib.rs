//! modelgen core
//!
//! Domain model shared by every modelgen crate: column metadata, generated
//! fields and their tags, naming rules, the schema fingerprint, and the
//! diagnostic/report types used by drift checks.
//! Never rename diagnostic codes - they are part of the public API.

pub mod config;
pub mod diagnostic;
pub mod fingerprint;
pub mod marker;
pub mod naming;
pub mod report;
pub mod schema;
pub mod type_map;

pub use config::{Config, ConfigError, FormatterKind, WriteErrorPolicy};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use fingerprint::Fingerprint;
pub use marker::has_marker;
pub use naming::{AliasMap, NamingStrategy};
pub use report::{Report, ReportVersion};
pub use schema::{ColumnMetadata, Field, IgnoreSet, TableFieldRegistry, TagSet};
