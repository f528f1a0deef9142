//! Drift detection between generated models and the live schema
//!
//! Each generated file may carry a `SerialVersion` trailer. Recomputing the
//! fingerprint from the catalog and comparing it with the trailer tells
//! whether the model still matches its table.

use std::path::Path;

use modelgen_catalog::SchemaCatalog;
use modelgen_core::{Config, Diagnostic, DiagnosticCode, Fingerprint, Report, TableFieldRegistry};

use crate::generate::{prepare_table, GenerateError, Generator, OutputLayout};
use crate::rewrite::extract_serial_version;
use crate::transform::FieldTransformer;

/// Result of checking one table
#[derive(Debug, Clone)]
pub struct DriftDetection {
    /// The table being checked
    pub table: String,

    /// Fingerprint found in the generated file
    pub embedded: Option<Fingerprint>,

    /// Fingerprint computed from the live schema
    pub live: Fingerprint,

    pub diagnostics: Vec<Diagnostic>,
}

impl DriftDetection {
    /// Compare a generated file's contents with the live fingerprint
    ///
    /// `contents` is `None` when the file does not exist.
    pub fn detect(table: &str, file: &Path, contents: Option<&str>, live: Fingerprint) -> Self {
        let mut diagnostics = Vec::new();

        let embedded = match contents {
            None => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::DriftModelMissing,
                        format!("No generated model for table '{}'", table),
                    )
                    .with_table(table)
                    .with_file(file),
                );
                None
            }
            Some(text) => {
                let embedded = extract_serial_version(text);
                match &embedded {
                    None => diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::DriftFingerprintMissing,
                            format!(
                                "Model for table '{}' has no SerialVersion trailer; regenerate with emit_fingerprint enabled",
                                table
                            ),
                        )
                        .with_table(table)
                        .with_file(file),
                    ),
                    Some(found) if *found != live => diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::DriftFingerprintMismatch,
                            format!(
                                "Table '{}' changed since its model was generated: was {}, now {}",
                                table, found, live
                            ),
                        )
                        .with_table(table)
                        .with_file(file)
                        .with_comparison(found.as_str(), live.as_str()),
                    ),
                    Some(_) => {}
                }
                embedded
            }
        };

        Self {
            table: table.to_string(),
            embedded,
            live,
            diagnostics,
        }
    }

    pub fn has_drift(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Checks every table's generated model against the catalog
pub struct DriftCheck<'a> {
    catalog: &'a dyn SchemaCatalog,
    config: &'a Config,
}

impl<'a> DriftCheck<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, config: &'a Config) -> Self {
        Self { catalog, config }
    }

    /// Check each table and collect the results
    pub async fn detect_all(&self) -> Result<Vec<DriftDetection>, GenerateError> {
        let tables = Generator::new(self.catalog, self.config).resolve_tables().await?;
        let layout = OutputLayout::resolve(self.catalog.database_name(), self.config);
        let transformer = FieldTransformer::from_config(self.config);

        let mut registry = TableFieldRegistry::new();
        let mut detections = Vec::with_capacity(tables.len());
        for table in &tables {
            prepare_table(self.catalog, &transformer, table, &mut registry).await?;
            let live = Fingerprint::compute(&registry.take(table));

            let path = layout.file_path(table, &self.config.generated_suffix);
            let contents = match std::fs::read_to_string(&path) {
                Ok(text) => Some(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(GenerateError::Io { path, source: e }),
            };

            let detection = DriftDetection::detect(table, &path, contents.as_deref(), live);
            tracing::debug!(table = %table, drift = detection.has_drift(), "Checked model");
            detections.push(detection);
        }

        Ok(detections)
    }

    /// Check every table and aggregate the diagnostics into a report
    pub async fn run(&self) -> Result<Report, GenerateError> {
        let detections = self.detect_all().await?;
        let tables_checked = detections.len();
        let diagnostics = detections
            .into_iter()
            .flat_map(|d| d.diagnostics)
            .collect();

        Ok(Report::from_diagnostics(diagnostics, tables_checked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgen_core::Severity;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::parse(s).unwrap()
    }

    #[test]
    fn matching_trailer_has_no_diagnostics() {
        let text = "package p\n\n// SerialVersion: abc123\n";
        let detection =
            DriftDetection::detect("user", Path::new("user.gen.go"), Some(text), fp("abc123"));

        assert!(!detection.has_drift());
        assert_eq!(detection.embedded, Some(fp("abc123")));
    }

    #[test]
    fn mismatch_is_an_error_with_comparison() {
        let text = "package p\n\n// SerialVersion: abc123\n";
        let detection =
            DriftDetection::detect("user", Path::new("user.gen.go"), Some(text), fp("def456"));

        let diag = &detection.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::DriftFingerprintMismatch);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.expected.as_deref(), Some("abc123"));
        assert_eq!(diag.actual.as_deref(), Some("def456"));
        assert_eq!(diag.table.as_deref(), Some("user"));
    }

    #[test]
    fn missing_trailer_warns() {
        let detection = DriftDetection::detect(
            "user",
            Path::new("user.gen.go"),
            Some("package p\n"),
            fp("abc123"),
        );

        assert_eq!(detection.diagnostics.len(), 1);
        assert_eq!(detection.diagnostics[0].code, DiagnosticCode::DriftFingerprintMissing);
        assert_eq!(detection.diagnostics[0].severity, Severity::Warn);
    }

    #[test]
    fn missing_file_is_an_error() {
        let detection =
            DriftDetection::detect("user", Path::new("user.gen.go"), None, fp("abc123"));

        assert_eq!(detection.diagnostics[0].code, DiagnosticCode::DriftModelMissing);
        assert_eq!(
            detection.diagnostics[0].file.as_deref(),
            Some("user.gen.go")
        );
    }
}
