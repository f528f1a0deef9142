//! Diagnostics produced by generation runs and drift checks
//!
//! Codes appear in `drift-report.json` and are matched by CI scripts; they are
//! never renamed. Each code has a fixed severity.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// Trailer fingerprint differs from the one computed from the live schema
    DriftFingerprintMismatch,

    /// Generated file carries no `SerialVersion` trailer
    DriftFingerprintMissing,

    /// No generated file exists for a table in the schema
    DriftModelMissing,

    /// Formatter failed; the file was written unformatted
    GenerateFormatDegraded,

    /// A generated file could not be read back or rewritten
    GenerateFileSkipped,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DriftFingerprintMismatch => "DRIFT_FINGERPRINT_MISMATCH",
            Self::DriftFingerprintMissing => "DRIFT_FINGERPRINT_MISSING",
            Self::DriftModelMissing => "DRIFT_MODEL_MISSING",
            Self::GenerateFormatDegraded => "GENERATE_FORMAT_DEGRADED",
            Self::GenerateFileSkipped => "GENERATE_FILE_SKIPPED",
        }
    }

    /// A stale or absent model fails `check`; everything else only warns
    pub fn severity(&self) -> Severity {
        match self {
            Self::DriftFingerprintMismatch | Self::DriftModelMissing => Severity::Error,
            Self::DriftFingerprintMissing
            | Self::GenerateFormatDegraded
            | Self::GenerateFileSkipped => Severity::Warn,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, exit status unaffected
    Warn,

    /// `check` exits non-zero
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One finding about a table and its generated file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,

    pub severity: Severity,

    pub message: String,

    pub table: Option<String>,

    /// Generated model file the finding refers to
    pub file: Option<String>,

    /// Fingerprint recorded in the file, for mismatches
    pub expected: Option<String>,

    /// Fingerprint computed from the live schema, for mismatches
    pub actual: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            table: None,
            file: None,
            expected: None,
            actual: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_file(mut self, file: &Path) -> Self {
        self.file = Some(file.display().to_string());
        self
    }

    pub fn with_comparison(
        mut self,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DiagnosticCode::DriftFingerprintMismatch.as_str(), "DRIFT_FINGERPRINT_MISMATCH");
        assert_eq!(DiagnosticCode::GenerateFileSkipped.to_string(), "GENERATE_FILE_SKIPPED");
        assert_eq!(
            serde_json::to_string(&DiagnosticCode::DriftModelMissing).unwrap(),
            "\"DRIFT_MODEL_MISSING\""
        );
    }

    #[test]
    fn only_stale_or_missing_models_are_errors() {
        assert!(Diagnostic::new(DiagnosticCode::DriftFingerprintMismatch, "x").is_error());
        assert!(Diagnostic::new(DiagnosticCode::DriftModelMissing, "x").is_error());
        assert!(!Diagnostic::new(DiagnosticCode::DriftFingerprintMissing, "x").is_error());
        assert!(!Diagnostic::new(DiagnosticCode::GenerateFormatDegraded, "x").is_error());
        assert!(!Diagnostic::new(DiagnosticCode::GenerateFileSkipped, "x").is_error());
    }

    #[test]
    fn mismatch_serializes_both_fingerprints() {
        let diag = Diagnostic::new(DiagnosticCode::DriftFingerprintMismatch, "user drifted")
            .with_table("user")
            .with_file(Path::new("shopmodel/user.gen.go"))
            .with_comparison("abc123", "def456");

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["file"], "shopmodel/user.gen.go");
        assert_eq!(json["expected"], "abc123");
        assert_eq!(json["actual"], "def456");
    }
}
