//! Canonical schema fingerprint
//!
//! A fingerprint summarizes the shape of a generated model: the multiset of
//! `<db column>.<declared type>.<json tag>` signatures of its fields. Field
//! order never affects the result.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::schema::Field;

/// Signatures of the audit columns every model is anchored on
pub const BASELINE_SIGNATURES: [&str; 3] = [
    "id.int64.id",
    "update_time.time.Time.updateTime",
    "create_time.time.Time.createTime",
];

/// Joins sorted signatures before hashing
pub const SIGNATURE_DELIMITER: &str = ",";

/// Number of hex characters kept from the digest
pub const FINGERPRINT_LEN: usize = 6;

/// Short lowercase hex digest of a model's field set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a table's registered fields
    pub fn compute(fields: &[Field]) -> Self {
        Self::from_signatures(fields.iter().map(signature))
    }

    /// Compute from already-built field signatures (baseline is added here)
    pub fn from_signatures<I>(signatures: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut all: Vec<String> = BASELINE_SIGNATURES.iter().map(|s| s.to_string()).collect();
        all.extend(signatures);
        all.sort();

        let digest = Sha256::digest(all.join(SIGNATURE_DELIMITER).as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(FINGERPRINT_LEN);
        Self(hex)
    }

    /// Accept an existing fingerprint string (e.g. read back from a file)
    ///
    /// Returns `None` unless it is exactly six lowercase hex characters.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == FINGERPRINT_LEN
            && s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `<db column>.<declared type>.<json tag before any comma>`
pub fn signature(field: &Field) -> String {
    let (db_column, json) = match &field.tags {
        Some(tags) => (
            tags.db_column(),
            tags.get("json")
                .map(|tag| tag.split(',').next().unwrap_or(""))
                .unwrap_or(""),
        ),
        None => ("", ""),
    };
    format!("{}.{}.{}", db_column, field.go_type, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMetadata, Field};

    fn field(column: &str, data_type: &str, json: &str) -> Field {
        let mut field = Field::from_column(&ColumnMetadata::new(column, data_type));
        if let Some(tags) = field.tags.as_mut() {
            tags.set("json", json);
        }
        field
    }

    #[test]
    fn signature_cuts_json_qualifiers() {
        let f = field("name", "text", "name,omitempty");
        assert_eq!(signature(&f), "name.string.name");
    }

    #[test]
    fn signature_without_tags() {
        let f = field("name", "text", "name").without_tags();
        assert_eq!(signature(&f), ".string.");
    }

    #[test]
    fn empty_table_has_stable_fingerprint() {
        let a = Fingerprint::compute(&[]);
        let b = Fingerprint::from_signatures(Vec::new());
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
        assert!(Fingerprint::parse(a.as_str()).is_some());
    }

    #[test]
    fn duplicates_are_not_collapsed() {
        let once = Fingerprint::from_signatures(vec!["id.int64.id".to_string()]);
        let baseline_only = Fingerprint::compute(&[]);
        assert_ne!(once, baseline_only);
    }

    fn order_fields() -> Vec<Field> {
        vec![
            field("id", "bigint", "id"),
            field("status", "smallint", "status"),
            field("amount", "numeric", "amount"),
            field("create_time", "timestamp", "createTime"),
        ]
    }

    #[test]
    fn field_order_does_not_matter() {
        let fields = order_fields();
        let mut reversed = fields.clone();
        reversed.reverse();
        let mut rotated = fields.clone();
        rotated.rotate_left(1);

        let expected = Fingerprint::compute(&fields);
        assert_eq!(Fingerprint::compute(&reversed), expected);
        assert_eq!(Fingerprint::compute(&rotated), expected);
    }

    #[test]
    fn type_and_json_tag_changes_are_detected() {
        let base = Fingerprint::compute(&order_fields());

        let mut retyped = order_fields();
        retyped[1].go_type = "int64".to_string();
        assert_ne!(Fingerprint::compute(&retyped), base);

        let mut retagged = order_fields();
        if let Some(tags) = retagged[2].tags.as_mut() {
            tags.set("json", "total");
        }
        assert_ne!(Fingerprint::compute(&retagged), base);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Fingerprint::parse("abc123").is_some());
        assert!(Fingerprint::parse("ABC123").is_none());
        assert!(Fingerprint::parse("abc12").is_none());
        assert!(Fingerprint::parse("abcxyz").is_none());
    }
}
