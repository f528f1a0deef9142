//! Column metadata, generated fields and the per-run accumulators

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::type_map;

/// A column as reported by the schema catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name, case preserved as stored
    pub name: String,

    /// Free-text column comment (empty when the catalog has none)
    pub comment: String,

    /// Catalog data type, e.g. `bigint` or `character varying(64)`
    pub data_type: String,

    /// Whether the column accepts NULL
    pub nullable: bool,

    /// Whether the column is part of the primary key
    pub primary_key: bool,

    /// 1-indexed ordinal position within the table
    pub ordinal: u32,
}

impl ColumnMetadata {
    /// Create a nullable, non-key column with an empty comment
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: String::new(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            ordinal: 0,
        }
    }

    /// Set the column comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set nullability
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark as primary key (implies NOT NULL)
    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        if primary_key {
            self.nullable = false;
        }
        self
    }

    /// Set ordinal position
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }
}

/// Ordered struct-tag slots (`gorm`, `json`, `i18n`, ...)
///
/// Setting an existing key replaces its value in place, so emission order
/// stays the order in which keys were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    slots: Vec<(String, String)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot, replacing any previous value for the same key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.slots.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.slots.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Column name recorded in the `gorm` slot (`column:<name>`), or "" if none
    pub fn db_column(&self) -> &str {
        self.get("gorm")
            .and_then(|gorm| {
                gorm.split(';')
                    .find_map(|part| part.strip_prefix("column:"))
            })
            .unwrap_or("")
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:\"{}\"", key, value)?;
        }
        Ok(())
    }
}

/// A struct field derived from one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Identifier emitted in the struct
    pub name: String,

    /// Declared Go type
    pub go_type: String,

    /// Source column name
    pub column_name: String,

    /// Catalog data type
    pub column_type: String,

    /// Source column comment
    pub column_comment: String,

    /// Struct tags; `None` means the field carries no tags at all
    pub tags: Option<TagSet>,

    /// Excluded from emission
    pub ignored: bool,
}

impl Field {
    /// Build the untransformed field for a column
    ///
    /// The name is the raw column name until the transformer resolves it.
    pub fn from_column(column: &ColumnMetadata) -> Self {
        let mut gorm = format!("column:{};type:{}", column.name, column.data_type);
        if column.primary_key {
            gorm.push_str(";primaryKey");
        } else if !column.nullable {
            gorm.push_str(";not null");
        }

        let mut tags = TagSet::new();
        tags.set("gorm", gorm);

        Self {
            name: column.name.clone(),
            go_type: type_map::go_type(&column.data_type).to_string(),
            column_name: column.name.clone(),
            column_type: column.data_type.clone(),
            column_comment: column.comment.clone(),
            tags: Some(tags),
            ignored: false,
        }
    }

    /// Drop all tags
    pub fn without_tags(mut self) -> Self {
        self.tags = None;
        self
    }

    /// Value of one tag slot, if tags are present and the slot is set
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref().and_then(|t| t.get(key))
    }
}

/// Table name -> fields processed for it, in visit order
///
/// Owned by a single generation run.
#[derive(Debug, Clone, Default)]
pub struct TableFieldRegistry {
    tables: HashMap<String, Vec<Field>>,
}

impl TableFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field to the table's entry
    pub fn register(&mut self, table: &str, field: Field) {
        self.tables.entry(table.to_string()).or_default().push(field);
    }

    /// Fields registered for a table (empty if none)
    pub fn fields(&self, table: &str) -> &[Field] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove and return a table's entry
    pub fn take(&mut self, table: &str) -> Vec<Field> {
        self.tables.remove(table).unwrap_or_default()
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Column names excluded from generation for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreSet {
    columns: BTreeSet<String>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column; returns false if it was already present
    pub fn insert(&mut self, column: impl Into<String>) -> bool {
        self.columns.insert(column.into())
    }

    /// Case-sensitive membership test
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for IgnoreSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.columns.extend(iter.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_set_replaces_in_place() {
        let mut tags = TagSet::new();
        tags.set("gorm", "column:id");
        tags.set("json", "id");
        tags.set("gorm", "column:uid");

        assert_eq!(tags.len(), 2);
        assert_eq!(tags.to_string(), r#"gorm:"column:uid" json:"id""#);
    }

    #[test]
    fn db_column_reads_gorm_slot() {
        let mut tags = TagSet::new();
        tags.set("gorm", "type:bigint;column:user_id;primaryKey");
        assert_eq!(tags.db_column(), "user_id");

        assert_eq!(TagSet::new().db_column(), "");
    }

    #[test]
    fn field_from_primary_key_column() {
        let column = ColumnMetadata::new("id", "bigint").with_primary_key(true);
        let field = Field::from_column(&column);

        assert_eq!(field.go_type, "int64");
        assert_eq!(field.tag("gorm"), Some("column:id;type:bigint;primaryKey"));
        assert!(!field.ignored);
    }

    #[test]
    fn field_from_not_null_column() {
        let column = ColumnMetadata::new("name", "varchar(64)").with_nullable(false);
        let field = Field::from_column(&column);

        assert_eq!(field.go_type, "string");
        assert_eq!(field.tag("gorm"), Some("column:name;type:varchar(64);not null"));
    }

    #[test]
    fn registry_keeps_visit_order_per_table() {
        let mut registry = TableFieldRegistry::new();
        registry.register("user", Field::from_column(&ColumnMetadata::new("b", "text")));
        registry.register("user", Field::from_column(&ColumnMetadata::new("a", "text")));
        registry.register("order", Field::from_column(&ColumnMetadata::new("id", "bigint")));

        let names: Vec<_> = registry
            .fields("user")
            .iter()
            .map(|f| f.column_name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(registry.table_count(), 2);
        assert!(registry.fields("missing").is_empty());

        assert_eq!(registry.take("order").len(), 1);
        assert!(!registry.contains_table("order"));
    }

    #[test]
    fn ignore_set_is_idempotent() {
        let mut set = IgnoreSet::new();
        assert!(set.insert("legacy_flag"));
        assert!(!set.insert("legacy_flag"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("legacy_flag"));
        assert!(!set.contains("LEGACY_FLAG"));
    }
}
