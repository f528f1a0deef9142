//! Comment-driven column exclusion

use modelgen_catalog::{CatalogError, SchemaCatalog};
use modelgen_core::marker::{self, DEPRECATED};
use modelgen_core::{ColumnMetadata, IgnoreSet};

/// Collects columns whose comment carries the `@deprecated` marker
pub struct DeprecatedColumnFilter<'a> {
    catalog: &'a dyn SchemaCatalog,
}

impl<'a> DeprecatedColumnFilter<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Fetch a table's columns and add its deprecated ones to `ignore`
    ///
    /// The fetched columns are returned so callers need not query again.
    pub async fn collect(
        &self,
        table: &str,
        ignore: &mut IgnoreSet,
    ) -> Result<Vec<ColumnMetadata>, CatalogError> {
        let columns = self.catalog.fetch_columns(table).await?;
        scan(&columns, ignore);

        if !ignore.is_empty() {
            tracing::info!(table, ignored = ?ignore.to_vec(), "Ignoring deprecated columns");
        }

        Ok(columns)
    }
}

/// Add every deprecated column to `ignore`; returns how many were new
pub fn scan(columns: &[ColumnMetadata], ignore: &mut IgnoreSet) -> usize {
    columns
        .iter()
        .filter(|c| marker::has_marker(&c.comment, DEPRECATED))
        .filter(|c| ignore.insert(c.name.clone()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgen_catalog::MockCatalogBuilder;

    fn columns() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("id", "bigint"),
            ColumnMetadata::new("legacy_flag", "boolean").with_comment("@Deprecated since v2"),
            ColumnMetadata::new("old_name", "text").with_comment("renamed @DEPRECATED"),
            ColumnMetadata::new("name", "text").with_comment("display name"),
        ]
    }

    #[test]
    fn scan_is_case_insensitive_and_idempotent() {
        let mut ignore = IgnoreSet::new();
        assert_eq!(scan(&columns(), &mut ignore), 2);
        assert_eq!(scan(&columns(), &mut ignore), 0);

        assert_eq!(ignore.to_vec(), vec!["legacy_flag", "old_name"]);
    }

    #[tokio::test]
    async fn collect_returns_columns() {
        let catalog = MockCatalogBuilder::new("shop")
            .with_table("user", columns())
            .build();

        let mut ignore = IgnoreSet::new();
        let fetched = DeprecatedColumnFilter::new(&catalog)
            .collect("user", &mut ignore)
            .await
            .unwrap();

        assert_eq!(fetched.len(), 4);
        assert_eq!(ignore.len(), 2);
    }

    #[tokio::test]
    async fn collect_propagates_catalog_errors() {
        let catalog = MockCatalogBuilder::new("shop").build();

        let mut ignore = IgnoreSet::new();
        let result = DeprecatedColumnFilter::new(&catalog)
            .collect("missing", &mut ignore)
            .await;

        assert!(matches!(result, Err(CatalogError::TableNotFound(_))));
        assert!(ignore.is_empty());
    }
}
