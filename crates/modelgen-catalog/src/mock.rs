//! In-memory catalog for tests and dry runs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use modelgen_catalog::{MockCatalogBuilder, SchemaCatalog};
//! use modelgen_core::ColumnMetadata;
//!
//! let catalog = MockCatalogBuilder::new("dev_shop")
//!     .with_table("user", vec![
//!         ColumnMetadata::new("id", "bigint").with_primary_key(true),
//!         ColumnMetadata::new("name", "text"),
//!     ])
//!     .build();
//!
//! let columns = catalog.fetch_columns("user").await?;
//! ```

use crate::adapter::{CatalogError, SchemaCatalog};
use modelgen_core::ColumnMetadata;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Catalog backed by in-memory tables
///
/// Clones share the same table storage.
#[derive(Clone)]
pub struct MockCatalog {
    database: String,

    /// Columns by table name
    tables: Arc<RwLock<BTreeMap<String, Vec<ColumnMetadata>>>>,

    /// Errors returned for specific tables
    errors: Arc<RwLock<HashMap<String, CatalogError>>>,

    /// Error returned by `list_tables`
    list_error: Option<CatalogError>,

    fail_connection: bool,
}

impl MockCatalog {
    /// Create an empty catalog for a database name
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Arc::new(RwLock::new(BTreeMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            list_error: None,
            fail_connection: false,
        }
    }

    /// Add or replace a table
    pub async fn add_table(&self, table: impl Into<String>, columns: Vec<ColumnMetadata>) {
        self.tables.write().await.insert(table.into(), columns);
    }

    /// Remove a table
    pub async fn remove_table(&self, table: &str) {
        self.tables.write().await.remove(table);
    }

    /// Configure an error for one table's column query
    pub async fn add_error_for_table(&self, table: impl Into<String>, error: CatalogError) {
        self.errors.write().await.insert(table.into(), error);
    }

    /// Fail every `test_connection` call
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Fail every `list_tables` call
    pub fn with_list_failure(mut self, error: CatalogError) -> Self {
        self.list_error = Some(error);
        self
    }
}

#[async_trait::async_trait]
impl SchemaCatalog for MockCatalog {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<String>, CatalogError> {
        if let Some(error) = &self.list_error {
            return Err(error.clone());
        }
        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn fetch_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>, CatalogError> {
        if let Some(error) = self.errors.read().await.get(table) {
            return Err(error.clone());
        }

        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| CatalogError::TableNotFound(table.to_string()))
    }

    async fn test_connection(&self) -> Result<(), CatalogError> {
        if self.fail_connection {
            Err(CatalogError::ConnectionFailed(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Fluent construction of a [`MockCatalog`] without awaiting
pub struct MockCatalogBuilder {
    database: String,
    tables: BTreeMap<String, Vec<ColumnMetadata>>,
    errors: HashMap<String, CatalogError>,
    list_error: Option<CatalogError>,
    fail_connection: bool,
}

impl MockCatalogBuilder {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: BTreeMap::new(),
            errors: HashMap::new(),
            list_error: None,
            fail_connection: false,
        }
    }

    /// Add a table; ordinals are assigned from the vector order when unset
    pub fn with_table(mut self, table: &str, columns: Vec<ColumnMetadata>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, column)| {
                if column.ordinal == 0 {
                    column.with_ordinal(i as u32 + 1)
                } else {
                    column
                }
            })
            .collect();
        self.tables.insert(table.to_string(), columns);
        self
    }

    pub fn with_error(mut self, table: &str, error: CatalogError) -> Self {
        self.errors.insert(table.to_string(), error);
        self
    }

    pub fn with_list_failure(mut self, error: CatalogError) -> Self {
        self.list_error = Some(error);
        self
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn build(self) -> MockCatalog {
        MockCatalog {
            database: self.database,
            tables: Arc::new(RwLock::new(self.tables)),
            errors: Arc::new(RwLock::new(self.errors)),
            list_error: self.list_error,
            fail_connection: self.fail_connection,
        }
    }
}
