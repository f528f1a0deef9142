//! Catalog trait for reading table and column metadata

use modelgen_core::ColumnMetadata;

/// Errors that can occur when reading the schema catalog
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Source of table and column metadata for the current schema
#[async_trait::async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Catalog name (e.g. "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Name of the database the catalog is connected to
    fn database_name(&self) -> &str;

    /// All base tables in the current schema, sorted by name
    async fn list_tables(&self) -> Result<Vec<String>, CatalogError>;

    /// Columns of one table, in ordinal order
    async fn fetch_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>, CatalogError>;

    /// Verify the connection is usable
    async fn test_connection(&self) -> Result<(), CatalogError>;
}
