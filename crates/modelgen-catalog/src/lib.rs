//! Schema catalogs for model generation
//!
//! A catalog lists the tables of the current schema and returns column
//! metadata (name, type, nullability, key membership, comment) for each one.
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL support via `tokio-postgres`
//!
//! ## Example
//!
//! ```rust,ignore
//! use modelgen_catalog::{PostgresCatalog, SchemaCatalog};
//!
//! let dsn = "host=localhost dbname=shop user=app";
//! let catalog = PostgresCatalog::from_connection_string(dsn).await?;
//! for table in catalog.list_tables().await? {
//!     let columns = catalog.fetch_columns(&table).await?;
//! }
//! ```

pub mod adapter;
pub mod mock;
pub mod postgres;

pub use adapter::{CatalogError, SchemaCatalog};
pub use mock::{MockCatalog, MockCatalogBuilder};
pub use postgres::PostgresCatalog;
