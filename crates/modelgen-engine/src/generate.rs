//! Generation run orchestration
//!
//! A run resolves its tables and output layout, emits one model file per
//! table, then post-processes every emitted file. Tables are handled one at
//! a time; the field registry lives only for the run.

use std::path::{Path, PathBuf};

use modelgen_catalog::{CatalogError, SchemaCatalog};
use modelgen_core::{
    ColumnMetadata, Config, Diagnostic, DiagnosticCode, Field, Fingerprint, IgnoreSet,
    NamingStrategy, TableFieldRegistry, WriteErrorPolicy,
};
use modelgen_template::{ModelEmitter, ModelSpec, RenderError};

use crate::deprecated::DeprecatedColumnFilter;
use crate::output;
use crate::rewrite::SourceRewriter;
use crate::transform::FieldTransformer;

/// Errors that abort a generation run
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Go package name and directory the model files are written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub package: String,
    pub dir: PathBuf,
}

impl OutputLayout {
    /// `<out>/<db>model` for the default output dir, otherwise `<out>` with
    /// its last component as package name
    pub fn resolve(database: &str, config: &Config) -> Self {
        let mut db = database;
        for prefix in &config.strip_db_prefixes {
            db = db.strip_prefix(prefix.as_str()).unwrap_or(db);
        }
        let package = format!("{}model", db.to_lowercase());

        let out_dir = config.out_dir_path();
        if config.uses_default_out_dir() {
            return Self {
                dir: out_dir.join(&package),
                package,
            };
        }

        let package = config
            .out_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(package);
        Self {
            package,
            dir: out_dir,
        }
    }

    /// `<dir>/<table>.<suffix>`
    pub fn file_path(&self, table: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", table, suffix))
    }
}

/// What happened to one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    pub table: String,
    pub model: String,
    pub path: PathBuf,
    pub fields: usize,
    pub ignored: Vec<String>,
    pub fingerprint: Fingerprint,

    /// False when the formatter failed or the file was skipped
    pub formatted: bool,

    /// Set when post-processing failed under the skip policy
    pub skipped: Option<String>,
}

/// Result of a generation run
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    pub layout: OutputLayout,
    pub tables: Vec<TableOutcome>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationSummary {
    pub fn skipped_count(&self) -> usize {
        self.tables.iter().filter(|t| t.skipped.is_some()).count()
    }

    pub fn degraded_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.skipped.is_none() && !t.formatted)
            .count()
    }
}

/// A table's columns, ignore set and fields
#[derive(Debug, Clone)]
pub struct PreparedTable {
    pub columns: Vec<ColumnMetadata>,
    pub ignore: IgnoreSet,
    pub fields: Vec<Field>,
}

/// Fetch a table, collect its deprecated columns and transform the rest
///
/// Only surviving fields are transformed and registered; ignored ones are
/// kept in the returned list, marked, with their raw names.
pub async fn prepare_table(
    catalog: &dyn SchemaCatalog,
    transformer: &FieldTransformer,
    table: &str,
    registry: &mut TableFieldRegistry,
) -> Result<PreparedTable, CatalogError> {
    let mut ignore = IgnoreSet::new();
    let columns = DeprecatedColumnFilter::new(catalog)
        .collect(table, &mut ignore)
        .await?;

    let fields = columns
        .iter()
        .map(|column| {
            let mut field = Field::from_column(column);
            if ignore.contains(&column.name) {
                field.ignored = true;
                field
            } else {
                transformer.transform(table, field, registry)
            }
        })
        .collect();

    Ok(PreparedTable {
        columns,
        ignore,
        fields,
    })
}

struct Emitted {
    table: String,
    model: String,
    path: PathBuf,
    fields: usize,
    ignored: Vec<String>,
}

/// Runs generation for one configuration against one catalog
pub struct Generator<'a> {
    catalog: &'a dyn SchemaCatalog,
    config: &'a Config,
    naming: NamingStrategy,
    transformer: FieldTransformer,
    emitter: ModelEmitter,
    rewriter: SourceRewriter,
}

impl<'a> Generator<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, config: &'a Config) -> Self {
        Self {
            catalog,
            config,
            naming: NamingStrategy::new(config.aliases.clone()),
            transformer: FieldTransformer::from_config(config),
            emitter: ModelEmitter::new(),
            rewriter: SourceRewriter::from_config(&config.rewrite),
        }
    }

    /// Replace the rewriter built from configuration
    pub fn with_rewriter(mut self, rewriter: SourceRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Configured tables, or every table in the catalog; duplicates dropped
    pub async fn resolve_tables(&self) -> Result<Vec<String>, CatalogError> {
        let tables = if self.config.tables.is_empty() {
            self.catalog.list_tables().await?
        } else {
            self.config.tables.clone()
        };

        let mut unique = Vec::with_capacity(tables.len());
        for table in tables {
            if !unique.contains(&table) {
                unique.push(table);
            }
        }
        Ok(unique)
    }

    pub async fn run(&self) -> Result<GenerationSummary, GenerateError> {
        let tables = self.resolve_tables().await?;
        let layout = OutputLayout::resolve(self.catalog.database_name(), self.config);
        tracing::info!(
            database = self.catalog.database_name(),
            package = %layout.package,
            out = %layout.dir.display(),
            tables = ?tables,
            "Generating models"
        );

        std::fs::create_dir_all(&layout.dir).map_err(|e| GenerateError::io(&layout.dir, e))?;

        let mut registry = TableFieldRegistry::new();
        let mut emitted = Vec::with_capacity(tables.len());
        for table in &tables {
            emitted.push(self.emit_table(table, &layout, &mut registry).await?);
        }

        let mut outcomes = Vec::with_capacity(emitted.len());
        let mut diagnostics = Vec::new();
        for item in emitted {
            let fingerprint = Fingerprint::compute(&registry.take(&item.table));
            outcomes.push(self.process_file(item, fingerprint, &mut diagnostics)?);
        }

        tracing::info!(tables = outcomes.len(), "All models generated and processed");

        Ok(GenerationSummary {
            layout,
            tables: outcomes,
            diagnostics,
        })
    }

    async fn emit_table(
        &self,
        table: &str,
        layout: &OutputLayout,
        registry: &mut TableFieldRegistry,
    ) -> Result<Emitted, GenerateError> {
        let prepared = prepare_table(self.catalog, &self.transformer, table, registry).await?;
        let model = self.naming.model_name(table);

        let text = self.emitter.render(&ModelSpec {
            package: &layout.package,
            table,
            model: &model,
            fields: &prepared.fields,
        })?;

        let path = layout.file_path(table, &self.config.generated_suffix);
        output::write_restricted(&path, text.as_bytes()).map_err(|e| GenerateError::io(&path, e))?;
        tracing::debug!(table, model = %model, path = %path.display(), "Emitted model");

        Ok(Emitted {
            table: table.to_string(),
            model,
            path,
            fields: prepared.fields.iter().filter(|f| !f.ignored).count(),
            ignored: prepared.ignore.to_vec(),
        })
    }

    fn process_file(
        &self,
        item: Emitted,
        fingerprint: Fingerprint,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<TableOutcome, GenerateError> {
        let file = item.path.as_path();

        let rewritten = self.rewriter.rewrite_file(&item.path, Some(&fingerprint));
        let (formatted, skipped) = match rewritten {
            Ok(outcome) => {
                if let Some(error) = &outcome.format_error {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::GenerateFormatDegraded,
                            format!("Formatter failed, file left unformatted: {}", error),
                        )
                        .with_table(&item.table)
                        .with_file(file),
                    );
                }
                (outcome.formatted, None)
            }
            Err(e) => {
                tracing::warn!(
                    table = %item.table,
                    path = %item.path.display(),
                    error = %e,
                    "Failed to process generated file"
                );
                if self.config.on_write_error == WriteErrorPolicy::Abort {
                    return Err(GenerateError::io(&item.path, e));
                }
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::GenerateFileSkipped,
                        format!("Generated file was not processed: {}", e),
                    )
                    .with_table(&item.table)
                    .with_file(file),
                );
                (false, Some(e.to_string()))
            }
        };

        Ok(TableOutcome {
            table: item.table,
            model: item.model,
            path: item.path,
            fields: item.fields,
            ignored: item.ignored,
            fingerprint,
            formatted,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgen_catalog::MockCatalogBuilder;
    use pretty_assertions::assert_eq;

    fn config_with_out(out: &str) -> Config {
        Config {
            out_dir: PathBuf::from(out),
            ..Config::default()
        }
    }

    #[test]
    fn default_layout_uses_database_name() {
        let layout = OutputLayout::resolve("dev_Shop", &Config::default());
        assert_eq!(layout.package, "shopmodel");
        assert_eq!(layout.dir, PathBuf::from("./shopmodel"));
    }

    #[test]
    fn prefixes_are_stripped_in_order() {
        let config = Config::default();
        assert_eq!(OutputLayout::resolve("dev_test_crm", &config).package, "crmmodel");
        assert_eq!(OutputLayout::resolve("test_dev_crm", &config).package, "dev_crmmodel");
    }

    #[test]
    fn layout_resolves_against_project_root() {
        let config = Config {
            project_root: PathBuf::from("svc"),
            ..config_with_out("internal/entity")
        };
        let layout = OutputLayout::resolve("shop", &config);
        assert_eq!(layout.package, "entity");
        assert_eq!(layout.dir, PathBuf::from("svc/internal/entity"));

        let config = Config {
            project_root: PathBuf::from("svc"),
            ..Config::default()
        };
        let layout = OutputLayout::resolve("dev_shop", &config);
        assert_eq!(layout.package, "shopmodel");
        assert_eq!(layout.dir, PathBuf::from("svc/shopmodel"));
    }

    #[test]
    fn custom_out_dir_sets_package() {
        let layout = OutputLayout::resolve("shop", &config_with_out("internal/entity"));
        assert_eq!(layout.package, "entity");
        assert_eq!(layout.dir, PathBuf::from("internal/entity"));
        assert_eq!(
            layout.file_path("user", "gen.go"),
            PathBuf::from("internal/entity/user.gen.go")
        );
    }

    #[tokio::test]
    async fn resolves_tables_from_catalog_or_config() {
        let catalog = MockCatalogBuilder::new("shop")
            .with_table("b", vec![ColumnMetadata::new("id", "bigint")])
            .with_table("a", vec![ColumnMetadata::new("id", "bigint")])
            .build();

        let config = Config::default();
        let all = Generator::new(&catalog, &config).resolve_tables().await.unwrap();
        assert_eq!(all, vec!["a", "b"]);

        let config = Config {
            tables: vec!["b".into(), "a".into(), "b".into()],
            ..Config::default()
        };
        let chosen = Generator::new(&catalog, &config).resolve_tables().await.unwrap();
        assert_eq!(chosen, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn prepare_marks_and_skips_deprecated() {
        let catalog = MockCatalogBuilder::new("shop")
            .with_table(
                "user",
                vec![
                    ColumnMetadata::new("id", "bigint").with_primary_key(true),
                    ColumnMetadata::new("legacy_flag", "boolean").with_comment("@deprecated"),
                ],
            )
            .build();
        let mut registry = TableFieldRegistry::new();

        let prepared = prepare_table(&catalog, &FieldTransformer::default(), "user", &mut registry)
            .await
            .unwrap();

        assert_eq!(prepared.fields.len(), 2);
        assert!(prepared.fields[1].ignored);
        assert_eq!(prepared.fields[1].name, "legacy_flag");
        assert_eq!(registry.fields("user").len(), 1);
        assert_eq!(prepared.columns.len(), 2);
    }
}
