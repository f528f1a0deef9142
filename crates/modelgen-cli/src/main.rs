use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use modelgen_catalog::{PostgresCatalog, SchemaCatalog};
use modelgen_core::{AliasMap, Config, Report, Severity};
use modelgen_engine::{DriftCheck, GenerationSummary, Generator};

/// Environment variable read when `--dsn` is not given
const DSN_ENV: &str = "MODELGEN_DSN";

/// Config file picked up from the working directory
const DEFAULT_CONFIG_FILE: &str = "modelgen.toml";

/// modelgen - GORM model generation from a live database schema
#[derive(Parser)]
#[command(name = "modelgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: modelgen.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by commands that talk to the database
#[derive(clap::Args, Debug, Default)]
struct TargetArgs {
    /// Database connection string (falls back to MODELGEN_DSN)
    #[arg(long)]
    dsn: Option<String>,

    /// Connect over TLS
    #[arg(long)]
    tls: bool,

    /// Table to process; repeat for several (default: all tables)
    #[arg(short = 't', long = "table")]
    tables: Vec<String>,

    /// Output directory
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate model files for the selected tables
    Generate {
        #[command(flatten)]
        target: TargetArgs,

        /// Model name override as table=Model; repeat for several
        #[arg(short = 'a', long = "alias")]
        aliases: Vec<String>,

        /// Append the SerialVersion fingerprint trailer
        #[arg(long)]
        emit_fingerprint: bool,
    },

    /// Compare generated models with the live schema
    Check {
        #[command(flatten)]
        target: TargetArgs,

        /// Output file for the drift report
        #[arg(short, long, default_value = "drift-report.json")]
        report: PathBuf,
    },

    /// Write a default modelgen.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone();

    match cli.command {
        Commands::Generate {
            target,
            aliases,
            emit_fingerprint,
        } => {
            let mut config = load_config(config_path.as_deref(), cli.verbose)?;
            apply_target_args(&mut config, &target);
            config.aliases.merge(&AliasMap::parse(&aliases));
            if emit_fingerprint {
                config.rewrite.emit_fingerprint = true;
            }
            generate_command(&config, &target, cli.verbose).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { target, report } => {
            let mut config = load_config(config_path.as_deref(), cli.verbose)?;
            apply_target_args(&mut config, &target);
            let drifted = check_command(&config, &target, &report, cli.verbose).await?;
            Ok(if drifted {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Init { force } => {
            let path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            init_command(&path, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// stderr logging; RUST_LOG wins over the verbosity flag
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(path) = path {
        Config::from_file(path)?
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG_FILE))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };
    Ok(config)
}

/// Command-line values override the config file; `-o` is relative to the
/// working directory, not the config file
fn apply_target_args(config: &mut Config, target: &TargetArgs) {
    if !target.tables.is_empty() {
        config.tables = target.tables.clone();
    }
    if let Some(out) = &target.out {
        config.out_dir = out.clone();
        config.project_root = PathBuf::new();
    }
}

/// `--dsn`, then `MODELGEN_DSN`, then the config file
fn resolve_dsn(config: &Config, target: &TargetArgs) -> Result<String> {
    target
        .dsn
        .clone()
        .or_else(|| std::env::var(DSN_ENV).ok().filter(|v| !v.is_empty()))
        .or_else(|| config.dsn.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No database connection string. Pass --dsn, set {} or add `dsn` to {}",
                DSN_ENV,
                DEFAULT_CONFIG_FILE
            )
        })
}

async fn connect(config: &Config, target: &TargetArgs, verbose: bool) -> Result<PostgresCatalog> {
    let dsn = resolve_dsn(config, target)?;

    let catalog = if target.tls {
        PostgresCatalog::from_connection_string_with_tls(&dsn).await?
    } else {
        PostgresCatalog::from_connection_string(&dsn).await?
    };
    tracing::info!(database = %catalog.target(), "Connected to database");

    catalog
        .test_connection()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    if verbose {
        eprintln!("{}", "✓ Connection successful".green());
    }

    Ok(catalog)
}

async fn generate_command(config: &Config, target: &TargetArgs, verbose: bool) -> Result<()> {
    let catalog = connect(config, target, verbose).await?;

    if verbose {
        eprintln!("{}", "Generating models...".cyan());
    }

    let summary = Generator::new(&catalog, config).run().await?;
    print_generation_summary(&summary);

    Ok(())
}

fn print_generation_summary(summary: &GenerationSummary) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Model Generation Summary".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Package: {}", summary.layout.package);
    println!("Output:  {}", summary.layout.dir.display());
    println!();

    for table in &summary.tables {
        let status = if table.skipped.is_some() {
            "SKIPPED".yellow().bold()
        } else if !table.formatted {
            "UNFORMATTED".yellow()
        } else {
            "OK".green()
        };

        println!(
            "  [{}] {} -> {} ({} fields, fingerprint {})",
            status,
            table.table,
            table.model,
            table.fields,
            table.fingerprint
        );
        println!("    File: {}", table.path.display());
        if !table.ignored.is_empty() {
            println!("    Ignored: {}", table.ignored.join(", "));
        }
        if let Some(reason) = &table.skipped {
            println!("    Reason: {}", reason);
        }
    }

    println!();
    println!("Tables generated: {}", summary.tables.len());
    if summary.degraded_count() > 0 {
        println!("  Unformatted: {}", format!("{}", summary.degraded_count()).yellow());
    }
    if summary.skipped_count() > 0 {
        println!("  Skipped:     {}", format!("{}", summary.skipped_count()).yellow());
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Returns whether drift errors were found; the connection is closed by then
async fn check_command(
    config: &Config,
    target: &TargetArgs,
    output: &Path,
    verbose: bool,
) -> Result<bool> {
    let catalog = connect(config, target, verbose).await?;
    let report = run_check(&catalog, config, output, verbose).await?;
    Ok(report.has_errors())
}

async fn run_check(
    catalog: &dyn SchemaCatalog,
    config: &Config,
    output: &Path,
    verbose: bool,
) -> Result<Report> {
    if verbose {
        eprintln!("{}", "Checking generated models for drift...".cyan());
    }

    let report = DriftCheck::new(catalog, config).run().await?;
    report.save_to_file(output)?;

    if verbose {
        eprintln!("{} {}", "Drift report saved to:".green(), output.display());
    }

    print_drift_summary(&report);
    Ok(report)
}

fn print_drift_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Model Drift Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Tables checked: {}", report.summary.tables_checked);
    println!("Tables drifted: {}", report.summary.tables_drifted);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Total diagnostics: {}", report.summary.total);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ All models match the schema".green().bold());
    } else {
        println!("{}", "Drift Details:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(file) = &diag.file {
                println!("    File:     {}", file);
            }
            if let Some(exp) = &diag.expected {
                println!("    Expected: {}", exp);
            }
            if let Some(act) = &diag.actual {
                println!("    Actual:   {}", act);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn init_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
    }

    Config::default().save_to_file(path)?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgen_catalog::{CatalogError, MockCatalogBuilder};
    use modelgen_core::config::RewriteConfig;
    use modelgen_core::ColumnMetadata;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::parse_from([
            "modelgen", "generate", "--dsn", "postgres://localhost/shop", "-t", "user", "-t",
            "order", "-o", "internal/entity", "-a", "user=Member", "--emit-fingerprint",
        ]);

        let Commands::Generate {
            target,
            aliases,
            emit_fingerprint,
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(target.tables, vec!["user", "order"]);
        assert_eq!(target.out, Some(PathBuf::from("internal/entity")));
        assert_eq!(aliases, vec!["user=Member"]);
        assert!(emit_fingerprint);
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config {
            tables: vec!["a".to_string()],
            project_root: PathBuf::from("conf"),
            ..Config::default()
        };
        let target = TargetArgs {
            tables: vec!["b".to_string()],
            out: Some(PathBuf::from("models")),
            ..TargetArgs::default()
        };

        apply_target_args(&mut config, &target);
        assert_eq!(config.tables, vec!["b"]);
        assert_eq!(config.out_dir, PathBuf::from("models"));
        assert_eq!(config.out_dir_path(), PathBuf::from("models"));

        apply_target_args(&mut config, &TargetArgs::default());
        assert_eq!(config.tables, vec!["b"]);
    }

    #[test]
    fn dsn_flag_wins_over_config() {
        let config = Config {
            dsn: Some("from-config".to_string()),
            ..Config::default()
        };
        let target = TargetArgs {
            dsn: Some("from-flag".to_string()),
            ..TargetArgs::default()
        };
        assert_eq!(resolve_dsn(&config, &target).unwrap(), "from-flag");
    }

    #[tokio::test]
    async fn default_build_talks_to_postgres() {
        let target = TargetArgs {
            dsn: Some("host=localhost port=not-a-port".to_string()),
            ..TargetArgs::default()
        };
        let err = connect(&Config::default(), &target, false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::InvalidConnectionString(_))
        ));
    }

    #[tokio::test]
    async fn check_returns_drift_instead_of_exiting() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            out_dir: dir.path().join("entity"),
            rewrite: RewriteConfig {
                emit_fingerprint: true,
                ..RewriteConfig::default()
            },
            ..Config::default()
        };
        let catalog = MockCatalogBuilder::new("shop")
            .with_table("user", vec![ColumnMetadata::new("id", "bigint")])
            .build();
        Generator::new(&catalog, &config).run().await.unwrap();

        let output = dir.path().join("drift-report.json");
        let clean = run_check(&catalog, &config, &output, false).await.unwrap();
        assert!(!clean.has_errors());

        catalog
            .add_table("user", vec![ColumnMetadata::new("uid", "bigint")])
            .await;
        let drifted = run_check(&catalog, &config, &output, false).await.unwrap();
        assert!(drifted.has_errors());

        let saved: Report =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(saved.summary.errors, 1);
    }

    #[test]
    fn init_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelgen.toml");

        init_command(&path, false).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.generated_suffix, "gen.go");

        assert!(init_command(&path, false).is_err());
        assert!(init_command(&path, true).is_ok());
    }
}
