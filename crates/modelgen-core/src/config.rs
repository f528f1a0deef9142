//! Configuration schema (modelgen.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::naming::AliasMap;

/// Output directory that selects the `<db>model` package layout
pub const DEFAULT_OUT_DIR: &str = "./";

/// Which formatter runs as the last rewrite step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    /// Built-in import grouping and whitespace normalization
    #[default]
    Builtin,

    /// External `goimports` binary
    GoImports,

    /// Leave rewritten text as is
    None,
}

/// What happens when a generated file cannot be rewritten
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteErrorPolicy {
    /// Abort the whole run
    #[default]
    Abort,

    /// Warn and continue with the next table
    Skip,
}

/// Post-generation rewrite settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Import path prefix grouped last as "local" imports
    #[serde(default)]
    pub local_prefix: Option<String>,

    /// Extra import paths injected into every model file
    #[serde(default)]
    pub import_paths: Vec<String>,

    /// Embedded base type inserted as the first field of every struct
    #[serde(default)]
    pub base_entity: Option<String>,

    /// Append the `SerialVersion` fingerprint trailer
    #[serde(default)]
    pub emit_fingerprint: bool,

    /// Formatter used for the final pass
    #[serde(default)]
    pub formatter: FormatterKind,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            local_prefix: None,
            import_paths: Vec::new(),
            base_entity: None,
            emit_fingerprint: false,
            formatter: FormatterKind::Builtin,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database connection string
    #[serde(default)]
    pub dsn: Option<String>,

    /// Tables to generate (all tables when empty)
    #[serde(default)]
    pub tables: Vec<String>,

    /// Output directory
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// File suffix after `<table>.`
    #[serde(default = "default_generated_suffix")]
    pub generated_suffix: String,

    /// Table -> model name overrides
    #[serde(default)]
    pub aliases: AliasMap,

    /// Column name -> forced Go type
    #[serde(default = "default_type_overrides")]
    pub type_overrides: HashMap<String, String>,

    /// Database name prefixes removed before deriving the package name
    #[serde(default = "default_strip_db_prefixes")]
    pub strip_db_prefixes: Vec<String>,

    /// Post-generation rewrites
    #[serde(default)]
    pub rewrite: RewriteConfig,

    /// Behaviour on per-file rewrite failures
    #[serde(default)]
    pub on_write_error: WriteErrorPolicy,

    /// Directory relative paths are resolved against: the config file's
    /// directory, or empty (the working directory) for in-memory configs
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

fn default_generated_suffix() -> String {
    "gen.go".to_string()
}

fn default_type_overrides() -> HashMap<String, String> {
    HashMap::from([("deleted".to_string(), "bool".to_string())])
}

fn default_strip_db_prefixes() -> Vec<String> {
    vec!["dev_".to_string(), "test_".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsn: None,
            tables: Vec::new(),
            out_dir: default_out_dir(),
            generated_suffix: default_generated_suffix(),
            aliases: AliasMap::default(),
            type_overrides: default_type_overrides(),
            strip_db_prefixes: default_strip_db_prefixes(),
            rewrite: RewriteConfig::default(),
            on_write_error: WriteErrorPolicy::default(),
            project_root: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Whether `out_dir` is the default, which selects the `<db>model` layout
    pub fn uses_default_out_dir(&self) -> bool {
        self.out_dir == Path::new(DEFAULT_OUT_DIR)
    }

    /// `out_dir` with a relative path resolved against `project_root`
    pub fn out_dir_path(&self) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            self.project_root.join(&self.out_dir)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
