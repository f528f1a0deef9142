//! Model file emitter

use minijinja::{context, Environment};
use modelgen_core::type_map;
use modelgen_core::Field;
use serde::Serialize;

/// Name written into the generated-code header
pub const GENERATOR_NAME: &str = "modelgen";

const MODEL_TEMPLATE_NAME: &str = "model.go";
const MODEL_TEMPLATE: &str = include_str!("../templates/model.go.j2");

/// Error while rendering a model file
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template error for table {table}: {message}")]
    Template { table: String, message: String },
}

/// Everything needed to render one table
#[derive(Debug, Clone)]
pub struct ModelSpec<'a> {
    /// Go package name
    pub package: &'a str,

    /// Source table name
    pub table: &'a str,

    /// Model (struct) name
    pub model: &'a str,

    /// Fields in emission order; ignored fields are skipped
    pub fields: &'a [Field],
}

#[derive(Debug, Serialize)]
struct FieldView {
    decl: String,
}

/// Renders model files from a fixed template
pub struct ModelEmitter {
    env: Environment<'static>,
}

impl ModelEmitter {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        Self { env }
    }

    /// Render one model file
    pub fn render(&self, spec: &ModelSpec<'_>) -> Result<String, RenderError> {
        let fields: Vec<&Field> = spec.fields.iter().filter(|f| !f.ignored).collect();

        let mut imports = Vec::new();
        if fields.iter().any(|f| type_map::needs_time_import(&f.go_type)) {
            imports.push("time");
        }

        let name_width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
        let type_width = fields.iter().map(|f| f.go_type.len()).max().unwrap_or(0);
        let views: Vec<FieldView> = fields
            .iter()
            .map(|f| FieldView {
                decl: field_decl(f, name_width, type_width),
            })
            .collect();

        self.env
            .render_named_str(MODEL_TEMPLATE_NAME, MODEL_TEMPLATE, context! {
                generator => GENERATOR_NAME,
                package => spec.package,
                table => spec.table,
                model => spec.model,
                imports => imports,
                fields => views,
            })
            .map_err(|e| template_error(spec.table, e))
    }
}

impl Default for ModelEmitter {
    fn default() -> Self {
        Self::new()
    }
}

fn template_error(table: &str, error: minijinja::Error) -> RenderError {
    RenderError::Template {
        table: table.to_string(),
        message: error.to_string(),
    }
}

/// `Name Type `tags` // comment`, with name and type padded to column widths
fn field_decl(field: &Field, name_width: usize, type_width: usize) -> String {
    let tags = field.tags.as_ref().filter(|t| !t.is_empty());

    let mut decl = match tags {
        Some(tags) => format!(
            "{:<nw$} {:<tw$} `{}`",
            field.name,
            field.go_type,
            tags,
            nw = name_width,
            tw = type_width
        ),
        None => format!("{:<nw$} {}", field.name, field.go_type, nw = name_width),
    };

    let comment = single_line(&field.column_comment);
    if !comment.is_empty() {
        decl.push_str(" // ");
        decl.push_str(&comment);
    }

    decl.trim_end().to_string()
}

fn single_line(comment: &str) -> String {
    comment.split_whitespace().collect::<Vec<_>>().join(" ")
}
