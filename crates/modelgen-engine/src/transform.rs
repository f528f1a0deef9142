//! Per-field transformation rules

use std::collections::HashMap;

use modelgen_core::marker::{self, I18N};
use modelgen_core::naming::{to_lower_camel, to_studly};
use modelgen_core::{Config, Field, TableFieldRegistry};

/// Applies the naming, tag, type-override and i18n rules to fields
#[derive(Debug, Clone, Default)]
pub struct FieldTransformer {
    type_overrides: HashMap<String, String>,
}

impl FieldTransformer {
    pub fn new(type_overrides: HashMap<String, String>) -> Self {
        Self { type_overrides }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.type_overrides.clone())
    }

    /// Transform one field and record it under `table`
    ///
    /// Rules run in a fixed order: studly name, `json` tag, type override,
    /// `i18n` tag. Tag rules are skipped when the field has no tag set.
    pub fn transform(
        &self,
        table: &str,
        mut field: Field,
        registry: &mut TableFieldRegistry,
    ) -> Field {
        field.name = to_studly(&field.column_name);

        if let Some(tags) = field.tags.as_mut() {
            tags.set("json", to_lower_camel(&field.column_name));
        }

        if let Some(go_type) = self.type_overrides.get(&field.column_name) {
            field.go_type = go_type.clone();
        }

        if marker::has_marker(&field.column_comment, I18N) {
            if let Some(tags) = field.tags.as_mut() {
                tags.set("i18n", field.column_name.clone());
            }
        }

        registry.register(table, field.clone());
        field
    }
}
