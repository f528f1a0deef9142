//! Naming convention and table aliases

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `snake_case` -> `StudlyCaps` (`user_profile` -> `UserProfile`)
pub fn to_studly(s: &str) -> String {
    camel_case(s, true)
}

/// `snake_case` -> `lowerCamel` (`create_time` -> `createTime`)
pub fn to_lower_camel(s: &str) -> String {
    camel_case(s, false)
}

/// `_`, `-`, space and `.` separate words; a letter after a digit starts a new
/// word; interior runs of capitals are folded (`user_ID` -> `UserId`).
/// Characters that are neither ASCII letters, digits nor separators are dropped.
fn camel_case(s: &str, init_upper: bool) -> String {
    let s = s.trim();
    let mut out = String::with_capacity(s.len());
    let mut cap_next = init_upper;
    let mut prev_is_cap = false;

    for (i, c) in s.chars().enumerate() {
        let is_cap = c.is_ascii_uppercase();
        let is_low = c.is_ascii_lowercase();

        let c = if cap_next {
            c.to_ascii_uppercase()
        } else if i == 0 || (prev_is_cap && is_cap) {
            c.to_ascii_lowercase()
        } else {
            c
        };
        prev_is_cap = is_cap;

        if is_cap || is_low {
            out.push(c);
            cap_next = false;
        } else if c.is_ascii_digit() {
            out.push(c);
            cap_next = true;
        } else {
            cap_next = matches!(c, '_' | ' ' | '-' | '.');
        }
    }

    out
}

/// Case-insensitive table name -> explicit model name
///
/// Deserialized keys pass through [`AliasMap::insert`], so a config entry
/// `User = "Account"` is found for table `user`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct AliasMap {
    aliases: HashMap<String, String>,
}

impl From<HashMap<String, String>> for AliasMap {
    fn from(raw: HashMap<String, String>) -> Self {
        let mut map = Self::new();
        for (table, alias) in &raw {
            map.insert(table, alias);
        }
        map
    }
}

impl From<AliasMap> for HashMap<String, String> {
    fn from(map: AliasMap) -> Self {
        map.aliases
    }
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `table=Model` pairs. Pairs without `=` are skipped with a warning.
    pub fn parse<S: AsRef<str>>(pairs: &[S]) -> Self {
        let mut map = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((table, alias)) => map.insert(table, alias),
                None => tracing::warn!(pair, "ignoring malformed alias, expected table=Model"),
            }
        }
        map
    }

    /// Add or replace an alias; the table key is lower-cased
    pub fn insert(&mut self, table: &str, alias: &str) {
        self.aliases.insert(table.to_lowercase(), alias.to_string());
    }

    /// Alias for a table, looked up case-insensitively
    pub fn resolve(&self, table: &str) -> Option<&str> {
        self.aliases.get(&table.to_lowercase()).map(String::as_str)
    }

    /// Merge another map; entries in `other` win
    pub fn merge(&mut self, other: &AliasMap) {
        for (table, alias) in &other.aliases {
            self.aliases.insert(table.clone(), alias.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Maps table names to model identifiers
#[derive(Debug, Clone, Default)]
pub struct NamingStrategy {
    aliases: AliasMap,
}

impl NamingStrategy {
    pub fn new(aliases: AliasMap) -> Self {
        Self { aliases }
    }

    /// Default identifier for a table, ignoring aliases
    pub fn schema_name(&self, table: &str) -> String {
        to_studly(table)
    }

    /// Model name for a table: alias if configured, otherwise the convention
    pub fn model_name(&self, table: &str) -> String {
        match self.aliases.resolve(table) {
            Some(alias) => alias.to_string(),
            None => self.schema_name(table),
        }
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }
}
