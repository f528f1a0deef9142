//! Post-generation source rewrites
//!
//! Every rewrite is a pattern match filtered through [`LexicalMask`]: a match
//! that starts inside a comment or literal is left alone. Patterns that match
//! nothing are silent no-ops.

use std::path::Path;
use std::sync::LazyLock;

use modelgen_core::config::RewriteConfig;
use modelgen_core::Fingerprint;
use regex::{Captures, Regex};

use crate::format::{formatter_for, import_blocks, SourceFormatter};
use crate::lexer::LexicalMask;
use crate::output;

static TABLE_NAME_RECEIVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"func\s+\(\*\s*(\w+)\s*\)\s+TableName\(\)\s+string\s*\{")
        .expect("receiver pattern is valid")
});

static PACKAGE_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^package\s+\w+").expect("package pattern is valid"));

static STRUCT_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^type\s+(\w+)\s+struct\s*\{").expect("struct pattern is valid")
});

static SERIAL_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^// SerialVersion: ([0-9a-f]+)[ \t]*\n?").expect("trailer pattern is valid")
});

/// Result of rewriting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,

    /// False when the formatter failed and the text was kept unformatted
    pub formatted: bool,

    pub format_error: Option<String>,
}

/// Applies the configured rewrites to generated model text
pub struct SourceRewriter {
    import_paths: Vec<String>,
    base_entity: Option<String>,
    emit_fingerprint: bool,
    formatter: Box<dyn SourceFormatter>,
}

impl SourceRewriter {
    pub fn new(formatter: Box<dyn SourceFormatter>) -> Self {
        Self {
            import_paths: Vec::new(),
            base_entity: None,
            emit_fingerprint: false,
            formatter,
        }
    }

    pub fn from_config(config: &RewriteConfig) -> Self {
        let mut rewriter = Self::new(formatter_for(config.formatter, config.local_prefix.clone()))
            .with_import_paths(config.import_paths.clone())
            .with_fingerprint(config.emit_fingerprint);
        if let Some(base) = &config.base_entity {
            rewriter = rewriter.with_base_entity(base.clone());
        }
        rewriter
    }

    pub fn with_import_paths(mut self, paths: Vec<String>) -> Self {
        self.import_paths = paths;
        self
    }

    pub fn with_base_entity(mut self, base: impl Into<String>) -> Self {
        self.base_entity = Some(base.into());
        self
    }

    pub fn with_fingerprint(mut self, enabled: bool) -> Self {
        self.emit_fingerprint = enabled;
        self
    }

    pub fn formatter_name(&self) -> &'static str {
        self.formatter.name()
    }

    /// Rewrite one file's text
    ///
    /// `fingerprint` is only written when trailer emission is enabled.
    pub fn rewrite(
        &self,
        filename: &Path,
        text: &str,
        fingerprint: Option<&Fingerprint>,
    ) -> RewriteOutcome {
        let mut text = normalize_table_name_receiver(text);

        if !self.import_paths.is_empty() {
            text = add_import_paths(&text, &self.import_paths);
        }
        if let Some(base) = &self.base_entity {
            text = add_base_entity(&text, base);
        }

        let mut outcome = match self.formatter.format(filename, &text) {
            Ok(formatted) => RewriteOutcome {
                text: formatted,
                formatted: true,
                format_error: None,
            },
            Err(e) => {
                tracing::warn!(
                    file = %filename.display(),
                    formatter = self.formatter.name(),
                    error = %e,
                    "format failed, keeping unformatted source"
                );
                RewriteOutcome {
                    text,
                    formatted: false,
                    format_error: Some(e.to_string()),
                }
            }
        };

        if self.emit_fingerprint {
            if let Some(fp) = fingerprint {
                outcome.text = append_serial_version(&outcome.text, fp);
            }
        }

        outcome
    }

    /// Read a file, rewrite it and write the result back in place
    pub fn rewrite_file(
        &self,
        path: &Path,
        fingerprint: Option<&Fingerprint>,
    ) -> std::io::Result<RewriteOutcome> {
        let text = std::fs::read_to_string(path)?;
        let outcome = self.rewrite(path, &text, fingerprint);
        output::write_restricted(path, outcome.text.as_bytes())?;
        Ok(outcome)
    }
}

/// Replace every unmasked match of `re`
fn replace_outside_literals<F>(text: &str, re: &Regex, mut replace: F) -> String
where
    F: FnMut(&Captures<'_>) -> String,
{
    let mask = LexicalMask::scan(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if mask.is_masked(m.start()) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(&replace(&caps));
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}

/// `func (*T) TableName() string {` becomes `func (T) TableName() string {`
pub fn normalize_table_name_receiver(text: &str) -> String {
    replace_outside_literals(text, &TABLE_NAME_RECEIVER, |caps| {
        format!("func ({}) TableName() string {{", &caps[1])
    })
}

/// Add import paths to the first import block, or create one after the
/// package clause. Paths already present are not repeated.
pub fn add_import_paths<S: AsRef<str>>(text: &str, paths: &[S]) -> String {
    let mask = LexicalMask::scan(text);

    let block = import_blocks(text, &mask).into_iter().next();

    let missing: Vec<&str> = paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| {
            let quoted = format!("\"{}\"", p);
            block
                .as_ref()
                .map_or(true, |b| !text[b.body.clone()].contains(&quoted))
        })
        .collect();
    if missing.is_empty() {
        return text.to_string();
    }

    let added: String = missing.iter().map(|p| format!("\t\"{}\"\n", p)).collect();

    if let Some(block) = block {
        let mut head = text[block.whole.start..block.body.end].to_string();
        if !head.ends_with('\n') {
            head.push('\n');
        }
        return format!(
            "{}{}{}){}",
            &text[..block.whole.start],
            head,
            added,
            &text[block.whole.end..]
        );
    }

    let Some(pkg) = PACKAGE_CLAUSE
        .find_iter(text)
        .find(|m| !mask.is_masked(m.start()))
    else {
        return text.to_string();
    };

    format!(
        "{}\n\nimport (\n{}){}",
        &text[..pkg.end()],
        added,
        &text[pkg.end()..]
    )
}

/// Insert `base` as the first field of every struct definition
pub fn add_base_entity(text: &str, base: &str) -> String {
    replace_outside_literals(text, &STRUCT_DEF, |caps| {
        format!("type {} struct {{\n\t{}", &caps[1], base)
    })
}

/// Append the `SerialVersion` trailer, replacing any earlier one
pub fn append_serial_version(text: &str, fingerprint: &Fingerprint) -> String {
    let mut out = SERIAL_VERSION.replace_all(text, "").into_owned();
    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("\n// SerialVersion: {}\n", fingerprint));
    out
}

/// Fingerprint from the last `SerialVersion` trailer, if any
pub fn extract_serial_version(text: &str) -> Option<Fingerprint> {
    SERIAL_VERSION
        .captures_iter(text)
        .last()
        .and_then(|caps| Fingerprint::parse(&caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::NoopFormatter;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "package shopmodel

const TableNameUser = \"user\"

type User struct {
\tId int64
}

func (*User) TableName() string {
\treturn TableNameUser
}
";

    #[test]
    fn pointer_receiver_is_normalized() {
        let out = normalize_table_name_receiver(MODEL);
        assert!(out.contains("func (User) TableName() string {"));
        assert!(!out.contains("(*User)"));
    }

    #[test]
    fn receiver_whitespace_variants() {
        let out = normalize_table_name_receiver("func  (* Order )  TableName()  string{");
        assert_eq!(out, "func (Order) TableName() string {");
    }

    #[test]
    fn receiver_rewrite_scope() {
        let src = "\
func (User) TableName() string {
func (*User) String() string {
func (*User) TableNames() string {
";
        assert_eq!(normalize_table_name_receiver(src), src);
    }

    #[test]
    fn receiver_inside_comments_and_literals_untouched() {
        let src = "\
// func (*User) TableName() string {
/* func (*User) TableName() string { */
var s = \"func (*User) TableName() string {\"
var r = `func (*User) TableName() string {`
func (*User) TableName() string {
";
        let out = normalize_table_name_receiver(src);
        assert_eq!(out.matches("(*User)").count(), 4);
        assert!(out.ends_with("func (User) TableName() string {\n"));
    }

    #[test]
    fn imports_appended_to_existing_block() {
        let src = "package p\n\nimport (\n\t\"time\"\n)\n\nconst A = 1\n";
        let out = add_import_paths(src, &["example.com/datax"]);
        assert_eq!(
            out,
            "package p\n\nimport (\n\t\"time\"\n\t\"example.com/datax\"\n)\n\nconst A = 1\n"
        );
    }

    #[test]
    fn import_comment_parenthesis_keeps_block() {
        let src = "package p\n\nimport (\n\t\"time\" // clock (wall)\n\t\"fmt\"\n)\n";
        let out = add_import_paths(src, &["example.com/datax", "fmt"]);
        assert_eq!(
            out,
            "package p\n\nimport (\n\t\"time\" // clock (wall)\n\t\"fmt\"\n\t\"example.com/datax\"\n)\n"
        );
    }

    #[test]
    fn imports_synthesized_after_package() {
        let out = add_import_paths(MODEL, &["example.com/datax"]);
        assert!(out
            .starts_with("package shopmodel\n\nimport (\n\t\"example.com/datax\"\n)\n\nconst"));
    }

    #[test]
    fn existing_imports_not_repeated() {
        let src = "package p\n\nimport (\n\t\"time\"\n)\n";
        assert_eq!(add_import_paths(src, &["time"]), src);
    }

    #[test]
    fn base_entity_inserted_first() {
        let out = add_base_entity(MODEL, "datax.BaseEntity");
        assert!(out.contains("type User struct {\n\tdatax.BaseEntity\n\tId int64\n}"));
    }

    #[test]
    fn base_entity_skips_comments() {
        let src = "/*\ntype Old struct {\n*/\ntype New struct {\n}\n";
        let out = add_base_entity(src, "Base");
        assert_eq!(out, "/*\ntype Old struct {\n*/\ntype New struct {\n\tBase\n}\n");
    }

    #[test]
    fn trailer_roundtrip() {
        let fp = Fingerprint::parse("a1b2c3").unwrap();
        let out = append_serial_version(MODEL, &fp);
        assert!(out.ends_with("}\n\n// SerialVersion: a1b2c3\n"));
        assert_eq!(extract_serial_version(&out), Some(fp.clone()));

        let again = append_serial_version(&out, &fp);
        assert_eq!(again, out);
    }

    #[test]
    fn no_trailer_without_fingerprint() {
        assert_eq!(extract_serial_version(MODEL), None);
    }

    #[test]
    fn rewrite_runs_steps_in_order() {
        let rewriter = SourceRewriter::new(Box::new(NoopFormatter))
            .with_import_paths(vec!["example.com/datax".to_string()])
            .with_base_entity("datax.BaseEntity")
            .with_fingerprint(true);
        let fp = Fingerprint::parse("0f0f0f").unwrap();

        let out = rewriter.rewrite(Path::new("user.gen.go"), MODEL, Some(&fp));
        assert!(out.formatted);
        assert!(out.text.contains("import (\n\t\"example.com/datax\"\n)"));
        assert!(out.text.contains("\tdatax.BaseEntity\n"));
        assert!(out.text.contains("func (User) TableName() string {"));
        assert!(out.text.ends_with("// SerialVersion: 0f0f0f\n"));
    }

    #[test]
    fn fingerprint_trailer_off_by_default() {
        let rewriter = SourceRewriter::new(Box::new(NoopFormatter));
        let fp = Fingerprint::parse("0f0f0f").unwrap();
        let out = rewriter.rewrite(Path::new("user.gen.go"), MODEL, Some(&fp));
        assert!(!out.text.contains("SerialVersion"));
    }
}
