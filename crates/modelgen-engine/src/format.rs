//! Final formatting pass over rewritten model source

use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use modelgen_core::FormatterKind;
use regex::Regex;

use crate::lexer::LexicalMask;

static IMPORT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^import\s*\(").expect("import pattern is valid"));

static IMPORT_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:([\w.]+)\s+)?"([^"]+)"\s*(//.*)?$"#).expect("import line pattern is valid")
});

/// A parenthesized import block
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportBlock {
    /// `import (` through the closing `)`
    pub whole: Range<usize>,

    /// Text between the parentheses
    pub body: Range<usize>,
}

/// Import blocks outside comments and literals
///
/// A block closes at the first `)` that is not inside a comment or string, so
/// `// codec (fast)` on an import line does not end it early.
pub(crate) fn import_blocks(src: &str, mask: &LexicalMask) -> Vec<ImportBlock> {
    let mut blocks = Vec::new();
    let mut resume = 0;

    for open in IMPORT_OPEN.find_iter(src) {
        if open.start() < resume || mask.is_masked(open.start()) {
            continue;
        }
        let Some(close) = mask.find_unmasked(src, open.end(), b')') else {
            break;
        };
        blocks.push(ImportBlock {
            whole: open.start()..close + 1,
            body: open.end()..close,
        });
        resume = close + 1;
    }

    blocks
}

/// Errors from a formatting pass
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Unterminated comment or literal at byte {0}")]
    Unterminated(usize),

    #[error("Unbalanced '{delimiter}' on line {line}")]
    Unbalanced { delimiter: char, line: usize },

    #[error("Malformed import on line {line}: {text}")]
    MalformedImport { line: usize, text: String },

    #[error("Formatter not found: {0}")]
    ToolMissing(String),

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A formatter for Go source text
pub trait SourceFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Format `src`; `filename` is only used to resolve imports
    fn format(&self, filename: &Path, src: &str) -> Result<String, FormatError>;
}

/// Build the formatter selected in configuration
pub fn formatter_for(
    kind: FormatterKind,
    local_prefix: Option<String>,
) -> Box<dyn SourceFormatter> {
    match kind {
        FormatterKind::Builtin => Box::new(ImportFormatter::new(local_prefix)),
        FormatterKind::GoImports => Box::new(GoImportsFormatter::new(local_prefix)),
        FormatterKind::None => Box::new(NoopFormatter),
    }
}

/// Returns the text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFormatter;

impl SourceFormatter for NoopFormatter {
    fn name(&self) -> &'static str {
        "none"
    }

    fn format(&self, _filename: &Path, src: &str) -> Result<String, FormatError> {
        Ok(src.to_string())
    }
}

/// Import grouping and whitespace normalization without external tools
///
/// Import blocks are split into standard library, third-party and local
/// groups (paths under `local_prefix`), each sorted and deduplicated. Lines
/// are re-indented with tabs by bracket depth and stripped of trailing
/// whitespace; runs of blank lines collapse to one. Text inside comments and
/// literals that span lines is kept verbatim.
#[derive(Debug, Clone, Default)]
pub struct ImportFormatter {
    local_prefix: Option<String>,
}

impl ImportFormatter {
    pub fn new(local_prefix: Option<String>) -> Self {
        Self { local_prefix }
    }
}

impl SourceFormatter for ImportFormatter {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn format(&self, _filename: &Path, src: &str) -> Result<String, FormatError> {
        if let Some(pos) = LexicalMask::scan(src).unterminated() {
            return Err(FormatError::Unterminated(pos));
        }

        let grouped = self.group_imports(src)?;
        reindent(&grouped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ImportGroup {
    Std,
    ThirdParty,
    Local,
}

#[derive(Debug, Clone)]
struct ImportSpec {
    alias: Option<String>,
    path: String,
    comment: Option<String>,
    doc: Vec<String>,
}

impl ImportSpec {
    fn render(&self, out: &mut String) {
        for line in &self.doc {
            out.push('\t');
            out.push_str(line);
            out.push('\n');
        }
        out.push('\t');
        if let Some(alias) = &self.alias {
            out.push_str(alias);
            out.push(' ');
        }
        out.push('"');
        out.push_str(&self.path);
        out.push('"');
        if let Some(comment) = &self.comment {
            out.push(' ');
            out.push_str(comment);
        }
        out.push('\n');
    }
}

impl ImportFormatter {
    fn group_of(&self, path: &str) -> ImportGroup {
        if let Some(prefix) = self.local_prefix.as_deref().filter(|p| !p.is_empty()) {
            if path.starts_with(prefix) {
                return ImportGroup::Local;
            }
        }
        let first = path.split('/').next().unwrap_or(path);
        if first.contains('.') {
            ImportGroup::ThirdParty
        } else {
            ImportGroup::Std
        }
    }

    fn group_imports(&self, src: &str) -> Result<String, FormatError> {
        let mask = LexicalMask::scan(src);
        let mut out = String::with_capacity(src.len());
        let mut last = 0;

        for block in import_blocks(src, &mask) {
            let first_line = src[..block.body.start].matches('\n').count() + 1;
            out.push_str(&src[last..block.whole.start]);
            out.push_str(&self.render_block(&src[block.body], first_line)?);
            last = block.whole.end;
        }

        out.push_str(&src[last..]);
        Ok(out)
    }

    fn render_block(&self, body: &str, first_line: usize) -> Result<String, FormatError> {
        let mut specs: Vec<ImportSpec> = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for (offset, raw) in body.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with("//") {
                pending.push(line.to_string());
                continue;
            }

            let caps = IMPORT_SPEC
                .captures(line)
                .ok_or_else(|| FormatError::MalformedImport {
                    line: first_line + offset,
                    text: line.to_string(),
                })?;
            let spec = ImportSpec {
                alias: caps.get(1).map(|m| m.as_str().to_string()),
                path: caps[2].to_string(),
                comment: caps.get(3).map(|m| m.as_str().trim_end().to_string()),
                doc: std::mem::take(&mut pending),
            };

            let duplicate = specs
                .iter()
                .any(|s| s.path == spec.path && s.alias == spec.alias);
            if !duplicate {
                specs.push(spec);
            }
        }

        specs.sort_by(|a, b| {
            let left = (self.group_of(&a.path), &a.path, &a.alias);
            left.cmp(&(self.group_of(&b.path), &b.path, &b.alias))
        });

        let mut out = String::from("import (\n");
        let mut previous: Option<ImportGroup> = None;
        for spec in &specs {
            let group = self.group_of(&spec.path);
            if previous.is_some_and(|p| p != group) {
                out.push('\n');
            }
            spec.render(&mut out);
            previous = Some(group);
        }
        for line in pending {
            out.push('\t');
            out.push_str(&line);
            out.push('\n');
        }
        out.push(')');
        Ok(out)
    }
}

fn closing_for(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

/// Re-indent by bracket depth and normalize blank lines
fn reindent(src: &str) -> Result<String, FormatError> {
    let mask = LexicalMask::scan(src);
    let bytes = src.as_bytes();
    let mut stack: Vec<(u8, usize)> = Vec::new();
    let mut out = String::with_capacity(src.len());
    let mut offset = 0;
    let mut blank_run = true;

    for (idx, line) in src.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let start = offset;
        offset += line.len();
        let content = line.trim_end_matches(['\n', '\r']);
        let eol = start + content.len();

        let continues = mask.span_at(start).is_some_and(|span| span.start < start);
        let open_at_eol = mask.span_at(eol).is_some_and(|span| span.start < eol);

        if continues {
            out.push_str(content);
            out.push('\n');
            blank_run = false;
        } else {
            let trimmed = content.trim_start();
            let trimmed = if open_at_eol { trimmed } else { trimmed.trim_end() };

            if trimmed.is_empty() {
                if !blank_run {
                    out.push('\n');
                }
                blank_run = true;
            } else {
                let mut depth = stack.len();
                let dedent = trimmed.starts_with([')', '}', ']'])
                    || trimmed.starts_with("case ")
                    || trimmed.starts_with("default:");
                if dedent {
                    depth = depth.saturating_sub(1);
                }
                for _ in 0..depth {
                    out.push('\t');
                }
                out.push_str(trimmed);
                out.push('\n');
                blank_run = false;
            }
        }

        for (pos, &b) in bytes.iter().enumerate().take(eol).skip(start) {
            if mask.is_masked(pos) {
                continue;
            }
            match b {
                b'(' | b'[' | b'{' => stack.push((b, line_no)),
                b')' | b']' | b'}' => match stack.pop() {
                    Some((open, _)) if closing_for(open) == b => {}
                    _ => {
                        return Err(FormatError::Unbalanced {
                            delimiter: b as char,
                            line: line_no,
                        })
                    }
                },
                _ => {}
            }
        }
    }

    if let Some(&(open, line)) = stack.last() {
        return Err(FormatError::Unbalanced {
            delimiter: open as char,
            line,
        });
    }

    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Runs `goimports` over stdin
#[derive(Debug, Clone)]
pub struct GoImportsFormatter {
    program: PathBuf,
    local_prefix: Option<String>,
}

impl GoImportsFormatter {
    pub fn new(local_prefix: Option<String>) -> Self {
        Self {
            program: PathBuf::from("goimports"),
            local_prefix,
        }
    }

    /// Use a specific binary instead of `goimports` from `PATH`
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn tool_failed(&self, message: impl Into<String>) -> FormatError {
        FormatError::ToolFailed {
            tool: self.program.display().to_string(),
            message: message.into(),
        }
    }
}

impl SourceFormatter for GoImportsFormatter {
    fn name(&self) -> &'static str {
        "goimports"
    }

    fn format(&self, filename: &Path, src: &str) -> Result<String, FormatError> {
        let mut cmd = Command::new(&self.program);
        if let Some(prefix) = self.local_prefix.as_deref().filter(|p| !p.is_empty()) {
            cmd.arg("-local").arg(prefix);
        }
        if let Some(dir) = filename.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.arg("-srcdir").arg(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                FormatError::ToolMissing(self.program.display().to_string())
            }
            _ => FormatError::Io(e),
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.tool_failed("stdin not captured"))?;
        let input = src.as_bytes().to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| self.tool_failed("stdin writer panicked"))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.tool_failed(stderr.trim()));
        }

        String::from_utf8(output.stdout).map_err(|e| self.tool_failed(e.to_string()))
    }
}
