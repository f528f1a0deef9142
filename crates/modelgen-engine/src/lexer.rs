//! Lexical scan of Go source for comments and literals
//!
//! Rewrites are pattern based; this scan lets them skip matches that start
//! inside a comment, string, raw string or rune literal.

use std::ops::Range;

/// Byte ranges of comments and literals in a source text
#[derive(Debug, Clone, Default)]
pub struct LexicalMask {
    spans: Vec<Range<usize>>,
    unterminated: Option<usize>,
}

impl LexicalMask {
    pub fn scan(src: &str) -> Self {
        let bytes = src.as_bytes();
        let n = bytes.len();
        let mut spans = Vec::new();
        let mut unterminated = None;
        let mut i = 0;

        while i < n {
            let end = match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    Some(find_byte(bytes, i + 2, b'\n').unwrap_or(n))
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    match src[i + 2..].find("*/") {
                        Some(off) => Some(i + 2 + off + 2),
                        None => {
                            unterminated.get_or_insert(i);
                            Some(n)
                        }
                    }
                }
                b'`' => match find_byte(bytes, i + 1, b'`') {
                    Some(close) => Some(close + 1),
                    None => {
                        unterminated.get_or_insert(i);
                        Some(n)
                    }
                },
                quote @ (b'"' | b'\'') => match quoted_end(bytes, i + 1, quote) {
                    Some(close) => Some(close + 1),
                    None => {
                        unterminated.get_or_insert(i);
                        Some(find_byte(bytes, i + 1, b'\n').unwrap_or(n))
                    }
                },
                _ => None,
            };

            match end {
                Some(end) => {
                    spans.push(i..end);
                    i = end;
                }
                None => i += 1,
            }
        }

        Self { spans, unterminated }
    }

    /// Whether a byte offset lies inside a comment or literal
    pub fn is_masked(&self, pos: usize) -> bool {
        self.span_at(pos).is_some()
    }

    /// Span containing a byte offset
    pub fn span_at(&self, pos: usize) -> Option<&Range<usize>> {
        let idx = self.spans.partition_point(|span| span.end <= pos);
        self.spans.get(idx).filter(|span| span.start <= pos)
    }

    /// First occurrence of `needle` at or after `from` outside comments and literals
    pub fn find_unmasked(&self, src: &str, from: usize, needle: u8) -> Option<usize> {
        let bytes = src.as_bytes();
        let mut pos = from;
        while let Some(found) = find_byte(bytes, pos, needle) {
            match self.span_at(found) {
                Some(span) => pos = span.end,
                None => return Some(found),
            }
        }
        None
    }

    /// Offset of the first comment or literal that never closes
    pub fn unterminated(&self) -> Option<usize> {
        self.unterminated
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|&b| b == needle)
        .map(|off| from + off)
}

/// Closing quote of an interpreted string or rune; escapes are skipped and
/// a newline ends the literal unterminated.
fn quoted_end(bytes: &[u8], mut j: usize, quote: u8) -> Option<usize> {
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return None,
            b if b == quote => return Some(j),
            _ => j += 1,
        }
    }
    None
}
