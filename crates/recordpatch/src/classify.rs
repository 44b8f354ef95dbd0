//! Line classification for hand-authored record documents.
//!
//! Classification is deliberately shallow: each line is labelled on its own,
//! without lookahead. [`classify_record`] layers the little bit of context a
//! record needs on top of that (the record's field column and block scalars).

use std::sync::LazyLock;

use regex::Regex;

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([a-zA-Z0-9_-]+):(?:\s|$)").unwrap());

/// The kind of a single source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// An empty or whitespace-only line.
    Blank,
    /// A full-line `#` comment.
    Comment,
    /// A `key:` line, carrying the key.
    Field(&'a str),
    /// A `-` sequence entry.
    ListItem,
    /// Anything else: continuation of a scalar or nested structure.
    Content,
}

impl LineKind<'_> {
    /// Returns true for blank and comment lines.
    pub fn is_trivia(&self) -> bool {
        matches!(self, LineKind::Blank | LineKind::Comment)
    }
}

/// Classify a single line.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    if trimmed.starts_with('#') {
        return LineKind::Comment;
    }

    // `---` is a document marker, not an entry.
    if trimmed.starts_with('-') && !trimmed.starts_with("---") {
        return LineKind::ListItem;
    }

    match FIELD.captures(line).and_then(|caps| caps.get(1)) {
        Some(key) => LineKind::Field(key.as_str()),
        None => LineKind::Content,
    }
}

/// Classify every line of `text`.
pub fn classify(text: &str) -> Vec<LineKind<'_>> {
    text.lines().map(classify_line).collect()
}

/// Returns the width of the line's leading whitespace.
pub fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Split a `- rest` sequence entry into the column `rest` starts at and `rest` itself.
pub(crate) fn strip_item_marker(line: &str) -> Option<(usize, &str)> {
    let rest = line.trim_start_matches([' ', '\t']).strip_prefix('-')?;
    let rest = rest.trim_start_matches([' ', '\t']);

    Some((line.len() - rest.len(), rest))
}

/// Returns the byte offset of a trailing `# comment` on the line, if any.
///
/// `#` only starts a comment outside of quotes and when preceded by whitespace.
/// A quote only opens a quoted scalar where one can start, so the apostrophe
/// in a plain `Bob's` is just text.
pub(crate) fn inline_comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    let opens_scalar =
        |idx: usize| idx == 0 || matches!(bytes[idx - 1], b' ' | b'\t' | b'[' | b'{' | b',');

    for (idx, &b) in bytes.iter().enumerate() {
        match b {
            b'\\' if in_double => {
                escaped = !escaped;
                continue;
            }
            b'"' if in_double && !escaped => in_double = false,
            b'"' if !in_single && !in_double && opens_scalar(idx) => in_double = true,
            b'\'' if in_single => in_single = false,
            b'\'' if !in_double && opens_scalar(idx) => in_single = true,
            b'#' if !in_single && !in_double => {
                if idx == 0 || matches!(bytes[idx - 1], b' ' | b'\t') {
                    return Some(idx);
                }
            }
            _ => {}
        }
        escaped = false;
    }

    None
}

/// Returns the column span of the inline value following `key:` on `line`.
///
/// `key_start` is the column the key starts at. Any trailing comment and
/// whitespace is excluded from the span.
pub(crate) fn value_span(
    line: &str,
    key_start: usize,
    key: &str,
) -> Option<std::ops::Range<usize>> {
    let after_colon = key_start + key.len() + 1;
    let rest = line.get(after_colon..)?;

    let start = after_colon + (rest.len() - rest.trim_start().len());
    let end = match inline_comment_start(&line[start..]) {
        Some(comment) => start + comment,
        None => line.len(),
    };
    let end = start + line[start..end].trim_end().len();

    (start < end).then_some(start..end)
}

/// Classify the lines of a single record.
///
/// On top of [`classify_line`], this:
///
/// * fixes the record's field column from its first structural line. A
///   collection entry like `  - id: 1` puts the column at `id` and is
///   reported as `Field("id")`;
/// * demotes `Field` lines at any other column to `Content`, since they
///   belong to a nested value;
/// * demotes everything nested inside a block scalar (`key: |`) to `Content`,
///   including `#` lines and interior blank lines.
///
/// Returns the kinds alongside the field column, if one was found.
pub fn classify_record<'a>(lines: &[&'a str]) -> (Vec<LineKind<'a>>, Option<usize>) {
    let mut kinds: Vec<LineKind<'a>> = Vec::with_capacity(lines.len());
    let mut column: Option<usize> = None;
    let mut in_block = false;
    let mut pending_blanks = vec![];

    for line in lines {
        let mut kind = classify_line(line);

        if kind == LineKind::Blank {
            if in_block {
                pending_blanks.push(kinds.len());
            }
            kinds.push(kind);
            continue;
        }

        let indent = indentation(line);

        match column {
            None => match kind {
                LineKind::ListItem => {
                    if let Some((key_column, rest)) = strip_item_marker(line) {
                        if let LineKind::Field(key) = classify_line(rest) {
                            column = Some(key_column);
                            kind = LineKind::Field(key);
                        }
                    }
                }
                LineKind::Field(_) => column = Some(indent),
                _ => {}
            },
            Some(column) => {
                if in_block && indent > column {
                    kind = LineKind::Content;
                    for idx in pending_blanks.drain(..) {
                        kinds[idx] = LineKind::Content;
                    }
                } else {
                    in_block = false;
                    pending_blanks.clear();

                    if matches!(kind, LineKind::Field(_)) && indent != column {
                        kind = LineKind::Content;
                    }
                }
            }
        }

        if let LineKind::Field(key) = kind {
            in_block = opens_block_scalar(line, key);
        }

        kinds.push(kind);
    }

    (kinds, column)
}

/// Returns true if the `key:` on this line introduces a `|` or `>` block scalar.
fn opens_block_scalar(line: &str, key: &str) -> bool {
    let Some(key_start) = key_column(line, key) else {
        return false;
    };

    value_span(line, key_start, key)
        .is_some_and(|span| matches!(line.as_bytes()[span.start], b'|' | b'>'))
}

/// Returns the column `key` starts at on a `key:` or `- key:` line.
pub(crate) fn key_column(line: &str, key: &str) -> Option<usize> {
    let column = match strip_item_marker(line) {
        Some((column, rest)) if rest.starts_with(key) => column,
        _ => indentation(line),
    };

    line[column..].starts_with(key).then_some(column)
}

/// A text split into lines, remembering how to put it back together.
#[derive(Clone, Debug)]
pub(crate) struct SourceLines<'a> {
    pub(crate) lines: Vec<&'a str>,
    eol: &'static str,
    trailing_newline: bool,
}

impl<'a> SourceLines<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            eol: if text.contains("\r\n") { "\r\n" } else { "\n" },
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Join `lines` with this source's line terminator.
    pub(crate) fn join<S: AsRef<str>>(&self, lines: &[S]) -> String {
        let mut out = String::new();
        for (idx, line) in lines.iter().enumerate() {
            if idx > 0 {
                out.push_str(self.eol);
            }
            out.push_str(line.as_ref());
        }

        if self.trailing_newline && !lines.is_empty() {
            out.push_str(self.eol);
        }

        out
    }

    /// Byte offsets of each line's start, plus the text's length.
    pub(crate) fn offsets(text: &str) -> Vec<usize> {
        let mut offsets = vec![0];
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            offset += line.len();
            offsets.push(offset);
        }

        // The last start is really the end of the text.
        offsets.pop();
        offsets.push(text.len());
        offsets
    }
}
