//! Locating the fields of a single record.

use std::ops::Range;

use crate::{
    Error,
    classify::{
        LineKind, SourceLines, classify_line, classify_record, indentation, key_column,
        value_span,
    },
    comments::{CommentMap, associate_comments},
};

/// Where a field sits in a record's text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRange {
    /// The (record-relative) line of the field's `key:`.
    pub start: usize,
    /// One past the field's last value line.
    ///
    /// Blank and comment lines after the value aren't included: they
    /// belong to whatever follows.
    pub end: usize,
    /// The column span of an inline value on `start`, if there is one.
    pub value: Option<Range<usize>>,
}

/// How the items of a block list are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListFormat {
    /// The column of the `-`.
    pub indent: usize,
    /// Whether the `-` is followed by a space (`- x` vs `-x`).
    pub space_after_dash: bool,
}

impl ListFormat {
    /// The text preceding an item's content.
    pub fn marker(&self) -> String {
        let space = if self.space_after_dash { " " } else { "" };
        format!("{}-{space}", " ".repeat(self.indent))
    }

    /// The column an item's content starts at.
    pub fn content_column(&self) -> usize {
        self.indent + 1 + usize::from(self.space_after_dash)
    }
}

/// How a block scalar (`key: |`) is laid out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockFormat {
    /// The block header, e.g. `|`, `|-` or `>+`.
    pub header: String,
    /// The column of the first content line, if the block has content.
    pub content_indent: Option<usize>,
}

/// A single top-level field of a record.
#[derive(Clone, Debug)]
pub struct FieldLayout {
    pub name: String,
    pub range: FieldRange,
    /// The first line of the comments and blank lines leading up to the field.
    pub comment_start: usize,
    /// The text preceding the key on the field's line.
    ///
    /// This is the indentation, except on a collection entry's identity
    /// line, where it also includes the `-`.
    pub prefix: String,
    pub list: Option<ListFormat>,
    pub block: Option<BlockFormat>,
}

/// The structure of a single record's text.
#[derive(Clone, Debug)]
pub struct RecordLayout<'a> {
    source: SourceLines<'a>,
    field_indent: usize,
    fields: Vec<FieldLayout>,
    comments: CommentMap,
}

impl<'a> RecordLayout<'a> {
    /// Analyze a record's text.
    ///
    /// The text is either a bare record or a single collection entry
    /// starting with its `- id:` line.
    pub fn analyze(text: &'a str) -> Result<Self, Error> {
        let source = SourceLines::new(text);
        let (kinds, column) = classify_record(&source.lines);

        let Some(field_indent) = column else {
            return Err(Error::InvalidOperation("record has no fields".into()));
        };

        let mut fields = vec![];
        let mut open: Option<FieldLayout> = None;
        let mut last_value = 0;
        let mut gap_start = 0;

        for (idx, kind) in kinds.iter().enumerate() {
            match kind {
                LineKind::Field(name) => {
                    if let Some(field) = open.take() {
                        fields.push(close_field(field, last_value + 1, &source.lines, &kinds));
                    }

                    let line = source.lines[idx];
                    let key_start = key_column(line, name).unwrap_or(field_indent);

                    open = Some(FieldLayout {
                        name: name.to_string(),
                        range: FieldRange {
                            start: idx,
                            end: idx + 1,
                            value: value_span(line, key_start, name),
                        },
                        comment_start: gap_start,
                        prefix: line[..key_start].to_string(),
                        list: None,
                        block: None,
                    });
                    last_value = idx;
                    gap_start = idx + 1;
                }
                LineKind::Blank | LineKind::Comment => {}
                LineKind::ListItem | LineKind::Content => {
                    last_value = idx;
                    gap_start = idx + 1;
                }
            }
        }

        if let Some(field) = open.take() {
            fields.push(close_field(field, last_value + 1, &source.lines, &kinds));
        }

        let comments = associate_comments(&source.lines, &kinds);

        Ok(Self {
            source,
            field_indent,
            fields,
            comments,
        })
    }

    /// The record's lines, without terminators.
    pub fn lines(&self) -> &[&'a str] {
        &self.source.lines
    }

    /// The column the record's fields start at.
    pub fn field_indent(&self) -> usize {
        self.field_indent
    }

    /// The record's fields, in their original order.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Returns the field with the given name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The record's field comments.
    pub fn comments(&self) -> &CommentMap {
        &self.comments
    }

    /// One past the last line preceding the first field and its comments.
    pub fn leading_end(&self) -> usize {
        self.fields.first().map_or(0, |f| f.comment_start)
    }

    /// The first line after the last field.
    pub fn trailing_start(&self) -> usize {
        self.fields.last().map_or(0, |f| f.range.end)
    }

    /// The field's inline value text, if any.
    pub fn value_text(&self, field: &FieldLayout) -> Option<&'a str> {
        let span = field.range.value.clone()?;
        self.source.lines[field.range.start].get(span)
    }

    /// Parse the field's current value out of the original text.
    ///
    /// Returns `None` if the field's text doesn't parse on its own.
    pub fn original_value(&self, field: &FieldLayout) -> Option<serde_yaml::Value> {
        let mut text = String::new();

        for (offset, line) in self.source.lines[field.range.start..field.range.end]
            .iter()
            .enumerate()
        {
            if offset == 0 {
                // Blank out the `-` of an identity line, keeping columns intact.
                text.push_str(&" ".repeat(field.prefix.len()));
                text.push_str(&line[field.prefix.len()..]);
            } else {
                text.push_str(line);
            }
            text.push('\n');
        }

        let mapping: serde_yaml::Mapping = serde_yaml::from_str(&text).ok()?;
        mapping.get(field.name.as_str()).cloned()
    }

    /// Join patched lines back together, the way the original text was.
    pub(crate) fn join<S: AsRef<str>>(&self, lines: &[S]) -> String {
        self.source.join(lines)
    }
}

fn close_field(
    mut field: FieldLayout,
    end: usize,
    lines: &[&str],
    kinds: &[LineKind<'_>],
) -> FieldLayout {
    field.range.end = end;

    let body = field.range.start + 1..end;

    field.list = body
        .clone()
        .find(|idx| kinds[*idx] == LineKind::ListItem)
        .map(|idx| {
            let line = lines[idx];
            let after_dash = &line.trim_start()[1..];
            ListFormat {
                indent: indentation(line),
                space_after_dash: after_dash.is_empty() || after_dash.starts_with([' ', '\t']),
            }
        });

    let value = field
        .range
        .value
        .clone()
        .map(|span| &lines[field.range.start][span]);

    field.block = value
        .filter(|value| value.starts_with(['|', '>']))
        .map(|value| BlockFormat {
            header: value.split_whitespace().next().unwrap_or(value).to_string(),
            content_indent: body
                .clone()
                .find(|idx| classify_line(lines[*idx]) != LineKind::Blank)
                .map(|idx| indentation(lines[idx])),
        });

    field
}
