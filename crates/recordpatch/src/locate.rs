//! Finding a record's text inside a document.

use line_index::{LineIndex, TextSize};
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::{
    Error,
    classify::{SourceLines, classify_line, indentation},
    options::PatchOptions,
};

static EMPTY_COLLECTION: Vec<Value> = Vec::new();

/// The shape of a record document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// The whole document is a single record.
    Bare,
    /// The document holds a list of records under the collection key.
    Collection,
}

/// The byte span of a single record inside its document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSpan {
    /// Byte offset of the record's first line.
    pub start: usize,
    /// Byte offset one past the record's last line, including its terminator.
    pub end: usize,
    /// The indentation preceding the entry's `-`, for collection entries.
    pub indent: String,
    pub kind: DocumentKind,
}

/// Parse `document`, which must be a mapping at the top level.
pub(crate) fn parse_document(document: &str) -> Result<Mapping, Error> {
    match serde_yaml::from_str::<Value>(document).map_err(Error::Syntax)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::InvalidCollection(
            "document is not a mapping".into(),
        )),
    }
}

/// Returns the document's record list, if it has one.
pub(crate) fn collection<'a>(
    mapping: &'a Mapping,
    options: &PatchOptions,
) -> Result<Option<&'a Vec<Value>>, Error> {
    match mapping.get(options.collection_key.as_str()) {
        None => Ok(None),
        Some(Value::Sequence(records)) => Ok(Some(records)),
        // `challenges:` with nothing after it.
        Some(Value::Null) => Ok(Some(&EMPTY_COLLECTION)),
        Some(_) => Err(Error::InvalidCollection(format!(
            "`{}` is not a list",
            options.collection_key
        ))),
    }
}

/// Returns the integer `id` of a parsed record.
pub(crate) fn mapping_id(record: &Mapping) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Determine whether `document` is a bare record or a collection.
pub fn document_kind(document: &str, options: &PatchOptions) -> Result<DocumentKind, Error> {
    let mapping = parse_document(document)?;

    Ok(match collection(&mapping, options)? {
        Some(_) => DocumentKind::Collection,
        None => DocumentKind::Bare,
    })
}

/// Find the record with the given `id` in `document`.
///
/// The document is parsed first, so that syntax errors and malformed
/// collections are reported before any text is touched.
pub fn locate_record(document: &str, id: i64, options: &PatchOptions) -> Result<RecordSpan, Error> {
    let mapping = parse_document(document)?;

    match collection(&mapping, options)? {
        Some(records) => locate_entry(document, id, records, options),
        None => locate_bare(document, id, &mapping),
    }
}

fn locate_entry(
    document: &str,
    id: i64,
    records: &[Value],
    options: &PatchOptions,
) -> Result<RecordSpan, Error> {
    let lines = document.lines().collect::<Vec<_>>();
    let offsets = SourceLines::offsets(document);

    let key = &options.collection_key;
    let header = lines
        .iter()
        .position(|line| {
            line.strip_prefix(key.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
        })
        .ok_or_else(|| Error::InvalidCollection(format!("`{key}` is not a block mapping key")))?;

    let entry = Regex::new(&format!(
        r"(?m)^([ \t]*)-[ \t]+id:[ \t]*{}\b",
        regex::escape(&id.to_string())
    ))
    .map_err(|e| Error::InvalidOperation(e.to_string()))?;

    let body = header + 1;

    // Entries sit at the column of the first item under the key. Deeper
    // `- id:` lines belong to lists nested inside a record.
    let column = lines[body..]
        .iter()
        .find(|line| !classify_line(line).is_trivia())
        .map(|line| indentation(line));

    // The collection ends at the next top-level key.
    let scope_end = lines
        .iter()
        .enumerate()
        .skip(body)
        .find(|(_, line)| {
            !classify_line(line).is_trivia() && indentation(line) == 0 && !line.starts_with('-')
        })
        .map_or(document.len(), |(idx, _)| offsets[idx]);

    let found = entry
        .captures_iter(&document[..scope_end])
        .filter(|caps| caps.get(0).is_some_and(|m| m.start() >= offsets[body]))
        .find(|caps| caps.get(1).map(|indent| indent.as_str().len()) == column);

    let Some(caps) = found else {
        return if records
            .iter()
            .filter_map(Value::as_mapping)
            .any(|record| mapping_id(record) == Some(id))
        {
            Err(Error::InvalidCollection(format!(
                "record {id} isn't introduced by a `- id:` line"
            )))
        } else {
            Err(Error::RecordNotFound { id })
        };
    };

    let (Some(whole), Some(indent)) = (caps.get(0), caps.get(1)) else {
        return Err(Error::RecordNotFound { id });
    };

    let index = LineIndex::new(document);
    let start_line = index.line_col(TextSize::new(whole.start() as u32)).line as usize;
    let indent = indent.as_str();

    // The entry runs until the next line that isn't nested under its `-`.
    let end_line = lines
        .iter()
        .enumerate()
        .skip(start_line + 1)
        .find(|(_, line)| !classify_line(line).is_trivia() && indentation(line) <= indent.len())
        .map_or(lines.len(), |(idx, _)| idx);

    Ok(RecordSpan {
        start: offsets[start_line],
        end: offsets[end_line],
        indent: indent.to_string(),
        kind: DocumentKind::Collection,
    })
}

fn locate_bare(document: &str, id: i64, mapping: &Mapping) -> Result<RecordSpan, Error> {
    if mapping_id(mapping) != Some(id) {
        return Err(Error::RecordNotFound { id });
    }

    let offsets = SourceLines::offsets(document);
    let first = document
        .lines()
        .position(|line| !classify_line(line).is_trivia() && line.trim() != "---")
        .unwrap_or(0);

    Ok(RecordSpan {
        start: offsets[first],
        end: document.len(),
        indent: String::new(),
        kind: DocumentKind::Bare,
    })
}
