//! Whole-document operations on records.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::{
    Error, FieldMap,
    classify::{SourceLines, classify_line, indentation, value_span},
    format::format_scalar,
    generate::record_mapping,
    locate::{collection, locate_record, mapping_id, parse_document},
    options::PatchOptions,
    patch::patch_record,
    ranges::RecordLayout,
};

static ENTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([ \t]*)-[ \t]+id:").unwrap());

/// Patch the record with the given `id` inside `document`.
///
/// Returns the whole document, with everything outside of the record
/// untouched. Nothing is returned on failure.
pub fn update_record_in_collection(
    document: &str,
    id: i64,
    new_values: &FieldMap,
    options: &PatchOptions,
) -> Result<String, Error> {
    let span = locate_record(document, id, options)?;
    tracing::debug!(
        "record {id} spans bytes {}..{} ({:?})",
        span.start,
        span.end,
        span.kind
    );

    let layout = RecordLayout::analyze(&document[span.start..span.end])?;
    let patched = patch_record(&layout, new_values, options)?;

    let mut out = String::with_capacity(document.len() + patched.len());
    out.push_str(&document[..span.start]);
    out.push_str(&patched);
    out.push_str(&document[span.end..]);

    Ok(out)
}

/// Read the record with the given `id` from `document`.
pub fn read_record(document: &str, id: i64, options: &PatchOptions) -> Result<FieldMap, Error> {
    let mapping = parse_document(document)?;

    let record = match collection(&mapping, options)? {
        Some(records) => records
            .iter()
            .filter_map(Value::as_mapping)
            .find(|record| mapping_id(record) == Some(id))
            .ok_or(Error::RecordNotFound { id })?,
        None if mapping_id(&mapping) == Some(id) => &mapping,
        None => return Err(Error::RecordNotFound { id }),
    };

    to_field_map(record)
}

fn to_field_map(record: &Mapping) -> Result<FieldMap, Error> {
    record
        .iter()
        .map(|(key, value)| {
            let key = match key {
                Value::String(key) => key.clone(),
                other => format_scalar(other)?,
            };
            Ok((key, value.clone()))
        })
        .collect()
}

/// Append a new record, generated from `values`, to the collection in `document`.
///
/// The new entry follows the indentation of the existing entries. An inline
/// empty collection (`challenges: []`) is rewritten as a block list.
pub fn append_record(
    document: &str,
    values: &FieldMap,
    now: DateTime<Utc>,
    options: &PatchOptions,
) -> Result<String, Error> {
    let mapping = parse_document(document)?;
    let key = &options.collection_key;

    let Some(records) = collection(&mapping, options)? else {
        return Err(Error::InvalidCollection(format!(
            "document has no `{key}` list"
        )));
    };

    let source = SourceLines::new(document);
    let lines = &source.lines;

    let header = lines
        .iter()
        .position(|line| {
            line.strip_prefix(key.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
        })
        .ok_or_else(|| Error::InvalidCollection(format!("`{key}` is not a block mapping key")))?;

    let inline = value_span(lines[header], 0, key).map(|span| &lines[header][span]);
    if inline.is_some() && !records.is_empty() {
        return Err(Error::InvalidCollection(format!(
            "can't append to a flow-style `{key}` list"
        )));
    }

    let indent = lines[header + 1..]
        .iter()
        .find_map(|line| ENTRY.captures(line))
        .and_then(|caps| caps.get(1))
        .map_or_else(|| " ".repeat(options.list_indent), |indent| indent.as_str().to_string());

    let record = serde_yaml::to_string(&Value::Mapping(record_mapping(values, now, options)))?;
    let entry = record.lines().enumerate().map(|(idx, line)| match idx {
        0 => format!("{indent}- {line}"),
        _ if line.is_empty() => String::new(),
        _ => format!("{indent}  {line}"),
    });

    let mut out: Vec<String> = vec![];

    if inline.is_some() {
        // `challenges: []` becomes `challenges:` followed by the new entry.
        out.extend(lines[..header].iter().map(|line| line.to_string()));
        out.push(format!("{key}:"));
        out.extend(entry);
        out.extend(lines[header + 1..].iter().map(|line| line.to_string()));
    } else {
        let end = collection_end(lines, header);
        out.extend(lines[..end].iter().map(|line| line.to_string()));
        out.extend(entry);
        out.extend(lines[end..].iter().map(|line| line.to_string()));
    }

    Ok(source.join(&out))
}

/// Returns the line after the last line of the list introduced on `header`.
///
/// Trailing blank and comment lines are left outside of the list.
fn collection_end(lines: &[&str], header: usize) -> usize {
    let mut end = header + 1;

    for (idx, line) in lines.iter().enumerate().skip(header + 1) {
        if classify_line(line).is_trivia() {
            continue;
        }

        // Entries may sit at column 0, under their key.
        if indentation(line) == 0 && !line.starts_with('-') {
            break;
        }

        end = idx + 1;
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(yaml: &str) -> FieldMap {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-02T03:04:05.678Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn reads_records() {
        let document = "challenges:\n  - id: 1\n    name: one\n  - id: 2\n    name: two\n";
        let options = PatchOptions::default();

        assert_eq!(
            read_record(document, 2, &options).unwrap(),
            values("{id: 2, name: two}")
        );
        assert!(matches!(
            read_record(document, 3, &options),
            Err(Error::RecordNotFound { id: 3 })
        ));
        assert_eq!(
            read_record("id: 5\nname: x\n", 5, &options).unwrap(),
            values("{id: 5, name: x}")
        );
    }

    #[test]
    fn appends_after_last_entry() {
        let document = "# header
challenges:
    - id: 1
      name: one

# footer
";

        let appended = append_record(
            document,
            &values("{id: 2, name: two, create-time: '2025-01-01T00:00:00.000Z'}"),
            now(),
            &PatchOptions::default(),
        )
        .unwrap();

        // Timestamps are covered by the generator's tests.
        let layout = appended
            .lines()
            .filter(|line| !line.contains("-time:"))
            .collect::<Vec<_>>();
        assert_eq!(
            layout,
            [
                "# header",
                "challenges:",
                "    - id: 1",
                "      name: one",
                "    - id: 2",
                "      name: two",
                "",
                "# footer",
            ]
        );

        let record = read_record(&appended, 2, &PatchOptions::default()).unwrap();
        assert_eq!(record["create-time"], "2025-01-01T00:00:00.000Z");
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            ["id", "name", "create-time", "update-time"]
        );
    }

    #[test]
    fn appends_to_inline_empty_collection() {
        let appended = append_record(
            "challenges: []\n",
            &values("{id: 1, tags: [a]}"),
            now(),
            &PatchOptions::default(),
        )
        .unwrap();

        assert_eq!(
            read_record(&appended, 1, &PatchOptions::default()).unwrap()["tags"],
            serde_yaml::Value::Sequence(vec!["a".into()])
        );
        assert!(appended.starts_with("challenges:\n  - id: 1\n"));
    }

    #[test]
    fn append_needs_a_collection() {
        assert!(matches!(
            append_record("id: 1\n", &values("{id: 2}"), now(), &PatchOptions::default()),
            Err(Error::InvalidCollection(_))
        ));
    }
}
