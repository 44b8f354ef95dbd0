//! Rendering field values as YAML lines.
//!
//! Rendering mirrors the original field's layout where one is known
//! ([`FormatHints`]), and otherwise falls back to the configured defaults.

use serde_yaml::{Mapping, Value};

use crate::{
    Error,
    options::PatchOptions,
    ranges::{BlockFormat, FieldLayout, ListFormat, RecordLayout},
};

/// Characters that force a string to be quoted wherever they appear.
const SPECIAL_CHARS: &[char] = &[':', '#', '{', '}', '[', ']', '*', '&'];

/// Characters that force a string to be quoted when they lead it.
const INDICATOR_CHARS: &[char] = &['-', '?', '!', '|', '>', '\'', '"', '%', '@', '`', ','];

/// Key order for the entries of `solutions`.
const SOLUTION_KEY_ORDER: &[&str] = &["title", "url", "source", "author"];

/// What's known about a field's original layout.
#[derive(Clone, Debug, Default)]
pub struct FormatHints {
    /// The text preceding the key.
    pub prefix: String,
    /// The field's column.
    pub indent: usize,
    /// The original value was a quoted scalar.
    pub quoted: bool,
    /// The original value was a non-empty flow sequence.
    pub flow: bool,
    pub list: Option<ListFormat>,
    pub block: Option<BlockFormat>,
}

impl FormatHints {
    /// Hints for a field with no original text, at `indent`.
    pub fn fresh(indent: usize) -> Self {
        Self {
            prefix: " ".repeat(indent),
            indent,
            ..Default::default()
        }
    }

    /// Hints from an existing field.
    pub fn from_field(layout: &RecordLayout<'_>, field: &FieldLayout) -> Self {
        let value = layout.value_text(field).unwrap_or_default();

        Self {
            prefix: field.prefix.clone(),
            indent: field.prefix.len(),
            quoted: value.starts_with(['"', '\'']),
            flow: value.starts_with('[') && value.trim_start_matches('[').trim_start() != "]",
            list: field.list,
            block: field.block.clone(),
        }
    }

    fn list_format(&self, field: &str) -> Result<ListFormat, Error> {
        self.list.ok_or_else(|| Error::FormatDetection {
            field: field.into(),
        })
    }
}

/// Returns true if `s` can't be written as a plain scalar.
pub fn needs_quotes(s: &str) -> bool {
    if s.is_empty() || s.trim() != s {
        return true;
    }

    if s.contains(SPECIAL_CHARS) || s.contains(char::is_control) || s.starts_with(INDICATOR_CHARS)
    {
        return true;
    }

    // Anything that reads back as something other than the same string,
    // like `true`, `1.0` or `~`.
    !matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(read)) if read == s)
}

fn quote(s: &str) -> Result<String, Error> {
    // JSON strings are valid double-quoted YAML scalars.
    serde_json::to_string(s).map_err(|e| Error::InvalidOperation(e.to_string()))
}

fn format_string(s: &str, flow: bool) -> Result<String, Error> {
    if needs_quotes(s) || (flow && s.contains(',')) {
        quote(s)
    } else {
        Ok(s.to_string())
    }
}

/// Format a value as a single-line YAML scalar.
///
/// Sequences and mappings are written in flow style.
pub fn format_scalar(value: &Value) -> Result<String, Error> {
    match value {
        Value::String(s) => format_string(s, false),
        _ => serialize_flow(value),
    }
}

/// Serialize a [`serde_yaml::Value`] to a YAML string in flow layout.
///
/// This serializes only a restricted subset of YAML: tags are not
/// supported, and mapping keys must be strings.
pub fn serialize_flow(value: &Value) -> Result<String, Error> {
    let mut buf = String::new();
    fn serialize_inner(value: &Value, buf: &mut String) -> Result<(), Error> {
        match value {
            Value::Null => {
                buf.push_str("null");
                Ok(())
            }
            Value::Bool(b) => {
                buf.push_str(if *b { "true" } else { "false" });
                Ok(())
            }
            Value::Number(n) => {
                buf.push_str(&n.to_string());
                Ok(())
            }
            Value::String(s) => {
                buf.push_str(&format_string(s, true)?);
                Ok(())
            }
            Value::Sequence(values) => {
                buf.push('[');
                for (i, item) in values.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    serialize_inner(item, buf)?;
                }
                buf.push(']');
                Ok(())
            }
            Value::Mapping(mapping) if mapping.is_empty() => {
                buf.push_str("{}");
                Ok(())
            }
            Value::Mapping(mapping) => {
                buf.push_str("{ ");
                for (i, (key, value)) in mapping.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    if !matches!(key, Value::String(_)) {
                        return Err(Error::InvalidOperation(format!(
                            "mapping keys must be strings, found: {key:?}"
                        )));
                    }
                    serialize_inner(key, buf)?;

                    buf.push_str(": ");
                    serialize_inner(value, buf)?;
                }
                buf.push_str(" }");
                Ok(())
            }
            Value::Tagged(tagged) => Err(Error::InvalidOperation(format!(
                "cannot serialize tagged value: {tagged:?}"
            ))),
        }
    }

    serialize_inner(value, &mut buf)?;
    Ok(buf)
}

/// Render `prefix` `name: value` as a single line.
pub fn render_field_line(prefix: &str, name: &str, value: &Value) -> Result<String, Error> {
    Ok(format!("{prefix}{name}: {}", format_scalar(value)?))
}

/// Replace the `span` of `line` holding a field's value with `value`.
///
/// Everything outside the span, including any trailing comment, is kept.
pub fn splice_value(
    line: &str,
    span: std::ops::Range<usize>,
    value: &Value,
) -> Result<String, Error> {
    Ok(format!(
        "{}{}{}",
        &line[..span.start],
        format_scalar(value)?,
        &line[span.end..]
    ))
}

/// Render a whole field as lines of YAML, following `hints`.
pub fn format_field(
    name: &str,
    value: &Value,
    hints: &FormatHints,
    options: &PatchOptions,
) -> Result<Vec<String>, Error> {
    match value {
        Value::String(s) if s.contains('\n') => format_multiline(name, s, hints, options),
        Value::Sequence(items) => format_sequence(name, items, hints, options),
        Value::Mapping(mapping) if !mapping.is_empty() => {
            format_nested(name, value, hints, options)
        }
        _ => Ok(vec![render_field_line(&hints.prefix, name, value)?]),
    }
}

fn format_multiline(
    name: &str,
    s: &str,
    hints: &FormatHints,
    options: &PatchOptions,
) -> Result<Vec<String>, Error> {
    let prefix = &hints.prefix;

    // Keep chomping would also take in any blank lines that follow the field.
    if hints.quoted || s.ends_with("\n\n") {
        return Ok(vec![format!("{prefix}{name}: {}", quote(s)?)]);
    }

    let block = hints.block.as_ref();
    let content_indent = block
        .and_then(|b| b.content_indent)
        .filter(|indent| *indent > hints.indent)
        .unwrap_or(hints.indent + options.block_indent);

    let mut header = String::from("|");
    // Block indentation is detected from the first non-empty line, so any
    // leading whitespace there needs an explicit indicator.
    if s
        .lines()
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with([' ', '\t']))
    {
        let relative = content_indent - hints.indent;
        match char::from_digit(relative as u32, 10) {
            Some(digit) if relative > 0 => header.push(digit),
            _ => return Ok(vec![format!("{prefix}{name}: {}", quote(s)?)]),
        }
    }
    // Chomping follows the value, so that it reads back unchanged.
    if !s.ends_with('\n') {
        header.push('-');
    }

    let pad = " ".repeat(content_indent);
    let mut lines = vec![format!("{prefix}{name}: {header}")];
    lines.extend(s.lines().map(|line| {
        if line.is_empty() {
            String::new()
        } else {
            format!("{pad}{line}")
        }
    }));

    Ok(lines)
}

fn format_sequence(
    name: &str,
    items: &[Value],
    hints: &FormatHints,
    options: &PatchOptions,
) -> Result<Vec<String>, Error> {
    let prefix = &hints.prefix;

    if items.is_empty() {
        return Ok(vec![format!("{prefix}{name}: []")]);
    }

    if hints.flow {
        return Ok(vec![format!(
            "{prefix}{name}: {}",
            serialize_flow(&Value::Sequence(items.to_vec()))?
        )]);
    }

    let list = hints.list_format(name).unwrap_or_else(|err| {
        tracing::debug!("{err}, using the default list layout");
        ListFormat {
            indent: hints.indent + options.list_indent,
            space_after_dash: true,
        }
    });

    let mut lines = vec![format!("{prefix}{name}:")];

    if items.iter().all(|item| !item.is_sequence() && !item.is_mapping()) {
        for item in items {
            lines.push(format!("{}{}", list.marker(), format_scalar(item)?));
        }
    } else if let Some(entries) = items.iter().map(Value::as_mapping).collect::<Option<Vec<_>>>()
    {
        for entry in entries {
            lines.extend(format_entry(entry, &list)?);
        }
    } else {
        return format_nested(name, &Value::Sequence(items.to_vec()), hints, options);
    }

    Ok(lines)
}

/// Render a single mapping entry of a list, like a solution.
fn format_entry(entry: &Mapping, list: &ListFormat) -> Result<Vec<String>, Error> {
    let mut fields = entry
        .iter()
        .filter(|(_, value)| !value.is_null())
        .collect::<Vec<_>>();

    if fields.is_empty() {
        return Ok(vec![format!("{}{{}}", list.marker())]);
    }

    fields.sort_by_key(|(key, _)| {
        key.as_str()
            .and_then(|key| SOLUTION_KEY_ORDER.iter().position(|k| *k == key))
            .unwrap_or(usize::MAX)
    });

    let pad = " ".repeat(list.content_column());
    let mut lines = vec![];
    for (idx, (key, value)) in fields.into_iter().enumerate() {
        let key = match key.as_str() {
            Some(key) => key.to_string(),
            None => format_scalar(key)?,
        };
        let rendered = format!("{key}: {}", format_scalar(value)?);

        if idx == 0 {
            lines.push(format!("{}{rendered}", list.marker()));
        } else {
            lines.push(format!("{pad}{rendered}"));
        }
    }

    Ok(lines)
}

/// Render an arbitrarily nested value as a block under its key.
fn format_nested(
    name: &str,
    value: &Value,
    hints: &FormatHints,
    options: &PatchOptions,
) -> Result<Vec<String>, Error> {
    let yaml = serde_yaml::to_string(value)?;
    let pad = " ".repeat(hints.indent + options.list_indent);

    let mut lines = vec![format!("{}{name}:", hints.prefix)];
    lines.extend(yaml.lines().map(|line| {
        if line.is_empty() {
            String::new()
        } else {
            format!("{pad}{line}")
        }
    }));

    Ok(lines)
}
