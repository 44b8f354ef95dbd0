//! Patching a single record's text.

use serde_yaml::Value;

use crate::{
    Error, FieldMap,
    format::{FormatHints, format_field, splice_value},
    options::PatchOptions,
    ranges::{FieldLayout, RecordLayout},
};

/// Returns the record id carried by `values`.
///
/// Numeric strings (`"12"`) are accepted and normalized.
pub fn record_id(values: &FieldMap) -> Option<i64> {
    match values.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Patch a single record so that its fields match `new_values`.
///
/// Unchanged fields are copied verbatim along with their comments. Changed
/// single-line scalars are edited in place; other changed fields are
/// regenerated in their original layout, keeping their comments. Fields
/// missing from `new_values` (or null) are removed. New fields are inserted
/// after the anchor field, in the configured field order.
///
/// Lines before the first field and after the last field are kept as-is.
pub fn patch_record(
    layout: &RecordLayout<'_>,
    new_values: &FieldMap,
    options: &PatchOptions,
) -> Result<String, Error> {
    let id = record_id(new_values).ok_or(Error::MissingIdentity)?;
    let lines = layout.lines();

    let mut additions = new_values
        .iter()
        .filter(|(name, value)| layout.field(name).is_none() && is_insertable(value))
        .map(|(name, value)| (name.as_str(), value))
        .collect::<Vec<_>>();
    additions.sort_by_key(|(name, _)| options.order_of(name));

    let anchored = layout.field(&options.anchor_field).is_some();
    let mut additions = Some(additions);

    let mut out: Vec<String> = lines[..layout.leading_end()]
        .iter()
        .map(|line| line.to_string())
        .collect();

    let id_value = Value::Number(id.into());
    for field in layout.fields() {
        let value = match field.name.as_str() {
            "id" => Some(&id_value),
            name => new_values.get(name),
        };

        patch_field(layout, field, value, options, &mut out)?;

        if anchored && field.name == options.anchor_field {
            if let Some(additions) = additions.take() {
                insert_fields(layout, &additions, options, &mut out)?;
            }
        }
    }

    if let Some(additions) = additions.take() {
        insert_fields(layout, &additions, options, &mut out)?;
    }

    out.extend(
        lines[layout.trailing_start()..]
            .iter()
            .map(|line| line.to_string()),
    );

    Ok(layout.join(&out))
}

fn is_insertable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        _ => true,
    }
}

fn patch_field(
    layout: &RecordLayout<'_>,
    field: &FieldLayout,
    value: Option<&Value>,
    options: &PatchOptions,
    out: &mut Vec<String>,
) -> Result<(), Error> {
    let lines = layout.lines();

    let Some(value) = value else {
        tracing::debug!("removing `{}`: no longer present", field.name);
        return Ok(());
    };

    if layout.original_value(field).as_ref() == Some(value) {
        out.extend(
            lines[field.comment_start..field.range.end]
                .iter()
                .map(|line| line.to_string()),
        );
        return Ok(());
    }

    if value.is_null() {
        tracing::debug!("removing `{}`: set to null", field.name);
        return Ok(());
    }

    if let Some(line) = splice_in_place(layout, field, value)? {
        out.extend(
            lines[field.comment_start..field.range.start]
                .iter()
                .map(|line| line.to_string()),
        );
        out.push(line);
        return Ok(());
    }

    if let Some(comments) = layout.comments().get(&field.name) {
        out.extend(comments.iter().cloned());
    }
    out.extend(format_field(
        &field.name,
        value,
        &FormatHints::from_field(layout, field),
        options,
    )?);

    Ok(())
}

/// Edit a single-line scalar field's value in place.
///
/// Returns `None` if the field or the new value isn't a plain single-line scalar.
fn splice_in_place(
    layout: &RecordLayout<'_>,
    field: &FieldLayout,
    value: &Value,
) -> Result<Option<String>, Error> {
    let Some(span) = field.range.value.clone() else {
        return Ok(None);
    };

    if field.range.end != field.range.start + 1 {
        return Ok(None);
    }

    match value {
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => return Ok(None),
        Value::String(s) if s.contains('\n') => return Ok(None),
        _ => {}
    }

    let line = layout.lines()[field.range.start];

    // Block scalar headers, flow collections, anchors, aliases and tags.
    if line[span.start..].starts_with(['|', '>', '[', '{', '&', '*', '!']) {
        return Ok(None);
    }

    splice_value(line, span, value).map(Some)
}

fn insert_fields(
    layout: &RecordLayout<'_>,
    additions: &[(&str, &Value)],
    options: &PatchOptions,
    out: &mut Vec<String>,
) -> Result<(), Error> {
    let hints = FormatHints::fresh(layout.field_indent());

    for (name, value) in additions {
        tracing::debug!("inserting new field `{name}`");
        out.extend(format_field(name, value, &hints, options)?);
    }

    Ok(())
}
