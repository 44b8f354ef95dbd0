//! Generating record documents from scratch.
//!
//! Generated documents carry no comments and follow the configured field
//! order. This is the path for brand-new records, and the fallback when a
//! record can't be patched in place.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};

use crate::{Error, FieldMap, options::PatchOptions, patch::record_id};

/// Format a timestamp the way records store them.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build a record's mapping from `values`.
///
/// Fields follow the configured order, with unknown fields last in their
/// input order. Null fields are skipped. `update-time` is stamped with `now`,
/// as is `create-time` unless `values` already carries one.
pub(crate) fn record_mapping(
    values: &FieldMap,
    now: DateTime<Utc>,
    options: &PatchOptions,
) -> Mapping {
    let stamp = Value::String(timestamp(now));

    let mut fields = values
        .iter()
        .filter(|(name, value)| {
            !value.is_null() && *name != "create-time" && *name != "update-time"
        })
        .map(|(name, value)| match (name.as_str(), record_id(values)) {
            ("id", Some(id)) => (name.as_str(), Value::Number(id.into())),
            _ => (name.as_str(), value.clone()),
        })
        .collect::<Vec<_>>();

    let create_time = match values.get("create-time") {
        Some(Value::String(time)) if !time.trim().is_empty() => Value::String(time.clone()),
        Some(value) if !value.is_null() && !value.is_string() => value.clone(),
        _ => stamp.clone(),
    };
    fields.push(("create-time", create_time));
    fields.push(("update-time", stamp));

    fields.sort_by_key(|(name, _)| options.order_of(name));

    fields
        .into_iter()
        .map(|(name, value)| (Value::String(name.to_string()), value))
        .collect()
}

/// Generate a single-record document from `values`.
pub fn generate_record(
    values: &FieldMap,
    now: DateTime<Utc>,
    options: &PatchOptions,
) -> Result<String, Error> {
    Ok(serde_yaml::to_string(&Value::Mapping(record_mapping(
        values, now, options,
    )))?)
}

/// Generate a collection document holding `records`.
pub fn generate_collection(
    records: &[FieldMap],
    now: DateTime<Utc>,
    options: &PatchOptions,
) -> Result<String, Error> {
    let records = records
        .iter()
        .map(|values| Value::Mapping(record_mapping(values, now, options)))
        .collect();

    let mut document = Mapping::new();
    document.insert(
        Value::String(options.collection_key.clone()),
        Value::Sequence(records),
    );

    Ok(serde_yaml::to_string(&Value::Mapping(document))?)
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
    fn timestamps() {
        assert_eq!(timestamp(now()), "2026-01-02T03:04:05.678Z");
    }

    #[test]
    fn canonical_order() {
        let mapping = record_mapping(
            &values(
                "{extra: 1, tags: [a], name: n, id: '7', platform: null, create-time: '', zzz: 2}",
            ),
            now(),
            &PatchOptions::default(),
        );

        assert_eq!(
            mapping
                .iter()
                .map(|(k, _)| k.as_str().unwrap())
                .collect::<Vec<_>>(),
            ["id", "name", "tags", "create-time", "update-time", "extra", "zzz"]
        );
        assert_eq!(mapping["id"], Value::Number(7.into()));
        assert_eq!(mapping["create-time"], "2026-01-02T03:04:05.678Z");
        assert_eq!(mapping["update-time"], "2026-01-02T03:04:05.678Z");
    }

    #[test]
    fn keeps_create_time() {
        let mapping = record_mapping(
            &values("{id: 1, create-time: '2020-01-01T00:00:00.000Z', update-time: old}"),
            now(),
            &PatchOptions::default(),
        );

        assert_eq!(mapping["create-time"], "2020-01-01T00:00:00.000Z");
        assert_eq!(mapping["update-time"], "2026-01-02T03:04:05.678Z");
    }

    #[test]
    fn generated_documents_read_back() {
        let options = PatchOptions::default();
        let record = values("{id: 3, name: 'a: b', description-markdown: \"x\\ny\\n\", tags: []}");

        let document = generate_record(&record, now(), &options).unwrap();
        let read = crate::read_record(&document, 3, &options).unwrap();
        assert_eq!(read["name"], "a: b");
        assert_eq!(read["description-markdown"], "x\ny\n");

        let document = generate_collection(&[record.clone(), values("{id: 4}")], now(), &options)
            .unwrap();
        assert!(document.starts_with("challenges:\n"));
        assert_eq!(crate::read_record(&document, 4, &options).unwrap()["id"], 4);
    }
}
