//! Translation between editor field names and persisted field names.
//!
//! Editors name fields in camelCase (`descriptionMarkdown`), while records
//! persist them in the mixed kebab/underscore spelling (`description-markdown`).
//! Keys outside of the table pass through unchanged.

use crate::FieldMap;

/// `(editor, persisted)` key pairs.
const KEYS: &[(&str, &str)] = &[
    ("idAlias", "id-alias"),
    ("nameEn", "name_en"),
    ("difficultyLevel", "difficulty-level"),
    ("descriptionMarkdown", "description-markdown"),
    ("descriptionMarkdownEn", "description-markdown_en"),
    ("base64Url", "base64-url"),
    ("isExpired", "is-expired"),
    ("createTime", "create-time"),
    ("updateTime", "update-time"),
];

/// Returns the persisted spelling of an editor key.
pub fn to_persisted_key(key: &str) -> &str {
    KEYS.iter()
        .find(|(ui, _)| *ui == key)
        .map_or(key, |(_, persisted)| *persisted)
}

/// Returns the editor spelling of a persisted key.
pub fn to_ui_key(key: &str) -> &str {
    KEYS.iter()
        .find(|(_, persisted)| *persisted == key)
        .map_or(key, |(ui, _)| *ui)
}

/// Rename every key of `fields` to its persisted spelling.
pub fn to_persisted_fields(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(key, value)| (to_persisted_key(&key).to_string(), value))
        .collect()
}

/// Rename every key of `fields` to its editor spelling.
pub fn to_ui_fields(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(key, value)| (to_ui_key(&key).to_string(), value))
        .collect()
}
