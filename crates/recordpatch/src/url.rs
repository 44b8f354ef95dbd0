//! The Base64 encoding of a record's `base64-url` field.
//!
//! Whether a value is already encoded is inferred: it is if it decodes
//! (standard alphabet) to UTF-8 text starting with `http`. Plain text that
//! happens to satisfy this is misread as encoded.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_yaml::Value;

use crate::FieldMap;

/// The persisted key holding the encoded URL.
pub const URL_FIELD: &str = "base64-url";

fn decoded(value: &str) -> Option<String> {
    let bytes = STANDARD.decode(value.trim()).ok()?;
    String::from_utf8(bytes)
        .ok()
        .filter(|url| url.starts_with("http"))
}

/// Returns true if `value` is a Base64-encoded URL.
pub fn is_encoded(value: &str) -> bool {
    decoded(value).is_some()
}

/// Encode `value`, unless it's already encoded.
pub fn encode_url(value: &str) -> String {
    if value.is_empty() || is_encoded(value) {
        return value.to_string();
    }

    STANDARD.encode(value)
}

/// Decode `value`, if it's encoded. Other values are returned unchanged.
pub fn decode_url(value: &str) -> String {
    decoded(value).unwrap_or_else(|| value.to_string())
}

/// Encode the `base64-url` of `fields` in place, if it's a string.
///
/// Returns true if the value changed.
pub fn normalize_fields(fields: &mut FieldMap) -> bool {
    let Some(Value::String(url)) = fields.get_mut(URL_FIELD) else {
        return false;
    };

    let encoded = encode_url(url);
    if encoded == *url {
        return false;
    }

    tracing::debug!("encoding plain `{URL_FIELD}`");
    *url = encoded;
    true
}
