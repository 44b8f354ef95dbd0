//! Comment and format-preserving patches for hand-authored YAML records.
//!
//! `recordpatch` updates one record inside a YAML document (either a bare
//! single record, or one entry of a `challenges:` list) by rewriting only
//! the fields that changed. Comments, blank lines, indentation, list item
//! spacing and block scalar choices are carried over from the original text.
//!
//! This is **not** a parse, mutate and reserialize pipeline: the document is
//! only parsed (with `serde_yaml`) to sanity-check it and to read values
//! back. All edits are line-oriented and surgical. When they can't be applied,
//! [`save_record`] falls back to [`generate_record`], which writes a fresh,
//! comment-free document in a fixed key order.

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

pub mod classify;
pub mod collection;
pub mod comments;
pub mod format;
pub mod generate;
pub mod keys;
pub mod locate;
pub mod options;
pub mod patch;
pub mod ranges;
pub mod record;
pub mod session;
pub mod url;

pub use collection::{append_record, read_record, update_record_in_collection};
pub use generate::{generate_collection, generate_record};
pub use locate::{DocumentKind, RecordSpan, locate_record};
pub use options::{OptionsError, PatchOptions};
pub use patch::{patch_record, record_id};
pub use ranges::RecordLayout;
pub use record::{Challenge, Solution};
pub use session::{EditSession, SessionEvent};

/// A record's fields, keyed by their persisted names, in document order.
pub type FieldMap = IndexMap<String, serde_yaml::Value>;

/// Error types for record patch operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The new values carry no usable `id`, so the record can't be re-anchored.
    #[error("record has no usable `id`")]
    MissingIdentity,
    /// The requested record isn't in the document.
    #[error("no record with id {id} in document")]
    RecordNotFound { id: i64 },
    /// The document isn't shaped like a record collection where one was expected.
    #[error("invalid collection: {0}")]
    InvalidCollection(String),
    /// The layout of a complex field couldn't be inferred from the original text.
    #[error("couldn't detect the layout of `{field}`")]
    FormatDetection { field: String },
    /// The document isn't valid YAML.
    #[error("YAML syntax error: {0}")]
    Syntax(#[source] serde_yaml::Error),
    #[error("YAML serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// The result of [`save_record`].
#[derive(Debug)]
pub enum SaveOutcome {
    /// The record was patched in place.
    Patched(String),
    /// The record wasn't in the collection, so it was appended to it.
    Appended(String),
    /// The document was generated from scratch.
    ///
    /// `reason` is `None` for brand-new records, and otherwise holds the
    /// error that kept the record from being patched in place.
    Generated {
        document: String,
        reason: Option<Error>,
    },
}

impl SaveOutcome {
    /// The saved document.
    pub fn document(&self) -> &str {
        match self {
            SaveOutcome::Patched(document) | SaveOutcome::Appended(document) => document,
            SaveOutcome::Generated { document, .. } => document,
        }
    }

    /// Consumes the outcome, returning the saved document.
    pub fn into_document(self) -> String {
        match self {
            SaveOutcome::Patched(document) | SaveOutcome::Appended(document) => document,
            SaveOutcome::Generated { document, .. } => document,
        }
    }

    /// Returns true if formatting and comments of the original were lost.
    pub fn is_fallback(&self) -> bool {
        matches!(self, SaveOutcome::Generated { reason: Some(_), .. })
    }
}

/// Save `values` against an `original` document.
///
/// With no original text (or a blank one) the record is generated from
/// scratch. Otherwise the record is patched in place; a record missing from a
/// collection is appended to it. Any other failure falls back to generating a
/// single-record document, which loses the original's comments and layout.
///
/// Only errors from the generator itself are returned.
pub fn save_record(
    original: Option<&str>,
    values: &FieldMap,
    now: DateTime<Utc>,
    options: &PatchOptions,
) -> Result<SaveOutcome, Error> {
    let original = original.filter(|text| !text.trim().is_empty());

    let Some(original) = original else {
        return Ok(SaveOutcome::Generated {
            document: generate_record(values, now, options)?,
            reason: None,
        });
    };

    let error = match record_id(values) {
        None => Error::MissingIdentity,
        Some(id) => match update_record_in_collection(original, id, values, options) {
            Ok(document) => return Ok(SaveOutcome::Patched(document)),
            Err(err @ Error::RecordNotFound { .. })
                if matches!(
                    locate::document_kind(original, options),
                    Ok(DocumentKind::Collection)
                ) =>
            {
                tracing::debug!("{err}; appending to collection");
                match append_record(original, values, now, options) {
                    Ok(document) => return Ok(SaveOutcome::Appended(document)),
                    Err(err) => err,
                }
            }
            Err(err) => err,
        },
    };

    tracing::warn!("couldn't patch record in place, regenerating document: {error}");

    Ok(SaveOutcome::Generated {
        document: generate_record(values, now, options)?,
        reason: Some(error),
    })
}
