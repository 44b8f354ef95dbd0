//! Patch configuration.

use serde::Deserialize;
use thiserror::Error;

/// The canonical order of a record's persisted fields.
pub const CANONICAL_FIELD_ORDER: &[&str] = &[
    "id",
    "id-alias",
    "platform",
    "name",
    "name_en",
    "difficulty-level",
    "description-markdown",
    "description-markdown_en",
    "base64-url",
    "is-expired",
    "tags",
    "solutions",
    "create-time",
    "update-time",
];

#[derive(Error, Debug)]
pub enum OptionsError {
    /// The options document is syntactically invalid.
    #[error("invalid options syntax")]
    Syntax(#[source] serde_yaml::Error),

    /// An option has a value outside of its accepted range.
    #[error("invalid option `{option}`: {reason}")]
    Invalid {
        option: &'static str,
        reason: String,
    },
}

/// Options controlling how records are located, patched and generated.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct PatchOptions {
    /// The top-level key holding a collection of records.
    pub collection_key: String,
    /// Newly added fields are inserted right after this field.
    pub anchor_field: String,
    /// Indentation of list items relative to their key, when it can't be detected.
    pub list_indent: usize,
    /// Indentation of block scalar content relative to its key, when it can't be detected.
    pub block_indent: usize,
    /// Key order for generated records and inserted fields.
    pub field_order: Vec<String>,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            collection_key: "challenges".into(),
            anchor_field: "description-markdown".into(),
            list_indent: 2,
            block_indent: 4,
            field_order: CANONICAL_FIELD_ORDER.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl PatchOptions {
    /// Load options from a YAML document.
    ///
    /// Missing options take their defaults.
    pub fn load(contents: &str) -> Result<Self, OptionsError> {
        // An empty (or comment-only) document is a valid, empty config.
        if contents
            .lines()
            .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#'))
        {
            return Ok(Self::default());
        }

        let options: Self = serde_yaml::from_str(contents).map_err(OptionsError::Syntax)?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), OptionsError> {
        if !(1..=9).contains(&self.block_indent) {
            return Err(OptionsError::Invalid {
                option: "block-indent",
                reason: format!("must be between 1 and 9, got {}", self.block_indent),
            });
        }

        if self.collection_key.trim().is_empty() {
            return Err(OptionsError::Invalid {
                option: "collection-key",
                reason: "must not be empty".into(),
            });
        }

        if self.field_order.first().map(String::as_str) != Some("id") {
            return Err(OptionsError::Invalid {
                option: "field-order",
                reason: "must start with `id`".into(),
            });
        }

        Ok(())
    }

    /// Returns the position of `field` in the configured field order.
    pub(crate) fn order_of(&self, field: &str) -> usize {
        self.field_order
            .iter()
            .position(|f| f == field)
            .unwrap_or(usize::MAX)
    }
}
