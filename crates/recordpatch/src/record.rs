//! A typed view of challenge records.

use serde::{Deserialize, Serialize};

use crate::{Error, FieldMap, url::decode_url};

/// A single write-up or reference for a challenge.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Solution {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A challenge record, with its persisted field names.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Challenge {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "name_en", skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_markdown: Option<String>,
    #[serde(
        default,
        rename = "description-markdown_en",
        skip_serializing_if = "Option::is_none"
    )]
    pub description_markdown_en: Option<String>,
    /// The challenge's URL, Base64-encoded.
    #[serde(default, rename = "base64-url", skip_serializing_if = "Option::is_none")]
    pub base64_url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_expired: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub solutions: Vec<Solution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Challenge {
    /// Build a challenge from persisted fields.
    ///
    /// Unknown fields are ignored.
    pub fn from_fields(fields: &FieldMap) -> Result<Self, Error> {
        let mapping = fields
            .iter()
            .map(|(key, value)| (serde_yaml::Value::String(key.clone()), value.clone()))
            .collect::<serde_yaml::Mapping>();

        let challenge: Self = serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))?;
        challenge.validate()?;
        Ok(challenge)
    }

    /// Convert the challenge back into persisted fields.
    pub fn to_fields(&self) -> Result<FieldMap, Error> {
        Ok(serde_yaml::from_value(serde_yaml::to_value(self)?)?)
    }

    fn validate(&self) -> Result<(), Error> {
        match self.difficulty_level {
            Some(level) if !(1..=5).contains(&level) => Err(Error::InvalidOperation(format!(
                "difficulty level must be between 1 and 5, got {level}"
            ))),
            _ => Ok(()),
        }
    }

    /// The challenge's decoded URL, if it has one.
    pub fn url(&self) -> Option<String> {
        self.base64_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(decode_url)
    }
}
