//! Editing sessions over a single record.
//!
//! A session holds the current text of the document being edited. Every
//! save is patched against that text, and its output becomes the text the
//! next save is patched against. Saving takes `&mut self`, so a session has
//! a single writer.
//!
//! Interested parties can [`subscribe`](EditSession::subscribe) to a
//! session's events instead of polling it.

use std::sync::mpsc::{Receiver, Sender, channel};

use chrono::{DateTime, Utc};
use serde_yaml::Value;

use crate::{
    Error, FieldMap, SaveOutcome,
    collection::read_record,
    options::PatchOptions,
    record::Challenge,
    save_record,
    url::{URL_FIELD, normalize_fields},
};

/// Something that happened in an [`EditSession`].
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The record's tags changed.
    TagsUpdated(Vec<Value>),
    /// The record's (encoded) URL changed.
    Base64UrlUpdated(Option<String>),
    /// The document was saved.
    Saved { id: Option<i64> },
    /// The document was saved by regenerating it, losing its formatting.
    FellBack { reason: String },
}

/// An editing session over a single record.
#[derive(Debug)]
pub struct EditSession {
    options: PatchOptions,
    document: Option<String>,
    fields: FieldMap,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl EditSession {
    /// Open a session on the record with the given `id` in `document`.
    pub fn open(document: String, id: i64, options: PatchOptions) -> Result<Self, Error> {
        let fields = read_record(&document, id, &options)?;

        Ok(Self {
            options,
            document: Some(document),
            fields,
            subscribers: vec![],
        })
    }

    /// Start a session for a brand-new record.
    pub fn new_record(options: PatchOptions) -> Self {
        Self {
            options,
            document: None,
            fields: FieldMap::new(),
            subscribers: vec![],
        }
    }

    /// The current document text, if any has been saved or loaded.
    pub fn original(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// The record's current fields.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// A typed view of the record's current fields.
    pub fn challenge(&self) -> Result<Challenge, Error> {
        Challenge::from_fields(&self.fields)
    }

    /// Subscribe to this session's events.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Save `values` as the record's new fields.
    pub fn save(&mut self, values: FieldMap) -> Result<&str, Error> {
        self.save_at(values, Utc::now())
    }

    /// Like [`save`](Self::save), with an explicit timestamp.
    pub fn save_at(&mut self, mut values: FieldMap, now: DateTime<Utc>) -> Result<&str, Error> {
        normalize_fields(&mut values);

        let outcome = save_record(self.document.as_deref(), &values, now, &self.options)?;

        if values.get("tags") != self.fields.get("tags") {
            let tags = match values.get("tags") {
                Some(Value::Sequence(tags)) => tags.clone(),
                _ => vec![],
            };
            self.publish(SessionEvent::TagsUpdated(tags));
        }

        if values.get(URL_FIELD) != self.fields.get(URL_FIELD) {
            let url = values
                .get(URL_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string);
            self.publish(SessionEvent::Base64UrlUpdated(url));
        }

        if let SaveOutcome::Generated {
            reason: Some(reason),
            ..
        } = &outcome
        {
            self.publish(SessionEvent::FellBack {
                reason: reason.to_string(),
            });
        }

        self.publish(SessionEvent::Saved {
            id: crate::record_id(&values),
        });

        self.fields = values;
        Ok(self.document.insert(outcome.into_document()).as_str())
    }

    fn publish(&mut self, event: SessionEvent) {
        // Dropped receivers unsubscribe.
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
