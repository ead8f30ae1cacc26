//! Mutation intents and the payload preparation they need.
//!
//! Creates never carry the identifier field; updates always do.

use crate::query::ValidationError;
use crate::types::{Document, Value, ID_FIELD};

/// A confirmed mutation on one item kind, discarded once resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent<P> {
    Create(P),
    Update { id: String, payload: P },
    Delete { id: String },
}

impl<P> MutationIntent<P> {
    /// Short verb for logs and notifications.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            MutationIntent::Create(_) => "create",
            MutationIntent::Update { .. } => "update",
            MutationIntent::Delete { .. } => "delete",
        }
    }

    /// Identifier the intent targets, if any.
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        match self {
            MutationIntent::Create(_) => None,
            MutationIntent::Update { id, .. } | MutationIntent::Delete { id } => Some(id),
        }
    }
}

/// Lifecycle of one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Succeeded,
    Failed(String),
}

/// Parses the editor's text into a document payload.
///
/// # Errors
///
/// Returns `ValidationError::InvalidDocument` for malformed JSON and
/// `ValidationError::DocumentNotObject` for anything that is not an object.
pub fn parse_document(text: &str) -> Result<Document, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| ValidationError::InvalidDocument(e.to_string()))?;
    match Value::from(value) {
        Value::Map(doc) => Ok(doc),
        _ => Err(ValidationError::DocumentNotObject),
    }
}

/// Strips the identifier from a payload about to be created.
///
/// The engine assigns identifiers; a stale `_id` copied from another
/// document must never be sent.
#[must_use]
pub fn prepare_create(mut payload: Document) -> Document {
    if payload.remove(ID_FIELD).is_some() {
        tracing::debug!("dropped identifier from create payload");
    }
    payload
}

/// Makes sure an update payload carries the identifier it targets.
///
/// An identifier already present is kept as-is; it is not compared with
/// `id`.
#[must_use]
pub fn prepare_update(id: &str, mut payload: Document) -> Document {
    payload
        .entry(ID_FIELD.to_string())
        .or_insert_with(|| Value::String(id.to_string()));
    payload
}
