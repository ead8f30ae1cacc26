//! Filter and sort specifications for list views.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Document, Value};

/// Validation failures detected before anything is sent.
///
/// Messages are operator-facing and shown as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid JSON query: {0}")]
    InvalidQuery(String),
    #[error("Query must be a JSON object")]
    QueryNotObject,
    #[error("Invalid JSON document: {0}")]
    InvalidDocument(String),
    #[error("Document must be a JSON object")]
    DocumentNotObject,
    #[error("Invalid JSON metadata")]
    InvalidMetadata,
    #[error("{0}")]
    InvalidName(String),
    #[error("Only JSON files are supported")]
    NotJsonFile,
}

/// Structured filter criteria sent as `{"filter": ...}`.
///
/// An empty mapping means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuerySpec(pub Document);

impl QuerySpec {
    /// The empty filter.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses filter text for views that validate their query.
    ///
    /// Blank text is the empty filter. Anything else must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidQuery` for malformed JSON and
    /// `ValidationError::QueryNotObject` for valid JSON that is not an object.
    pub fn parse_strict(text: &str) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| ValidationError::InvalidQuery(e.to_string()))?;
        match Value::from(value) {
            Value::Map(doc) => Ok(Self(doc)),
            _ => Err(ValidationError::QueryNotObject),
        }
    }

    /// Parses filter text for views that do not validate their query.
    ///
    /// Blank text, malformed JSON and non-object JSON all yield the empty
    /// filter.
    #[must_use]
    pub fn parse_lenient(text: &str) -> Self {
        Self::parse_strict(text).unwrap_or_else(|err| {
            tracing::debug!(%err, "ignoring unparseable filter text");
            Self::empty()
        })
    }

    /// The request body `{"filter": <criteria>}`.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "filter": self })
    }
}

/// How a view interprets the operator's filter text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// JSON criteria; malformed text blocks submission.
    Strict,
    /// JSON criteria; malformed text is treated as no filter.
    Lenient,
    /// Plain substring search on the item name.
    NameSearch,
}

/// The filter currently applied to a view.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Criteria(QuerySpec),
    Search(String),
}

impl Filter {
    /// The "no filter" value for a policy.
    #[must_use]
    pub fn none_for(policy: FilterPolicy) -> Self {
        match policy {
            FilterPolicy::Strict | FilterPolicy::Lenient => Filter::Criteria(QuerySpec::empty()),
            FilterPolicy::NameSearch => Filter::Search(String::new()),
        }
    }

    /// Interprets operator text according to `policy`.
    ///
    /// # Errors
    ///
    /// Only `FilterPolicy::Strict` can fail, see [`QuerySpec::parse_strict`].
    pub fn parse(policy: FilterPolicy, text: &str) -> Result<Self, ValidationError> {
        match policy {
            FilterPolicy::Strict => QuerySpec::parse_strict(text).map(Filter::Criteria),
            FilterPolicy::Lenient => Ok(Filter::Criteria(QuerySpec::parse_lenient(text))),
            FilterPolicy::NameSearch => Ok(Filter::Search(text.trim().to_string())),
        }
    }

    /// Structured criteria, if this is a criteria filter.
    #[must_use]
    pub fn criteria(&self) -> Option<&QuerySpec> {
        match self {
            Filter::Criteria(q) => Some(q),
            Filter::Search(_) => None,
        }
    }

    /// Non-blank search text, if this is a search filter.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        match self {
            Filter::Search(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Criteria(q) => q.is_empty(),
            Filter::Search(s) => s.is_empty(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Wire value for `sort_order`: `1` ascending, `-1` descending.
    #[must_use]
    pub fn order(self) -> i8 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// Wire value for the name-list `sort` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// An active sort on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Applies a header click on `field` to the current sort.
    ///
    /// The same field flips direction; any other field starts ascending.
    #[must_use]
    pub fn toggled(current: Option<&SortSpec>, field: &str) -> SortSpec {
        match current {
            Some(spec) if spec.field == field => SortSpec {
                field: spec.field.clone(),
                direction: spec.direction.flipped(),
            },
            _ => SortSpec {
                field: field.to_string(),
                direction: SortDirection::Ascending,
            },
        }
    }
}
