//! Resource paths and their wire encoding.
//!
//! A [`ResourcePath`] is a list of raw segments (database name, collection
//! name, document id, ...) plus query parameters. On the wire the whole
//! logical path `seg/seg?k=v` is sent as a single URL-safe base64 token
//! (RFC 4648 §5, unpadded), so the engine's router never sees raw separators
//! coming from identifiers. The engine routes on the decoded text as is, so
//! inside the token a segment keeps its raw characters and only the structural
//! ones (`%`, `/`, `?`, `#`, `&`, `=`) are percent-escaped. Query keys and
//! values are fully percent-encoded, since the engine parses the query string
//! as a regular form query.

use std::fmt::{self, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

/// Errors from decoding an encoded path token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path token is not valid base64: {0}")]
    Base64(String),
    #[error("decoded path is not valid UTF-8")]
    Utf8,
    #[error("path segment is not valid percent-encoding: {0}")]
    Percent(String),
}

/// Logical address of a database resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ResourcePath {
    /// Creates an empty path (the API root).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Appends one raw segment. The segment may contain any character.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Appends one query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends a query parameter only when `value` is `Some`.
    #[must_use]
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Raw segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Looks up the first query parameter with the given key.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Renders the query string (`k=v&k2=v2`) without the leading `?`.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Renders the logical path, e.g. `db/my%2Fdb/col?page=1`.
    ///
    /// Only structural characters in segments are escaped; there is no
    /// leading slash.
    #[must_use]
    pub fn logical(&self) -> String {
        let path = self
            .segments
            .iter()
            .map(|s| escape_segment(s.as_str()))
            .collect::<Vec<_>>()
            .join("/");
        if self.query.is_empty() {
            path
        } else {
            format!("{path}?{}", self.query_string())
        }
    }

    /// Encodes the logical path as an unpadded URL-safe base64 token.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.logical().as_bytes())
    }

    /// Decodes a token produced by [`ResourcePath::encode`].
    ///
    /// Padding is accepted but not required.
    ///
    /// # Errors
    ///
    /// Returns `PathError` when the token is not base64, not UTF-8, or
    /// contains malformed percent-encoding.
    pub fn decode(token: &str) -> Result<Self, PathError> {
        let trimmed = token.trim_start_matches('/').trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .map_err(|e| PathError::Base64(e.to_string()))?;
        let logical = String::from_utf8(bytes).map_err(|_| PathError::Utf8)?;
        Self::parse_logical(&logical)
    }

    /// Parses a logical path as produced by [`ResourcePath::logical`].
    ///
    /// # Errors
    ///
    /// Returns `PathError::Percent` for malformed percent-encoding.
    pub fn parse_logical(logical: &str) -> Result<Self, PathError> {
        let (path, query) = match logical.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (logical, None),
        };

        let segments = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/')
                .map(percent_decode)
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut params = Vec::new();
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            for pair in query.split('&') {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                params.push((percent_decode(k)?, percent_decode(v)?));
            }
        }

        Ok(Self {
            segments,
            query: params,
        })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.logical())
    }
}

/// Characters that would change how the decoded path splits.
const STRUCTURAL: [char; 6] = ['%', '/', '?', '#', '&', '='];

fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if STRUCTURAL.contains(&c) {
            let _ = write!(out, "%{:02X}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    out
}

fn percent_decode(text: &str) -> Result<String, PathError> {
    urlencoding::decode(text)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| PathError::Percent(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn logical_path_joins_segments_and_query() {
        let path = ResourcePath::root()
            .segment("db")
            .segment("shop")
            .segment("col")
            .param("page", 1)
            .param("page_size", 12);
        assert_eq!(path.logical(), "db/shop/col?page=1&page_size=12");
        assert_eq!(path.to_string(), "/db/shop/col?page=1&page_size=12");
    }

    #[test]
    fn reserved_characters_are_escaped_inside_segments() {
        let path = ResourcePath::root().segment("db").segment("a/b?c&d=e");
        assert_eq!(path.logical(), "db/a%2Fb%3Fc%26d%3De");
        let path = ResourcePath::root().segment("db").segment("x#y");
        assert_eq!(path.logical(), "db/x%23y");
    }

    #[test]
    fn ordinary_characters_stay_raw_in_the_token() {
        let path = ResourcePath::root()
            .segment("db")
            .segment("café")
            .segment("gridfs")
            .segment("report 2024 (final)+v2@ops.txt");
        let decoded = URL_SAFE_NO_PAD.decode(path.encode()).unwrap();
        let text = String::from_utf8(decoded).unwrap();
        assert_eq!(text, "db/café/gridfs/report 2024 (final)+v2@ops.txt");
        assert_eq!(ResourcePath::decode(&path.encode()).unwrap(), path);
    }

    #[test]
    fn percent_sign_in_segment_round_trips() {
        let path = ResourcePath::root().segment("db").segment("100%25 off");
        assert_eq!(path.logical(), "db/100%2525 off");
        assert_eq!(ResourcePath::decode(&path.encode()).unwrap(), path);
    }

    #[test]
    fn encoded_token_has_no_separators_or_padding() {
        let path = ResourcePath::root()
            .segment("db")
            .segment("x")
            .param("search", "a b");
        let token = path.encode();
        assert!(!token.contains('/'));
        assert!(!token.contains('+'));
        assert!(!token.contains('='));
        assert!(!token.contains('?'));
    }

    #[test]
    fn decode_accepts_padding_and_leading_slash() {
        let path = ResourcePath::root().segment("db").segment("a");
        let padded = format!("/{}==", path.encode());
        assert_eq!(ResourcePath::decode(&padded).unwrap(), path);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            ResourcePath::decode("!!!"),
            Err(PathError::Base64(_))
        ));
    }

    #[test]
    fn query_value_finds_first_match() {
        let path = ResourcePath::root()
            .param("page", 2)
            .param_opt::<u32>("sort_order", None)
            .param_opt("sort_field", Some("age"));
        assert_eq!(path.query_value("page"), Some("2"));
        assert_eq!(path.query_value("sort_field"), Some("age"));
        assert_eq!(path.query_value("sort_order"), None);
    }

    #[test]
    fn root_round_trips() {
        let root = ResourcePath::root();
        assert_eq!(root.encode(), "");
        assert_eq!(ResourcePath::decode("").unwrap(), root);
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            segments in prop::collection::vec(".{1,16}", 1..5),
            query in prop::collection::vec(("[a-z_]{1,8}", ".{0,12}"), 0..4),
        ) {
            let mut path = ResourcePath::root();
            for segment in &segments {
                path = path.segment(segment.clone());
            }
            for (k, v) in &query {
                path = path.param(k.clone(), v);
            }
            prop_assert_eq!(ResourcePath::decode(&path.encode()).unwrap(), path);
        }

        #[test]
        fn control_characters_survive(id in "[\\x00-\\x1f/?#%&=]{1,10}") {
            let path = ResourcePath::root().segment("db").segment(id.clone());
            let back = ResourcePath::decode(&path.encode()).unwrap();
            prop_assert_eq!(&back.segments()[1], &id);
        }
    }
}
