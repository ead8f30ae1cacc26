//! Client configuration.

use std::time::Duration;

use dhara_core::PreviewPolicy;

/// Top-level configuration for a console session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the engine API, without a trailing slash.
    pub base_url: String,
    /// Optional bearer token sent on every request.
    pub bearer_token: Option<String>,
    /// Send paths as a single base64 token. Disable only for engines that
    /// route plain paths.
    pub encode_paths: bool,
    /// Fixed page size of each view kind.
    pub page_sizes: PageSizes,
    /// How long a notification stays in the queue before it expires.
    pub notification_ttl: Duration,
    /// Inline preview rules for blob files.
    pub preview: PreviewPolicy,
    /// Maximum characters rendered per table cell.
    pub cell_width: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            bearer_token: None,
            encode_paths: true,
            page_sizes: PageSizes::default(),
            notification_ttl: Duration::from_secs(5),
            preview: PreviewPolicy::default(),
            cell_width: 40,
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}

/// Page size per view kind. Not adjustable once a view exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub databases: u32,
    pub collections: u32,
    pub documents: u32,
    pub buckets: u32,
    pub files: u32,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            databases: 10,
            collections: 10,
            documents: 12,
            buckets: 10,
            files: 10,
        }
    }
}
