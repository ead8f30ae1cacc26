//! Error types for the client side.
//!
//! Every failed request is reduced to a [`ClassifiedError`] so that callers
//! only ever branch on [`ErrorCategory`].

use std::fmt;

use dhara_core::{PreviewRejection, ValidationError};
use dhara_core::view::CommandError;
use thiserror::Error;

/// Coarse failure category shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP 401; recoverable only by a reload.
    Auth,
    /// No response was received.
    Network,
    /// Non-2xx response.
    Server,
    /// Anything else, including undecodable responses.
    Unknown,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Auth => "auth",
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request failure after classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub status: Option<u16>,
    pub message: String,
    /// `true` when `message` came from the server's `detail` field.
    pub server_detail: bool,
}

impl ClassifiedError {
    #[must_use]
    pub fn auth() -> Self {
        Self {
            category: ErrorCategory::Auth,
            status: Some(401),
            message: "Authentication required".to_string(),
            server_detail: false,
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Network,
            status: None,
            message: message.into(),
            server_detail: false,
        }
    }

    /// Non-2xx response whose body carried a `detail`.
    #[must_use]
    pub fn server_detail(status: u16, detail: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Server,
            status: Some(status),
            message: detail.into(),
            server_detail: true,
        }
    }

    /// Non-2xx response without a usable body:
    /// `"<METHOD> <path> failed: <status> <reason>"`.
    #[must_use]
    pub fn server_generic(method: &http::Method, path: &str, status: http::StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or("");
        Self {
            category: ErrorCategory::Server,
            status: Some(status.as_u16()),
            message: format!("{method} {path} failed: {} {reason}", status.as_u16())
                .trim_end()
                .to_string(),
            server_detail: false,
        }
    }

    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Unknown,
            status: None,
            message: message.into(),
            server_detail: false,
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.category == ErrorCategory::Auth
    }
}

/// Failures of an [`HttpBackend`](crate::transport::HttpBackend) before any
/// response was received.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid request: {0}")]
    Build(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            BackendError::Connect(err.to_string())
        } else if err.is_builder() {
            BackendError::Build(err.to_string())
        } else {
            BackendError::Request(err.to_string())
        }
    }
}

/// Errors returned by list controllers and the mutation orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    /// Refused locally; nothing was sent.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// Refused locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] ClassifiedError),
    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        operation: &'static str,
        kind: &'static str,
    },
    #[error(transparent)]
    Preview(#[from] PreviewRejection),
}

impl ControllerError {
    /// The classified failure, if a request was made.
    #[must_use]
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            ControllerError::Request(err) => Some(err),
            _ => None,
        }
    }

    /// `true` when the error was detected before any request was sent.
    #[must_use]
    pub fn is_local(&self) -> bool {
        !matches!(self, ControllerError::Request(_))
    }
}
