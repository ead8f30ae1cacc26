//! The HTTP seam: one trait, one reqwest-backed implementation.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::error::BackendError;
use crate::transport::{MultipartForm, RequestBody};

/// A request as it leaves the transport, path already rendered.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    /// Absolute target below the base URL, starting with `/`.
    pub target: String,
    pub body: RequestBody,
}

/// A response as received, body unread.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// A JSON response with the given status, mostly for tests.
    #[must_use]
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(value.to_string()),
        }
    }
}

/// Sends raw requests. Implementations must not interpret status codes.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Sends one request and returns whatever the server answered.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` only when no response was received.
    async fn send(&self, request: RawRequest) -> Result<RawResponse, BackendError>;
}

// ---------------------------------------------------------------------------
// ReqwestBackend
// ---------------------------------------------------------------------------

/// [`HttpBackend`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    base_url: String,
    bearer_token: Option<String>,
    http: reqwest::Client,
}

impl ReqwestBackend {
    #[must_use]
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn multipart(form: MultipartForm) -> Result<reqwest::multipart::Form, BackendError> {
        let mut out = reqwest::multipart::Form::new();
        for (name, value) in form.fields {
            out = out.text(name, value);
        }
        for file in form.files {
            let part = reqwest::multipart::Part::bytes(file.data.to_vec())
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            out = out.part(file.field, part);
        }
        Ok(out)
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, BackendError> {
        let url = format!("{}{}", self.base_url, request.target);
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut builder = self
            .http
            .request(request.method, &url)
            .header("x-request-id", &request_id);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(Self::multipart(form)?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        tracing::debug!(%request_id, status = status.as_u16(), bytes = body.len(), "response received");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
