//! Request transport and response classification.
//!
//! Every call goes through [`Transport`], which encodes the resource path,
//! hands the request to an [`HttpBackend`], and reduces the outcome to either
//! a decoded body or a [`ClassifiedError`]. Classification order:
//!
//! 1. 401: `auth`, the session overlay is raised, the body is never read
//! 2. non-2xx with a JSON `detail`: `server` carrying that detail
//! 3. other non-2xx: `server` with `"<METHOD> <path> failed: <status> <reason>"`
//! 4. no response at all: `network`
//!
//! Undecodable success bodies are `unknown`.

pub mod backend;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use dhara_core::ResourcePath;
use http::{Method, StatusCode};
use tracing::{info_span, Instrument};

pub use backend::{HttpBackend, RawRequest, RawResponse, ReqwestBackend};

use crate::error::ClassifiedError;
use crate::overlay::ErrorOverlay;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// One file inside a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FilePart {
    /// A `file` part whose content type is guessed from the name.
    #[must_use]
    pub fn guessed(file_name: impl Into<String>, data: Bytes) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            field: "file".to_string(),
            file_name,
            content_type,
            data,
        }
    }
}

/// A multipart form: text fields plus files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// A request in logical form, before path encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: ResourcePath,
    pub body: RequestBody,
}

impl ApiRequest {
    #[must_use]
    pub fn get(path: ResourcePath) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: ResourcePath) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: ResourcePath) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: ResourcePath) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn new(method: Method, path: ResourcePath) -> Self {
        Self {
            method,
            path,
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Classifying transport shared by every controller of a session.
#[derive(Clone)]
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    overlay: Arc<ErrorOverlay>,
    encode_paths: bool,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("encode_paths", &self.encode_paths)
            .finish_non_exhaustive()
    }
}

impl Transport {
    #[must_use]
    pub fn new(backend: Arc<dyn HttpBackend>, overlay: Arc<ErrorOverlay>, encode_paths: bool) -> Self {
        Self {
            backend,
            overlay,
            encode_paths,
        }
    }

    /// Renders the wire target for a path: `/<token>` or `/<logical>`.
    #[must_use]
    pub fn target(&self, path: &ResourcePath) -> String {
        if self.encode_paths {
            format!("/{}", path.encode())
        } else {
            path.to_string()
        }
    }

    /// Sends a request and decodes its JSON body.
    ///
    /// An empty success body decodes to `null`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see the module docs.
    pub async fn request(&self, request: ApiRequest) -> Result<serde_json::Value, ClassifiedError> {
        let body = self.execute(request).await?;
        if body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&body)
            .map_err(|e| ClassifiedError::unknown(format!("Invalid JSON response: {e}")))
    }

    /// Sends a multipart form and decodes the JSON answer.
    ///
    /// # Errors
    ///
    /// Same classification as [`Transport::request`].
    pub async fn upload_file(
        &self,
        path: ResourcePath,
        form: MultipartForm,
    ) -> Result<serde_json::Value, ClassifiedError> {
        self.request(ApiRequest::post(path).multipart(form)).await
    }

    /// Fetches a body as raw bytes.
    ///
    /// # Errors
    ///
    /// Same classification as [`Transport::request`].
    pub async fn download_blob(&self, path: ResourcePath) -> Result<Bytes, ClassifiedError> {
        self.execute(ApiRequest::get(path)).await
    }

    /// Fetches a body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Same classification as [`Transport::request`]; a body that is not
    /// UTF-8 is `unknown`.
    pub async fn download_text(&self, path: ResourcePath) -> Result<String, ClassifiedError> {
        let body = self.download_blob(path).await?;
        String::from_utf8(body.to_vec())
            .map_err(|_| ClassifiedError::unknown("Response is not valid UTF-8 text"))
    }

    async fn execute(&self, request: ApiRequest) -> Result<Bytes, ClassifiedError> {
        let logical = request.path.to_string();
        let span = info_span!(
            "request",
            method = %request.method,
            path = %logical,
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let method = request.method.clone();
            let raw = RawRequest {
                method: request.method,
                target: self.target(&request.path),
                body: request.body,
            };

            let start = Instant::now();
            let result = self.backend.send(raw).await;
            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;
            tracing::Span::current().record("duration_ms", duration_ms);

            let outcome = match result {
                Ok(response) => {
                    tracing::Span::current().record("status", response.status.as_u16());
                    self.classify(&method, &logical, response)
                }
                Err(err) => Err(ClassifiedError::network(err.to_string())),
            };

            match &outcome {
                Ok(_) => {
                    tracing::Span::current().record("outcome", "ok");
                    tracing::debug!(duration_ms, "request complete");
                }
                Err(err) => {
                    tracing::Span::current().record("outcome", err.category.as_str());
                    tracing::warn!(category = %err.category, status = ?err.status, error = %err, "request failed");
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    fn classify(
        &self,
        method: &Method,
        logical: &str,
        response: RawResponse,
    ) -> Result<Bytes, ClassifiedError> {
        let status = response.status;
        if status == StatusCode::UNAUTHORIZED {
            self.overlay.trigger_auth_error();
            return Err(ClassifiedError::auth());
        }
        if status.is_success() {
            return Ok(response.body);
        }
        match extract_detail(&response.body) {
            Some(detail) => Err(ClassifiedError::server_detail(status.as_u16(), detail)),
            None => Err(ClassifiedError::server_generic(method, logical, status)),
        }
    }
}

/// The `detail` field of an error body, stringified when it is not a string.
fn extract_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
