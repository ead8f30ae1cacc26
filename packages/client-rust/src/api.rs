//! Engine API paths and response envelopes.

use dhara_core::{Document, QuerySnapshot, ResourcePath};
use serde::Deserialize;

use crate::error::ClassifiedError;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[must_use]
pub fn databases() -> ResourcePath {
    ResourcePath::root().segment("db")
}

#[must_use]
pub fn database(db: &str) -> ResourcePath {
    databases().segment(db)
}

#[must_use]
pub fn collections(db: &str) -> ResourcePath {
    database(db).segment("col")
}

#[must_use]
pub fn collection(db: &str, col: &str) -> ResourcePath {
    collections(db).segment(col)
}

#[must_use]
pub fn documents(db: &str, col: &str) -> ResourcePath {
    collection(db, col).segment("doc")
}

#[must_use]
pub fn document(db: &str, col: &str, id: &str) -> ResourcePath {
    documents(db, col).segment(id)
}

#[must_use]
pub fn document_query(db: &str, col: &str) -> ResourcePath {
    documents(db, col).segment("query")
}

#[must_use]
pub fn export(db: &str, col: &str) -> ResourcePath {
    collection(db, col).segment("export")
}

#[must_use]
pub fn import(db: &str, col: &str) -> ResourcePath {
    collection(db, col).segment("import")
}

fn gridfs(db: &str) -> ResourcePath {
    database(db).segment("gridfs")
}

#[must_use]
pub fn buckets(db: &str) -> ResourcePath {
    gridfs(db).segment("buckets")
}

#[must_use]
pub fn bucket(db: &str, bucket: &str) -> ResourcePath {
    gridfs(db).segment(bucket)
}

#[must_use]
pub fn upload(db: &str, bucket_name: &str) -> ResourcePath {
    bucket(db, bucket_name).segment("upload")
}

#[must_use]
pub fn files(db: &str, bucket_name: &str) -> ResourcePath {
    bucket(db, bucket_name).segment("files")
}

#[must_use]
pub fn file(db: &str, bucket_name: &str, id: &str) -> ResourcePath {
    bucket(db, bucket_name).segment("file").segment(id)
}

#[must_use]
pub fn file_download(db: &str, bucket_name: &str, id: &str) -> ResourcePath {
    file(db, bucket_name, id).segment("download")
}

#[must_use]
pub fn filename(db: &str, bucket_name: &str, name: &str) -> ResourcePath {
    bucket(db, bucket_name).segment("filename").segment(name)
}

#[must_use]
pub fn filename_download(db: &str, bucket_name: &str, name: &str) -> ResourcePath {
    filename(db, bucket_name, name).segment("download")
}

// ---------------------------------------------------------------------------
// List parameters
// ---------------------------------------------------------------------------

/// `page`, `page_size`, then `sort_field`/`sort_order` when sorting.
#[must_use]
pub fn with_paging(path: ResourcePath, query: &QuerySnapshot) -> ResourcePath {
    let path = path
        .param("page", query.page)
        .param("page_size", query.page_size);
    match &query.sort {
        Some(sort) => path
            .param("sort_field", &sort.field)
            .param("sort_order", sort.direction.order()),
        None => path,
    }
}

/// Name-list parameters: `search` when non-blank, `sort=asc|desc` when the
/// list can be sorted by name, then the paging parameters.
#[must_use]
pub fn with_name_list(path: ResourcePath, query: &QuerySnapshot, sortable: bool) -> ResourcePath {
    let path = path.param_opt("search", query.filter.search());
    let path = match (&query.sort, sortable) {
        (Some(sort), true) => path.param("sort", sort.direction.as_str()),
        _ => path,
    };
    with_paging(path, query)
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Fields shared by every paged list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseList {
    pub databases: Vec<String>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionList {
    pub collections: Vec<String>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketList {
    pub buckets: Vec<String>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileList {
    pub files: Vec<Document>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// The document query answers in one of two documented shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentQueryResponse {
    Paged {
        data: Vec<Document>,
        total: u64,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        page_size: Option<u32>,
    },
    Counted {
        documents: Vec<Document>,
        count: u64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportResponse {
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub file_id: String,
    #[serde(default)]
    pub bucket_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub imported_count: u64,
}

/// Decodes a response body into an envelope; shape mismatches are `unknown`.
///
/// # Errors
///
/// Returns `ClassifiedError::unknown` naming what was expected.
pub fn decode<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<T, ClassifiedError> {
    serde_json::from_value(value)
        .map_err(|e| ClassifiedError::unknown(format!("Unexpected {what} response: {e}")))
}

/// The `message` of a mutation answer, if any. Never fails.
#[must_use]
pub fn message_of(value: &serde_json::Value) -> Option<String> {
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
