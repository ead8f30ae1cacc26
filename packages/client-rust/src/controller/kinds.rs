//! Resource kinds: what differs between the five list views.
//!
//! A [`ResourceKind`] knows its endpoints, its filter policy, its page size
//! and how to turn a response envelope into a [`ResultSet`]. Everything else
//! (state, guard, notifications) lives in the generic controller.

use std::borrow::Cow;
use std::convert::Infallible;

use bytes::Bytes;
use dhara_core::intent::{parse_document, prepare_create, prepare_update};
use dhara_core::names::{validate_collection_name, validate_database_name};
use dhara_core::types::document_id;
use dhara_core::{
    Document, FilterPolicy, QuerySnapshot, ResultSet, ValidationError, Value, ID_FIELD,
};
use serde_json::json;

use crate::api;
use crate::config::PageSizes;
use crate::error::{ClassifiedError, ControllerError};
use crate::transport::{ApiRequest, FilePart, MultipartForm};

/// Key used for the single column of name lists.
pub const NAME_FIELD: &str = "name";

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A displayable list item.
pub trait Row {
    /// Key/value view used for column derivation and rendering.
    fn row(&self) -> Cow<'_, Document>;

    /// Identifier used in item paths.
    fn id(&self) -> Option<String>;
}

impl Row for Document {
    fn row(&self) -> Cow<'_, Document> {
        Cow::Borrowed(self)
    }

    fn id(&self) -> Option<String> {
        document_id(self)
    }
}

/// An item of a name list (database, collection, bucket).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedItem {
    pub name: String,
}

impl Row for NamedItem {
    fn row(&self) -> Cow<'_, Document> {
        let mut doc = Document::new();
        doc.insert(NAME_FIELD.to_string(), Value::String(self.name.clone()));
        Cow::Owned(doc)
    }

    fn id(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

/// A blob file record as listed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobFile(pub Document);

impl BlobFile {
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.0.get("filename").and_then(Value::as_str)
    }

    /// Size in bytes.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        self.0.get("length").and_then(Value::as_u64)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.0
            .get("contentType")
            .or_else(|| self.0.get("content_type"))
            .and_then(Value::as_str)
    }
}

impl Row for BlobFile {
    fn row(&self) -> Cow<'_, Document> {
        Cow::Borrowed(&self.0)
    }

    fn id(&self) -> Option<String> {
        document_id(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ResourceKind
// ---------------------------------------------------------------------------

/// Per-kind behaviour of a list controller.
pub trait ResourceKind: Send + Sync {
    type Item: Row + Clone + std::fmt::Debug + Send + Sync;
    /// What a create (or update) carries.
    type Draft: Send;

    /// Plural label, used in "Failed to fetch <label>".
    const LABEL: &'static str;
    /// Capitalised singular, used in success notifications.
    const SINGULAR: &'static str;

    fn filter_policy(&self) -> FilterPolicy;

    fn page_size(&self, sizes: &PageSizes) -> u32;

    /// Field shown first in the derived column order.
    fn id_field(&self) -> &'static str {
        ID_FIELD
    }

    fn list_request(&self, query: &QuerySnapshot) -> ApiRequest;

    /// Turns a list response into a result set.
    ///
    /// # Errors
    ///
    /// Returns an `unknown` error when the envelope has the wrong shape.
    fn parse_list(
        &self,
        body: serde_json::Value,
        query: &QuerySnapshot,
    ) -> Result<ResultSet<Self::Item>, ClassifiedError>;

    /// Parses editor text into a draft.
    ///
    /// # Errors
    ///
    /// `Unsupported` unless the kind is edited as text.
    fn parse_draft(&self, _text: &str) -> Result<Self::Draft, ControllerError> {
        Err(ControllerError::Unsupported {
            operation: "edit",
            kind: Self::LABEL,
        })
    }

    /// # Errors
    ///
    /// Local validation failures, or `Unsupported`.
    fn create_request(&self, draft: Self::Draft) -> Result<ApiRequest, ControllerError>;

    /// # Errors
    ///
    /// `Unsupported` unless the kind can be updated in place.
    fn update_request(&self, _id: &str, _draft: Self::Draft) -> Result<ApiRequest, ControllerError> {
        Err(ControllerError::Unsupported {
            operation: "update",
            kind: Self::LABEL,
        })
    }

    fn delete_request(&self, id: &str) -> ApiRequest;
}

fn named_page(
    names: Vec<String>,
    meta: &api::PageMeta,
    query: &QuerySnapshot,
) -> ResultSet<NamedItem> {
    let items: Vec<NamedItem> = names.into_iter().map(|name| NamedItem { name }).collect();
    ResultSet {
        total: meta.total.unwrap_or(items.len() as u64),
        page: meta.page.unwrap_or(query.page),
        page_size: meta.page_size.unwrap_or(query.page_size),
        items,
    }
}

// ---------------------------------------------------------------------------
// Databases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Databases;

/// A new database is created together with its first collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDatabase {
    pub name: String,
    pub first_collection: String,
}

impl ResourceKind for Databases {
    type Item = NamedItem;
    type Draft = NewDatabase;

    const LABEL: &'static str = "databases";
    const SINGULAR: &'static str = "Database";

    fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::NameSearch
    }

    fn page_size(&self, sizes: &PageSizes) -> u32 {
        sizes.databases
    }

    fn id_field(&self) -> &'static str {
        NAME_FIELD
    }

    fn list_request(&self, query: &QuerySnapshot) -> ApiRequest {
        ApiRequest::get(api::with_name_list(api::databases(), query, true))
    }

    fn parse_list(
        &self,
        body: serde_json::Value,
        query: &QuerySnapshot,
    ) -> Result<ResultSet<NamedItem>, ClassifiedError> {
        let list: api::DatabaseList = api::decode(body, "database list")?;
        Ok(named_page(list.databases, &list.meta, query))
    }

    fn create_request(&self, draft: NewDatabase) -> Result<ApiRequest, ControllerError> {
        let name = validate_database_name(&draft.name)?;
        let collection = validate_collection_name(&draft.first_collection)?;
        Ok(ApiRequest::post(
            api::database(&name).param("collection_name", collection),
        ))
    }

    fn delete_request(&self, id: &str) -> ApiRequest {
        ApiRequest::delete(api::database(id))
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Collections {
    pub db: String,
}

impl ResourceKind for Collections {
    type Item = NamedItem;
    type Draft = String;

    const LABEL: &'static str = "collections";
    const SINGULAR: &'static str = "Collection";

    fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::NameSearch
    }

    fn page_size(&self, sizes: &PageSizes) -> u32 {
        sizes.collections
    }

    fn id_field(&self) -> &'static str {
        NAME_FIELD
    }

    fn list_request(&self, query: &QuerySnapshot) -> ApiRequest {
        ApiRequest::get(api::with_name_list(api::collections(&self.db), query, true))
    }

    fn parse_list(
        &self,
        body: serde_json::Value,
        query: &QuerySnapshot,
    ) -> Result<ResultSet<NamedItem>, ClassifiedError> {
        let list: api::CollectionList = api::decode(body, "collection list")?;
        Ok(named_page(list.collections, &list.meta, query))
    }

    fn parse_draft(&self, text: &str) -> Result<String, ControllerError> {
        Ok(text.to_string())
    }

    fn create_request(&self, name: String) -> Result<ApiRequest, ControllerError> {
        let name = validate_collection_name(&name)?;
        Ok(ApiRequest::post(api::collection(&self.db, &name)))
    }

    fn delete_request(&self, id: &str) -> ApiRequest {
        ApiRequest::delete(api::collection(&self.db, id))
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Documents {
    pub db: String,
    pub col: String,
    policy: FilterPolicy,
}

impl Documents {
    /// A document view that refuses malformed filter text.
    #[must_use]
    pub fn new(db: impl Into<String>, col: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            col: col.into(),
            policy: FilterPolicy::Strict,
        }
    }

    /// A document view that treats malformed filter text as "no filter".
    #[must_use]
    pub fn lenient(db: impl Into<String>, col: impl Into<String>) -> Self {
        Self {
            policy: FilterPolicy::Lenient,
            ..Self::new(db, col)
        }
    }
}

impl ResourceKind for Documents {
    type Item = Document;
    type Draft = Document;

    const LABEL: &'static str = "documents";
    const SINGULAR: &'static str = "Document";

    fn filter_policy(&self) -> FilterPolicy {
        self.policy
    }

    fn page_size(&self, sizes: &PageSizes) -> u32 {
        sizes.documents
    }

    fn list_request(&self, query: &QuerySnapshot) -> ApiRequest {
        let body = query
            .filter
            .criteria()
            .map_or_else(|| json!({ "filter": {} }), dhara_core::QuerySpec::to_body);
        ApiRequest::post(api::with_paging(api::document_query(&self.db, &self.col), query))
            .json(body)
    }

    fn parse_list(
        &self,
        body: serde_json::Value,
        query: &QuerySnapshot,
    ) -> Result<ResultSet<Document>, ClassifiedError> {
        let set = match api::decode(body, "document query")? {
            api::DocumentQueryResponse::Paged {
                data,
                total,
                page,
                page_size,
            } => ResultSet {
                items: data,
                total,
                page: page.unwrap_or(query.page),
                page_size: page_size.unwrap_or(query.page_size),
            },
            api::DocumentQueryResponse::Counted { documents, count } => ResultSet {
                items: documents,
                total: count,
                page: query.page,
                page_size: query.page_size,
            },
        };
        Ok(set)
    }

    fn parse_draft(&self, text: &str) -> Result<Document, ControllerError> {
        Ok(parse_document(text)?)
    }

    fn create_request(&self, draft: Document) -> Result<ApiRequest, ControllerError> {
        let payload = prepare_create(draft);
        Ok(ApiRequest::post(api::documents(&self.db, &self.col)).json(json!({ "data": payload })))
    }

    fn update_request(&self, id: &str, draft: Document) -> Result<ApiRequest, ControllerError> {
        let payload = prepare_update(id, draft);
        Ok(ApiRequest::put(api::document(&self.db, &self.col, id)).json(json!({ "data": payload })))
    }

    fn delete_request(&self, id: &str) -> ApiRequest {
        ApiRequest::delete(api::document(&self.db, &self.col, id))
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// Buckets exist implicitly once a file is uploaded; they cannot be created.
#[derive(Debug, Clone)]
pub struct Buckets {
    pub db: String,
}

impl ResourceKind for Buckets {
    type Item = NamedItem;
    type Draft = Infallible;

    const LABEL: &'static str = "buckets";
    const SINGULAR: &'static str = "Bucket";

    fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::NameSearch
    }

    fn page_size(&self, sizes: &PageSizes) -> u32 {
        sizes.buckets
    }

    fn id_field(&self) -> &'static str {
        NAME_FIELD
    }

    fn list_request(&self, query: &QuerySnapshot) -> ApiRequest {
        ApiRequest::get(api::with_name_list(api::buckets(&self.db), query, false))
    }

    fn parse_list(
        &self,
        body: serde_json::Value,
        query: &QuerySnapshot,
    ) -> Result<ResultSet<NamedItem>, ClassifiedError> {
        let list: api::BucketList = api::decode(body, "bucket list")?;
        Ok(named_page(list.buckets, &list.meta, query))
    }

    fn create_request(&self, draft: Infallible) -> Result<ApiRequest, ControllerError> {
        match draft {}
    }

    fn delete_request(&self, id: &str) -> ApiRequest {
        ApiRequest::delete(api::bucket(&self.db, id))
    }
}

// ---------------------------------------------------------------------------
// Blob files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BlobFiles {
    pub db: String,
    pub bucket: String,
}

/// A file to upload into a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    /// Guessed from the file name when `None`.
    pub content_type: Option<String>,
    pub data: Bytes,
    /// JSON text; blank means `{}`.
    pub metadata: String,
}

impl FileUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            data: data.into(),
            metadata: "{}".to_string(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// Builds the multipart form, checking the metadata text first.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidMetadata` when the metadata is not JSON.
    pub fn into_form(self) -> Result<MultipartForm, ValidationError> {
        let metadata = if self.metadata.trim().is_empty() {
            "{}".to_string()
        } else {
            serde_json::from_str::<serde_json::Value>(&self.metadata)
                .map_err(|_| ValidationError::InvalidMetadata)?;
            self.metadata
        };
        let mut part = FilePart::guessed(self.file_name, self.data);
        if let Some(content_type) = self.content_type {
            part.content_type = content_type;
        }
        Ok(MultipartForm::default().file(part).text("metadata", metadata))
    }
}

impl ResourceKind for BlobFiles {
    type Item = BlobFile;
    type Draft = FileUpload;

    const LABEL: &'static str = "files";
    const SINGULAR: &'static str = "File";

    fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::NameSearch
    }

    fn page_size(&self, sizes: &PageSizes) -> u32 {
        sizes.files
    }

    fn list_request(&self, query: &QuerySnapshot) -> ApiRequest {
        ApiRequest::get(api::with_name_list(api::files(&self.db, &self.bucket), query, false))
    }

    fn parse_list(
        &self,
        body: serde_json::Value,
        query: &QuerySnapshot,
    ) -> Result<ResultSet<BlobFile>, ClassifiedError> {
        let list: api::FileList = api::decode(body, "file list")?;
        let items: Vec<BlobFile> = list.files.into_iter().map(BlobFile).collect();
        Ok(ResultSet {
            total: list.meta.total.unwrap_or(items.len() as u64),
            page: list.meta.page.unwrap_or(query.page),
            page_size: list.meta.page_size.unwrap_or(query.page_size),
            items,
        })
    }

    fn create_request(&self, draft: FileUpload) -> Result<ApiRequest, ControllerError> {
        let form = draft.into_form()?;
        Ok(ApiRequest::post(api::upload(&self.db, &self.bucket)).multipart(form))
    }

    fn delete_request(&self, id: &str) -> ApiRequest {
        ApiRequest::delete(api::file(&self.db, &self.bucket, id))
    }
}
