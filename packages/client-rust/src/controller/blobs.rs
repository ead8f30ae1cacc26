//! Blob-file view operations: upload, download, inline preview.

use bytes::Bytes;
use dhara_core::{Document, PreviewRejection};

use crate::api;
use crate::controller::{BlobFile, BlobFiles, FileUpload, ListController, RemovalPrompt, Row};
use crate::error::ControllerError;
use crate::transport::ApiRequest;

impl ListController<BlobFiles> {
    /// Uploads a file into the bucket, notifies, and refetches the list.
    ///
    /// # Errors
    ///
    /// `InvalidMetadata` when the metadata text is not JSON (nothing is
    /// sent), or the classified failure.
    pub async fn upload(&self, file: FileUpload) -> Result<api::UploadResponse, ControllerError> {
        let body = self.create(file).await?;
        Ok(api::decode(body, "upload")?)
    }

    /// Fetches one file record by identifier.
    ///
    /// # Errors
    ///
    /// The classified failure of the request.
    pub async fn metadata(&self, id: &str) -> Result<BlobFile, ControllerError> {
        let kind = self.kind();
        let body = self
            .session()
            .transport()
            .request(ApiRequest::get(api::file(&kind.db, &kind.bucket, id)))
            .await?;
        let doc: Document = api::decode(body, "file metadata")?;
        Ok(BlobFile(doc))
    }

    /// Downloads a file's content.
    ///
    /// # Errors
    ///
    /// The classified failure of the request.
    pub async fn download(&self, id: &str) -> Result<Bytes, ControllerError> {
        let kind = self.kind();
        Ok(self
            .session()
            .transport()
            .download_blob(api::file_download(&kind.db, &kind.bucket, id))
            .await?)
    }

    /// Downloads the latest file with the given name.
    ///
    /// # Errors
    ///
    /// The classified failure of the request.
    pub async fn download_by_name(&self, file_name: &str) -> Result<Bytes, ControllerError> {
        let kind = self.kind();
        Ok(self
            .session()
            .transport()
            .download_blob(api::filename_download(&kind.db, &kind.bucket, file_name))
            .await?)
    }

    /// Fetches a file's content as text for inline display.
    ///
    /// The extension and size are checked against the preview policy before
    /// the body is requested. A file not on the visible page is looked up
    /// first.
    ///
    /// # Errors
    ///
    /// `Preview` when the file is not eligible (the body is never fetched),
    /// or the classified failure.
    pub async fn view_inline(&self, id: &str) -> Result<String, ControllerError> {
        let file = match self.find(id) {
            Some(file) => file,
            None => self.metadata(id).await?,
        };
        let name = file.filename().unwrap_or_default();
        self.session()
            .config()
            .preview
            .check(name, file.length())
            .inspect_err(|rejection: &PreviewRejection| {
                tracing::debug!(id, %rejection, "inline preview refused");
            })?;

        let kind = self.kind();
        Ok(self
            .session()
            .transport()
            .download_text(api::file_download(&kind.db, &kind.bucket, id))
            .await?)
    }

    /// Opens the confirmation step for removing every file named
    /// `file_name`.
    #[must_use]
    pub fn request_removal_by_name(&self, file_name: impl Into<String>) -> RemovalPrompt<'_, BlobFiles> {
        let file_name = file_name.into();
        let kind = self.kind();
        let request = ApiRequest::delete(api::filename(&kind.db, &kind.bucket, &file_name));
        self.prompt(file_name, request)
    }

    /// Identifiers of the visible files, in page order.
    #[must_use]
    pub fn visible_ids(&self) -> Vec<String> {
        self.snapshot()
            .result
            .items
            .iter()
            .filter_map(Row::id)
            .collect()
    }
}
