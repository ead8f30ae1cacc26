//! Document-view operations beyond list and CRUD.

use bytes::Bytes;
use dhara_core::{Document, ValidationError};

use crate::api;
use crate::controller::{Documents, ListController};
use crate::error::ControllerError;
use crate::transport::{ApiRequest, FilePart, MultipartForm};

impl ListController<Documents> {
    /// Fetches one document by identifier.
    ///
    /// # Errors
    ///
    /// The classified failure of the request.
    pub async fn get(&self, id: &str) -> Result<Document, ControllerError> {
        let kind = self.kind();
        let body = self
            .session()
            .transport()
            .request(ApiRequest::get(api::document(&kind.db, &kind.col, id)))
            .await?;
        Ok(api::decode(body, "document")?)
    }

    /// Fetches every document of the collection.
    ///
    /// # Errors
    ///
    /// The classified failure of the request.
    pub async fn export(&self) -> Result<Vec<Document>, ControllerError> {
        let kind = self.kind();
        let body = self
            .session()
            .transport()
            .request(ApiRequest::get(api::export(&kind.db, &kind.col)))
            .await?;
        let export: api::ExportResponse = api::decode(body, "export")?;
        tracing::info!(db = %kind.db, col = %kind.col, count = export.documents.len(), "collection exported");
        Ok(export.documents)
    }

    /// The export as pretty JSON in the `{"documents": [...]}` envelope that
    /// [`ListController::import`] accepts.
    ///
    /// # Errors
    ///
    /// The classified failure of the request.
    pub async fn export_json(&self) -> Result<String, ControllerError> {
        let documents = self.export().await?;
        serde_json::to_string_pretty(&serde_json::json!({ "documents": documents }))
            .map_err(|e| crate::error::ClassifiedError::unknown(e.to_string()).into())
    }

    /// Uploads a `.json` file of documents, notifies with the imported
    /// count, and refetches.
    ///
    /// # Errors
    ///
    /// `ValidationError::NotJsonFile` for other file names (nothing is
    /// sent), or the classified failure.
    pub async fn import(&self, file_name: &str, data: Bytes) -> Result<u64, ControllerError> {
        if !file_name.to_lowercase().ends_with(".json") {
            return Err(ValidationError::NotJsonFile.into());
        }
        let kind = self.kind();
        let session = self.session();
        let mut part = FilePart::guessed(file_name, data);
        part.content_type = "application/json".to_string();
        let form = MultipartForm::default().file(part);

        match session
            .transport()
            .upload_file(api::import(&kind.db, &kind.col), form)
            .await
        {
            Ok(body) => {
                let server_message = api::message_of(&body);
                let decoded = api::decode::<api::ImportResponse>(body, "import");
                let message = match &decoded {
                    Ok(answer) => {
                        tracing::info!(db = %kind.db, col = %kind.col, count = answer.imported_count, "documents imported");
                        server_message.unwrap_or_else(|| {
                            format!("Imported {} documents successfully", answer.imported_count)
                        })
                    }
                    Err(err) => {
                        tracing::warn!(db = %kind.db, col = %kind.col, error = %err, "import answer unreadable");
                        server_message.unwrap_or_else(|| "Documents imported".to_string())
                    }
                };
                // The engine already applied the import, whatever its answer says.
                session.notifications().success(message);
                let _ = self.fetch().await;
                Ok(decoded?.imported_count)
            }
            Err(err) => {
                if !err.is_auth() {
                    session.notifications().error(err.message.clone());
                }
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::config::ClientConfig;
    use crate::session::Session;
    use crate::test_support::FnBackend;
    use crate::transport::{RawResponse, RequestBody};

    fn engine_answering_import(answer: serde_json::Value) -> FnBackend {
        FnBackend::new(move |req| {
            let path = dhara_core::ResourcePath::decode(&req.target).unwrap();
            match path.segments().last().map(String::as_str) {
                Some("import") => RawResponse::json(StatusCode::OK, &answer),
                _ => RawResponse::json(StatusCode::OK, &json!({"data": [], "total": 0})),
            }
        })
    }

    fn engine() -> FnBackend {
        FnBackend::new(|req| {
            let path = dhara_core::ResourcePath::decode(&req.target).unwrap();
            match path.segments().last().map(String::as_str) {
                Some("export") => RawResponse::json(
                    StatusCode::OK,
                    &json!({"documents": [{"_id": "1", "n": 1}, {"_id": "2", "n": 2}]}),
                ),
                Some("import") => RawResponse::json(
                    StatusCode::OK,
                    &json!({"message": "Imported 2 documents successfully", "imported_count": 2}),
                ),
                Some("query") => RawResponse::json(StatusCode::OK, &json!({"data": [], "total": 0})),
                Some(id) => RawResponse::json(StatusCode::OK, &json!({"_id": id, "n": 5})),
                None => RawResponse::json(StatusCode::NOT_FOUND, &json!({"detail": "Not Found"})),
            }
        })
    }

    #[tokio::test]
    async fn get_returns_document() {
        let session = Session::with_backend(ClientConfig::default(), Arc::new(engine()));
        let ctl = session.documents("shop", "users");
        let doc = ctl.get("65a1").await.unwrap();
        assert_eq!(doc["_id"], dhara_core::Value::from("65a1"));
    }

    #[tokio::test]
    async fn export_json_uses_import_envelope() {
        let session = Session::with_backend(ClientConfig::default(), Arc::new(engine()));
        let ctl = session.documents("shop", "users");
        let text = ctl.export_json().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["documents"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn import_rejects_non_json_locally() {
        let backend = engine();
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        let err = ctl.import("dump.csv", Bytes::from_static(b"a,b")).await.unwrap_err();
        assert_eq!(err.to_string(), "Only JSON files are supported");
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn import_notifies_count_and_refetches() {
        let backend = engine();
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        let count = ctl
            .import("dump.JSON", Bytes::from_static(br#"{"documents": [{}, {}]}"#))
            .await
            .unwrap();
        assert_eq!(count, 2);

        let sent = backend.requests();
        assert_eq!(sent.len(), 2);
        let RequestBody::Multipart(form) = &sent[0].body else {
            panic!("import must be multipart");
        };
        assert_eq!(form.files[0].field, "file");
        assert_eq!(form.files[0].file_name, "dump.JSON");
        let notes = session.notifications().snapshot();
        assert_eq!(notes[0].message, "Imported 2 documents successfully");
    }

    #[tokio::test]
    async fn unreadable_import_answer_still_notifies_and_refetches() {
        let backend = engine_answering_import(json!({"message": "Imported 3 documents"}));
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        let err = ctl
            .import("dump.json", Bytes::from_static(b"[]"))
            .await
            .unwrap_err();
        assert_eq!(
            err.classified().map(|c| c.category),
            Some(crate::error::ErrorCategory::Unknown)
        );

        assert_eq!(backend.requests().len(), 2);
        let notes = session.notifications().snapshot();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Imported 3 documents");
    }
}
