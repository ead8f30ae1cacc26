//! List controllers.
//!
//! One [`ListController`] per open view. It owns the view's query state and
//! current [`ResultSet`], and applies a fetch response only when the fetch is
//! still the most recently issued one for this controller.

pub mod blobs;
pub mod documents;
pub mod kinds;

use dhara_core::{
    order_columns, InFlight, MutationIntent, QuerySnapshot, RequestGeneration, ResultSet,
    ViewCommand, ViewQuery,
};
use parking_lot::Mutex;

pub use kinds::{
    BlobFile, BlobFiles, Buckets, Collections, Databases, Documents, FileUpload, NamedItem,
    NewDatabase, ResourceKind, Row, NAME_FIELD,
};

use crate::error::{ClassifiedError, ControllerError};
use crate::orchestrator;
use crate::session::Session;
use crate::transport::ApiRequest;

/// Result of a fetch that completed without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response became the visible result.
    Applied { page: u32, total: u64 },
    /// A newer fetch was issued meanwhile; the response was dropped.
    Superseded,
}

/// Read-only copy of a view's state for rendering.
#[derive(Debug, Clone)]
pub struct ViewSnapshot<T> {
    pub query: QuerySnapshot,
    pub filter_text: String,
    pub total_pages: u32,
    pub result: ResultSet<T>,
    pub columns: Vec<String>,
    pub loading: bool,
    pub last_error: Option<ClassifiedError>,
    pub pending_removal: Option<String>,
}

#[derive(Debug)]
struct ViewState<T> {
    query: ViewQuery,
    result: ResultSet<T>,
    columns: Vec<String>,
    last_error: Option<ClassifiedError>,
    pending_removal: Option<String>,
}

/// Controller for one list view of resource kind `K`.
#[derive(Debug)]
pub struct ListController<K: ResourceKind> {
    kind: K,
    session: Session,
    state: Mutex<ViewState<K::Item>>,
    generation: RequestGeneration,
    in_flight: InFlight,
}

impl<K: ResourceKind> ListController<K> {
    #[must_use]
    pub fn new(kind: K, session: Session) -> Self {
        let page_size = kind.page_size(&session.config().page_sizes);
        let query = ViewQuery::new(kind.filter_policy(), page_size);
        Self {
            state: Mutex::new(ViewState {
                query,
                result: ResultSet::empty(page_size),
                columns: Vec::new(),
                last_error: None,
                pending_removal: None,
            }),
            kind,
            session,
            generation: RequestGeneration::new(),
            in_flight: InFlight::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &K {
        &self.kind
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `true` while any fetch of this controller is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_loading()
    }

    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot<K::Item> {
        let state = self.state.lock();
        ViewSnapshot {
            query: state.query.snapshot(),
            filter_text: state.query.filter_text().to_string(),
            total_pages: state.query.page().total_pages(),
            result: state.result.clone(),
            columns: state.columns.clone(),
            loading: self.in_flight.is_loading(),
            last_error: state.last_error.clone(),
            pending_removal: state.pending_removal.clone(),
        }
    }

    /// Looks up an item of the visible page by identifier.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<K::Item> {
        self.state
            .lock()
            .result
            .items
            .iter()
            .find(|item| item.id().as_deref() == Some(id))
            .cloned()
    }

    // -----------------------------------------------------------------------
    // Query transitions
    // -----------------------------------------------------------------------

    /// Applies a command and fetches.
    ///
    /// # Errors
    ///
    /// A refused command (nothing is sent) or the fetch failure.
    pub async fn dispatch(&self, command: ViewCommand) -> Result<FetchOutcome, ControllerError> {
        self.run_fetch(Some(&command)).await
    }

    /// # Errors
    ///
    /// See [`ListController::dispatch`].
    pub async fn set_filter(&self, text: impl Into<String>) -> Result<FetchOutcome, ControllerError> {
        self.dispatch(ViewCommand::SetFilter(text.into())).await
    }

    /// # Errors
    ///
    /// See [`ListController::dispatch`].
    pub async fn toggle_sort(&self, field: impl Into<String>) -> Result<FetchOutcome, ControllerError> {
        self.dispatch(ViewCommand::ToggleSort(field.into())).await
    }

    /// # Errors
    ///
    /// See [`ListController::dispatch`]. Pages outside `1..=total_pages`
    /// are refused.
    pub async fn goto_page(&self, page: u32) -> Result<FetchOutcome, ControllerError> {
        self.dispatch(ViewCommand::GotoPage(page)).await
    }

    /// Re-runs the current query.
    ///
    /// # Errors
    ///
    /// The classified failure of the request. A failure is reported once as
    /// a "Failed to fetch" notification (except `auth`, which the overlay
    /// already shows).
    pub async fn fetch(&self) -> Result<FetchOutcome, ControllerError> {
        self.run_fetch(None).await
    }

    async fn run_fetch(&self, command: Option<&ViewCommand>) -> Result<FetchOutcome, ControllerError> {
        let mut command = command;
        loop {
            // Command, ticket and snapshot are taken together so that a
            // response can never be matched against another command's query.
            let (ticket, query) = {
                let mut state = self.state.lock();
                if let Some(cmd) = command.take() {
                    state.query.apply(cmd)?;
                }
                (self.generation.issue(), state.query.snapshot())
            };
            let _loading = self.in_flight.begin();
            tracing::debug!(
                kind = K::LABEL,
                generation = ticket.value(),
                page = query.page,
                "fetch issued"
            );

            let request = self.kind.list_request(&query);
            let result = match self.session.transport().request(request).await {
                Ok(body) => self.kind.parse_list(body, &query),
                Err(err) => Err(err),
            };

            let mut state = self.state.lock();
            if !self.generation.is_current(ticket) {
                tracing::debug!(kind = K::LABEL, generation = ticket.value(), "stale response discarded");
                return Ok(FetchOutcome::Superseded);
            }

            match result {
                Ok(set) => {
                    if state.query.set_total(set.total) {
                        tracing::debug!(
                            kind = K::LABEL,
                            page = state.query.page().page(),
                            "page clamped, refetching"
                        );
                        continue;
                    }
                    let id_field = self.kind.id_field();
                    state.columns = order_columns(
                        set.items.iter().flat_map(|item| item.row().into_owned().into_keys()),
                        id_field,
                    );
                    let outcome = FetchOutcome::Applied {
                        page: set.page,
                        total: set.total,
                    };
                    state.result = set;
                    state.last_error = None;
                    return Ok(outcome);
                }
                Err(err) => {
                    state.last_error = Some(err.clone());
                    drop(state);
                    if !err.is_auth() {
                        self.session
                            .notifications()
                            .error(format!("Failed to fetch {}", K::LABEL));
                    }
                    return Err(err.into());
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Creates an item and refetches on success.
    ///
    /// # Errors
    ///
    /// Local validation (nothing sent) or the classified failure.
    pub async fn create(&self, draft: K::Draft) -> Result<serde_json::Value, ControllerError> {
        orchestrator::execute(self, MutationIntent::Create(draft)).await
    }

    /// Replaces an item and refetches on success.
    ///
    /// # Errors
    ///
    /// Local validation (nothing sent) or the classified failure.
    pub async fn update(&self, id: impl Into<String>, draft: K::Draft) -> Result<serde_json::Value, ControllerError> {
        orchestrator::execute(
            self,
            MutationIntent::Update {
                id: id.into(),
                payload: draft,
            },
        )
        .await
    }

    /// Opens the confirmation step of a removal.
    #[must_use]
    pub fn request_removal(&self, id: impl Into<String>) -> RemovalPrompt<'_, K> {
        let id = id.into();
        let request = self.kind.delete_request(&id);
        self.prompt(id, request)
    }

    pub(crate) fn prompt(&self, target: String, request: ApiRequest) -> RemovalPrompt<'_, K> {
        self.state.lock().pending_removal = Some(target.clone());
        RemovalPrompt {
            controller: self,
            target,
            request,
        }
    }

    /// Removes an item without a confirmation step.
    ///
    /// # Errors
    ///
    /// The classified failure; removing an id that no longer exists is a
    /// `server` error from the engine.
    pub async fn remove(&self, id: impl Into<String>) -> Result<serde_json::Value, ControllerError> {
        orchestrator::execute(self, MutationIntent::Delete { id: id.into() }).await
    }

    fn clear_pending(&self) {
        self.state.lock().pending_removal = None;
    }
}

/// The open confirmation step of a removal.
#[derive(Debug)]
#[must_use = "a removal prompt does nothing until confirmed or cancelled"]
pub struct RemovalPrompt<'a, K: ResourceKind> {
    controller: &'a ListController<K>,
    target: String,
    request: ApiRequest,
}

impl<K: ResourceKind> RemovalPrompt<'_, K> {
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Sends the removal, notifies with the removed identifier, refetches.
    ///
    /// # Errors
    ///
    /// The classified failure of the delete call.
    pub async fn confirm(self) -> Result<serde_json::Value, ControllerError> {
        self.controller.clear_pending();
        let intent = MutationIntent::Delete { id: self.target };
        orchestrator::execute_prepared(self.controller, &intent, self.request).await
    }

    /// Closes the prompt without sending anything.
    pub fn cancel(self) {
        self.controller.clear_pending();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ErrorCategory;
    use crate::notify::NotificationKind;
    use crate::test_support::{FnBackend, ScriptedBackend};
    use crate::transport::RawResponse;

    fn docs(n: usize, offset: usize) -> serde_json::Value {
        let items: Vec<_> = (0..n)
            .map(|i| json!({"_id": format!("d{}", offset + i), "name": "x", "age": i}))
            .collect();
        json!(items)
    }

    fn doc_page(n: usize, offset: usize, total: u64, page: u32) -> serde_json::Value {
        json!({"data": docs(n, offset), "total": total, "page": page, "page_size": 12})
    }

    #[tokio::test]
    async fn fetch_applies_result_and_columns() {
        let backend = FnBackend::new(|_| {
            RawResponse::json(
                StatusCode::OK,
                &json!({"data": [{"_id": "1", "userId": 7, "name": "a", "zip": 1, "age": 3}], "total": 1}),
            )
        });
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend));
        let ctl = session.documents("shop", "users");
        let outcome = ctl.fetch().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Applied { page: 1, total: 1 });
        let view = ctl.snapshot();
        assert_eq!(view.columns, vec!["_id", "userId", "name", "age", "zip"]);
        assert_eq!(view.total_pages, 1);
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn scenario_filter_page_one() {
        let backend = FnBackend::new(|_| {
            RawResponse::json(StatusCode::OK, &json!({"documents": docs(8, 0), "count": 8}))
        });
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        ctl.set_filter(r#"{"status":"active"}"#).await.unwrap();

        let sent = backend.requests();
        let path = dhara_core::ResourcePath::decode(&sent[0].target).unwrap();
        assert_eq!(path.query_string(), "page=1&page_size=12");
        assert_eq!(
            sent[0].body,
            crate::transport::RequestBody::Json(json!({"filter": {"status": "active"}}))
        );
        let view = ctl.snapshot();
        assert_eq!(view.result.items.len(), 8);
        assert_eq!(view.total_pages, 1);
        assert!(view.query.sort.is_none());
    }

    #[tokio::test]
    async fn scenario_sort_toggles_direction() {
        let backend = FnBackend::new(|_| RawResponse::json(StatusCode::OK, &doc_page(1, 0, 1, 1)));
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        ctl.toggle_sort("age").await.unwrap();
        ctl.toggle_sort("age").await.unwrap();

        let queries: Vec<String> = backend
            .requests()
            .iter()
            .map(|r| dhara_core::ResourcePath::decode(&r.target).unwrap().query_string())
            .collect();
        assert!(queries[0].ends_with("sort_field=age&sort_order=1"));
        assert!(queries[1].ends_with("sort_field=age&sort_order=-1"));
    }

    #[tokio::test]
    async fn invalid_filter_sends_nothing() {
        let backend = FnBackend::new(|_| RawResponse::json(StatusCode::OK, &doc_page(0, 0, 0, 1)));
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        let err = ctl.set_filter("{status: active}").await.unwrap_err();
        assert!(err.is_local());
        assert!(backend.requests().is_empty());
        assert!(session.notifications().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_page_is_refused() {
        let backend = FnBackend::new(|_| RawResponse::json(StatusCode::OK, &doc_page(12, 0, 24, 1)));
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        ctl.fetch().await.unwrap();
        assert!(matches!(
            ctl.goto_page(3).await,
            Err(ControllerError::Command(_))
        ));
        assert_eq!(backend.requests().len(), 1);
        ctl.goto_page(2).await.unwrap();
        assert_eq!(ctl.snapshot().query.page, 2);
    }

    #[tokio::test]
    async fn failed_fetch_notifies_once() {
        let backend = FnBackend::new(|_| {
            RawResponse::json(StatusCode::INTERNAL_SERVER_ERROR, &json!({"detail": "Failed to query documents"}))
        });
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend));
        let ctl = session.documents("shop", "users");
        let err = ctl.fetch().await.unwrap_err();
        assert_eq!(err.classified().unwrap().category, ErrorCategory::Server);
        let notes = session.notifications().snapshot();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Failed to fetch documents");
        assert_eq!(notes[0].kind, NotificationKind::Error);
        assert!(ctl.snapshot().last_error.is_some());
    }

    #[tokio::test]
    async fn scenario_unauthorized_raises_overlay_only() {
        let backend = FnBackend::new(|_| RawResponse::json(StatusCode::UNAUTHORIZED, &json!({})));
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend));
        let ctl = session.databases();
        let err = ctl.fetch().await.unwrap_err();
        assert!(err.classified().unwrap().is_auth());
        assert!(session.overlay().is_visible());
        assert_eq!(session.overlay().state().category, Some(ErrorCategory::Auth));
        assert!(session.notifications().is_empty());
    }

    #[tokio::test]
    async fn last_issued_fetch_wins_regardless_of_arrival() {
        let (backend, mut calls) = ScriptedBackend::new();
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend));
        let ctl = session.documents("shop", "users");

        let driver = async {
            // Initial load establishes three pages.
            let first = calls.next().await;
            first.respond_json(StatusCode::OK, &doc_page(12, 0, 36, 1));
            // Two overlapping page changes; answer the newest first.
            let page2 = calls.next().await;
            let page3 = calls.next().await;
            assert_eq!(page2.path().query_value("page"), Some("2"));
            assert_eq!(page3.path().query_value("page"), Some("3"));
            page3.respond_json(StatusCode::OK, &doc_page(12, 24, 36, 3));
            page2.respond_json(StatusCode::OK, &doc_page(12, 12, 36, 2));
        };
        let view = async {
            ctl.fetch().await.unwrap();
            let (a, b) = tokio::join!(ctl.goto_page(2), async {
                tokio::task::yield_now().await;
                ctl.goto_page(3).await
            });
            (a.unwrap(), b.unwrap())
        };
        let ((older, newer), ()) = tokio::join!(view, driver);

        assert_eq!(older, FetchOutcome::Superseded);
        assert_eq!(newer, FetchOutcome::Applied { page: 3, total: 36 });
        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.result.page, 3);
        assert_eq!(snapshot.result.items[0].id().as_deref(), Some("d24"));
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn stale_failure_is_discarded() {
        let (backend, mut calls) = ScriptedBackend::new();
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend));
        let ctl = session.documents("shop", "users");

        let driver = async {
            let old = calls.next().await;
            let new = calls.next().await;
            new.respond_json(StatusCode::OK, &doc_page(2, 0, 2, 1));
            old.fail_network("connection reset");
        };
        let view = async {
            tokio::join!(ctl.fetch(), async {
                tokio::task::yield_now().await;
                ctl.set_filter(r#"{"a": 1}"#).await
            })
        };
        let ((old, new), ()) = tokio::join!(view, driver);
        assert_eq!(old.unwrap(), FetchOutcome::Superseded);
        assert!(new.is_ok());
        assert!(session.notifications().is_empty());
        assert!(ctl.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn deleting_last_item_of_last_page_clamps() {
        // Page 3 of 25 items holds exactly one document.
        let deleted = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&deleted);
        let backend = FnBackend::new(move |req| {
            if req.method == http::Method::DELETE {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                return RawResponse::json(StatusCode::OK, &json!({"message": "Document with ID d24 deleted successfully"}));
            }
            let path = dhara_core::ResourcePath::decode(&req.target).unwrap();
            let page: u32 = path.query_value("page").unwrap().parse().unwrap();
            let total = if flag.load(std::sync::atomic::Ordering::SeqCst) { 24 } else { 25 };
            let start = (page as usize - 1) * 12;
            let count = (total as usize).saturating_sub(start).min(12);
            RawResponse::json(StatusCode::OK, &doc_page(count, start, total, page))
        });
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.documents("shop", "users");
        ctl.fetch().await.unwrap();
        ctl.goto_page(3).await.unwrap();
        assert_eq!(ctl.snapshot().result.items.len(), 1);

        let prompt = ctl.request_removal("d24");
        assert_eq!(ctl.snapshot().pending_removal.as_deref(), Some("d24"));
        prompt.confirm().await.unwrap();

        let view = ctl.snapshot();
        assert_eq!(view.query.page, 2);
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.result.items.len(), 12);
        assert!(view.pending_removal.is_none());
        let notes = session.notifications().snapshot();
        assert!(notes.iter().any(|n| n.message.contains("d24")));
    }

    #[tokio::test]
    async fn cancelled_removal_sends_nothing() {
        let backend = FnBackend::new(|_| RawResponse::json(StatusCode::OK, &json!({})));
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend.clone()));
        let ctl = session.collections("shop");
        let prompt = ctl.request_removal("orders");
        assert_eq!(prompt.target(), "orders");
        prompt.cancel();
        assert!(ctl.snapshot().pending_removal.is_none());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn removing_twice_is_a_server_error() {
        let removed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&removed);
        let backend = FnBackend::new(move |req| {
            if req.method != http::Method::DELETE {
                return RawResponse::json(StatusCode::OK, &json!({"data": [], "total": 0}));
            }
            if flag.swap(true, std::sync::atomic::Ordering::SeqCst) {
                RawResponse::json(StatusCode::NOT_FOUND, &json!({"detail": "Document not found"}))
            } else {
                RawResponse::json(StatusCode::OK, &json!({"message": "deleted"}))
            }
        });
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend));
        let ctl = session.documents("shop", "users");
        ctl.remove("d1").await.unwrap();
        let err = ctl.remove("d1").await.unwrap_err();
        let classified = err.classified().unwrap();
        assert_eq!(classified.category, ErrorCategory::Server);
        assert_eq!(classified.message, "Document not found");
    }

    // -----------------------------------------------------------------------
    // Any interleaving
    // -----------------------------------------------------------------------

    fn marked_page(marker: &str, page: u32) -> serde_json::Value {
        json!({"data": [{"_id": marker}], "total": 60, "page": page, "page_size": 12})
    }

    fn page_of(call: &crate::test_support::PendingCall) -> u32 {
        call.path()
            .query_value("page")
            .and_then(|p| p.parse().ok())
            .unwrap()
    }

    fn command_strategy() -> impl Strategy<Value = ViewCommand> {
        prop_oneof![
            (0u8..3).prop_map(|k| ViewCommand::SetFilter(format!(r#"{{"k": {k}}}"#))),
            prop::sample::select(vec!["age", "name"])
                .prop_map(|field| ViewCommand::ToggleSort(field.to_string())),
            (1u32..=5).prop_map(ViewCommand::GotoPage),
        ]
    }

    /// Issues `commands` in order, one fetch each, then answers the parked
    /// requests in `order`.
    async fn run_interleaving(commands: Vec<ViewCommand>, order: Vec<usize>) {
        let (backend, mut calls) = ScriptedBackend::new();
        let session = Session::with_backend(ClientConfig::default(), Arc::new(backend));
        let ctl = Arc::new(session.documents("shop", "users"));

        // Five pages of twelve, so every GotoPage(1..=5) is accepted.
        let load = tokio::task::spawn_local({
            let ctl = Arc::clone(&ctl);
            async move { ctl.fetch().await }
        });
        calls.next().await.respond_json(StatusCode::OK, &marked_page("load", 1));
        load.await.unwrap().unwrap();

        let mut tasks = Vec::new();
        let mut parked = Vec::new();
        for command in commands {
            let ctl = Arc::clone(&ctl);
            tasks.push(tokio::task::spawn_local(async move { ctl.dispatch(command).await }));
            parked.push(Some(calls.next().await));
        }
        let last = parked.len() - 1;
        let last_page = parked[last].as_ref().map(page_of).unwrap();

        for idx in order {
            let call = parked[idx].take().unwrap();
            let page = page_of(&call);
            call.respond_json(StatusCode::OK, &marked_page(&format!("r{idx}"), page));
        }

        for (idx, task) in tasks.into_iter().enumerate() {
            let outcome = task.await.unwrap().unwrap();
            if idx == last {
                assert_eq!(outcome, FetchOutcome::Applied { page: last_page, total: 60 });
            } else {
                assert_eq!(outcome, FetchOutcome::Superseded);
            }
        }
        let view = ctl.snapshot();
        assert_eq!(view.result.items[0].id(), Some(format!("r{last}")));
        assert_eq!(view.query.page, last_page);
        assert!(!view.loading);
        assert!(session.notifications().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn last_issued_query_wins_in_any_reply_order(
            (commands, order) in prop::collection::vec(command_strategy(), 1..6)
                .prop_flat_map(|commands| {
                    let n = commands.len();
                    (Just(commands), Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
                })
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let local = tokio::task::LocalSet::new();
            runtime.block_on(local.run_until(run_interleaving(commands, order)));
        }
    }
}
