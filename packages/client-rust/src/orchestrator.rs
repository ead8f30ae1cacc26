//! Mutation orchestration.
//!
//! Each [`MutationIntent`] moves `Pending -> Succeeded | Failed`. Success
//! posts a notification and refetches the owning controller; failure posts
//! the classified message (unless the overlay already shows it) and leaves
//! the editor open.

use dhara_core::{MutationIntent, MutationState};
use parking_lot::Mutex;

use crate::api;
use crate::controller::{ListController, ResourceKind};
use crate::error::ControllerError;
use crate::transport::ApiRequest;

/// Runs an intent against `controller`, building its request from the kind.
///
/// # Errors
///
/// Local validation failures (nothing sent, no notification) or the
/// classified request failure.
pub async fn execute<K: ResourceKind>(
    controller: &ListController<K>,
    intent: MutationIntent<K::Draft>,
) -> Result<serde_json::Value, ControllerError> {
    let outcome = Outcome::of::<K>(&intent);
    let request = match intent {
        MutationIntent::Create(draft) => controller.kind().create_request(draft)?,
        MutationIntent::Update { id, payload } => controller.kind().update_request(&id, payload)?,
        MutationIntent::Delete { id } => controller.kind().delete_request(&id),
    };
    send(controller, outcome, request).await
}

/// Runs an intent whose request was prepared by the caller, such as a
/// removal by file name.
///
/// # Errors
///
/// The classified request failure.
pub async fn execute_prepared<K: ResourceKind>(
    controller: &ListController<K>,
    intent: &MutationIntent<K::Draft>,
    request: ApiRequest,
) -> Result<serde_json::Value, ControllerError> {
    send(controller, Outcome::of::<K>(intent), request).await
}

/// How a resolved intent is reported.
struct Outcome {
    verb: &'static str,
    fallback: String,
    /// Deletions always name the identifier instead of echoing the engine.
    prefer_server: bool,
}

impl Outcome {
    fn of<K: ResourceKind>(intent: &MutationIntent<K::Draft>) -> Self {
        let verb = intent.verb();
        let fallback = match intent.target_id() {
            Some(id) => format!("{} '{id}' {verb}d", K::SINGULAR),
            None => format!("{} {verb}d", K::SINGULAR),
        };
        Self {
            verb,
            fallback,
            prefer_server: !matches!(intent, MutationIntent::Delete { .. }),
        }
    }

    fn message(self, body: &serde_json::Value) -> String {
        if self.prefer_server {
            api::message_of(body).unwrap_or(self.fallback)
        } else {
            self.fallback
        }
    }
}

async fn send<K: ResourceKind>(
    controller: &ListController<K>,
    outcome: Outcome,
    request: ApiRequest,
) -> Result<serde_json::Value, ControllerError> {
    let session = controller.session();
    let verb = outcome.verb;
    tracing::info!(kind = K::LABEL, verb, path = %request.path, "mutation pending");

    match session.transport().request(request).await {
        Ok(body) => {
            tracing::info!(kind = K::LABEL, verb, "mutation succeeded");
            session.notifications().success(outcome.message(&body));
            // A failed refetch reports itself; the mutation already happened.
            let _ = controller.fetch().await;
            Ok(body)
        }
        Err(err) => {
            tracing::info!(kind = K::LABEL, verb, error = %err, "mutation failed");
            if !err.is_auth() {
                session.notifications().error(err.message.clone());
            }
            Err(err.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// What the editor is editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit { id: String },
}

/// The editing surface of a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    Open {
        mode: EditorMode,
        text: String,
        /// Last validation or request failure, shown next to the text.
        error: Option<String>,
        /// State of the last submitted intent.
        mutation: Option<MutationState>,
    },
}

/// Drives create/update through an editor that stays open on failure.
#[derive(Debug)]
pub struct Editor<'a, K: ResourceKind> {
    controller: &'a ListController<K>,
    state: Mutex<EditorState>,
    last: Mutex<Option<MutationState>>,
}

impl<'a, K: ResourceKind> Editor<'a, K> {
    #[must_use]
    pub fn new(controller: &'a ListController<K>) -> Self {
        Self {
            controller,
            state: Mutex::new(EditorState::Closed),
            last: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        self.state.lock().clone()
    }

    /// State of the most recently submitted intent, kept after the editor
    /// closes.
    #[must_use]
    pub fn last_mutation(&self) -> Option<MutationState> {
        self.last.lock().clone()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !matches!(*self.state.lock(), EditorState::Closed)
    }

    pub fn open_create(&self, text: impl Into<String>) {
        self.open(EditorMode::Create, text.into());
    }

    pub fn open_edit(&self, id: impl Into<String>, text: impl Into<String>) {
        self.open(EditorMode::Edit { id: id.into() }, text.into());
    }

    fn open(&self, mode: EditorMode, text: String) {
        *self.state.lock() = EditorState::Open {
            mode,
            text,
            error: None,
            mutation: None,
        };
    }

    /// Replaces the text being edited. Ignored when closed.
    pub fn set_text(&self, new_text: impl Into<String>) {
        if let EditorState::Open { text, .. } = &mut *self.state.lock() {
            *text = new_text.into();
        }
    }

    pub fn close(&self) {
        *self.state.lock() = EditorState::Closed;
    }

    /// Parses the text and runs the intent.
    ///
    /// Closes on success; stays open with the error message otherwise.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the editor is closed, otherwise whatever
    /// [`execute`] returns.
    pub async fn submit(&self) -> Result<serde_json::Value, ControllerError> {
        let (mode, text) = match &*self.state.lock() {
            EditorState::Open { mode, text, .. } => (mode.clone(), text.clone()),
            EditorState::Closed => {
                return Err(ControllerError::Unsupported {
                    operation: "submit",
                    kind: K::LABEL,
                })
            }
        };

        let intent = match self.controller.kind().parse_draft(&text) {
            Ok(draft) => match mode {
                EditorMode::Create => MutationIntent::Create(draft),
                EditorMode::Edit { id } => MutationIntent::Update { id, payload: draft },
            },
            Err(err) => {
                self.fail(&err, false);
                return Err(err);
            }
        };

        self.set_mutation(MutationState::Pending);
        match execute(self.controller, intent).await {
            Ok(body) => {
                self.set_mutation(MutationState::Succeeded);
                self.close();
                Ok(body)
            }
            Err(err) => {
                self.fail(&err, !err.is_local());
                Err(err)
            }
        }
    }

    fn set_mutation(&self, next: MutationState) {
        *self.last.lock() = Some(next.clone());
        if let EditorState::Open { mutation, error, .. } = &mut *self.state.lock() {
            *mutation = Some(next);
            *error = None;
        }
    }

    fn fail(&self, err: &ControllerError, sent: bool) {
        if sent {
            *self.last.lock() = Some(MutationState::Failed(err.to_string()));
        }
        if let EditorState::Open { mutation, error, .. } = &mut *self.state.lock() {
            *error = Some(err.to_string());
            if sent {
                *mutation = Some(MutationState::Failed(err.to_string()));
            }
        }
    }
}
