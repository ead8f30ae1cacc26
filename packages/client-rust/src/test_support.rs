//! In-memory backends for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use dhara_core::ResourcePath;
use http::StatusCode;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::error::BackendError;
use crate::transport::{HttpBackend, RawRequest, RawResponse};

type Responder = Arc<dyn Fn(&RawRequest) -> RawResponse + Send + Sync>;

/// Answers every request synchronously through a closure and records it.
#[derive(Clone)]
pub(crate) struct FnBackend {
    responder: Option<Responder>,
    failure: Option<String>,
    requests: Arc<Mutex<Vec<RawRequest>>>,
}

impl FnBackend {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&RawRequest) -> RawResponse + Send + Sync + 'static,
    {
        Self {
            responder: Some(Arc::new(responder)),
            failure: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails every request before a response, like a refused connection.
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            responder: None,
            failure: Some(message.to_string()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn requests(&self) -> Vec<RawRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpBackend for FnBackend {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, BackendError> {
        self.requests.lock().push(request.clone());
        match (&self.responder, &self.failure) {
            (Some(responder), _) => Ok(responder(&request)),
            (None, Some(message)) => Err(BackendError::Connect(message.clone())),
            (None, None) => Err(BackendError::Request("no responder".to_string())),
        }
    }
}

/// Parks every request until the test answers it, in any order.
pub(crate) struct ScriptedBackend {
    calls: mpsc::UnboundedSender<PendingCall>,
}

/// Receiving side of a [`ScriptedBackend`].
pub(crate) struct CallQueue {
    calls: mpsc::UnboundedReceiver<PendingCall>,
}

/// One parked request.
pub(crate) struct PendingCall {
    pub(crate) request: RawRequest,
    reply: oneshot::Sender<Result<RawResponse, BackendError>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> (Self, CallQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { calls: tx }, CallQueue { calls: rx })
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, BackendError> {
        let (reply, answer) = oneshot::channel();
        self.calls
            .send(PendingCall { request, reply })
            .map_err(|_| BackendError::Request("script closed".to_string()))?;
        answer
            .await
            .map_err(|_| BackendError::Request("call dropped".to_string()))?
    }
}

impl CallQueue {
    pub(crate) async fn next(&mut self) -> PendingCall {
        match self.calls.recv().await {
            Some(call) => call,
            None => panic!("scripted backend dropped"),
        }
    }
}

impl PendingCall {
    /// The logical path of the parked request.
    pub(crate) fn path(&self) -> ResourcePath {
        match ResourcePath::decode(&self.request.target) {
            Ok(path) => path,
            Err(err) => panic!("undecodable target {}: {err}", self.request.target),
        }
    }

    pub(crate) fn respond_json(self, status: StatusCode, body: &serde_json::Value) {
        let _ = self.reply.send(Ok(RawResponse::json(status, body)));
    }

    pub(crate) fn fail_network(self, message: &str) {
        let _ = self.reply.send(Err(BackendError::Connect(message.to_string())));
    }
}
