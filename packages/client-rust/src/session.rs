//! A console session: configuration plus the shared transport, notification
//! queue and overlay. Every controller created from a session shares them.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::controller::{
    BlobFiles, Buckets, Collections, Databases, Documents, ListController,
};
use crate::notify::NotificationQueue;
use crate::overlay::ErrorOverlay;
use crate::transport::{HttpBackend, ReqwestBackend, Transport};

#[derive(Debug)]
struct Shared {
    config: ClientConfig,
    transport: Transport,
    notifications: NotificationQueue,
    overlay: Arc<ErrorOverlay>,
}

/// Cheap-to-clone handle on one session's shared state.
#[derive(Debug, Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// A session talking to `config.base_url` over HTTP.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let backend = ReqwestBackend::new(config.base_url.clone(), config.bearer_token.clone());
        Self::with_backend(config, Arc::new(backend))
    }

    /// A session over any backend.
    #[must_use]
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn HttpBackend>) -> Self {
        let overlay = Arc::new(ErrorOverlay::new());
        let transport = Transport::new(backend, Arc::clone(&overlay), config.encode_paths);
        let notifications = NotificationQueue::new(config.notification_ttl);
        tracing::debug!(base_url = %config.base_url, encode_paths = config.encode_paths, "session created");
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                notifications,
                overlay,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.shared.transport
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationQueue {
        &self.shared.notifications
    }

    #[must_use]
    pub fn overlay(&self) -> &ErrorOverlay {
        &self.shared.overlay
    }

    // -----------------------------------------------------------------------
    // Controllers
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn databases(&self) -> ListController<Databases> {
        ListController::new(Databases, self.clone())
    }

    #[must_use]
    pub fn collections(&self, db: impl Into<String>) -> ListController<Collections> {
        ListController::new(Collections { db: db.into() }, self.clone())
    }

    #[must_use]
    pub fn documents(&self, db: impl Into<String>, col: impl Into<String>) -> ListController<Documents> {
        ListController::new(Documents::new(db, col), self.clone())
    }

    #[must_use]
    pub fn buckets(&self, db: impl Into<String>) -> ListController<Buckets> {
        ListController::new(Buckets { db: db.into() }, self.clone())
    }

    #[must_use]
    pub fn files(&self, db: impl Into<String>, bucket: impl Into<String>) -> ListController<BlobFiles> {
        ListController::new(
            BlobFiles {
                db: db.into(),
                bucket: bucket.into(),
            },
            self.clone(),
        )
    }
}
