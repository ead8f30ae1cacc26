//! Session-failure overlay.
//!
//! Uses `ArcSwap` for lock-free reads of the current state and a `watch`
//! channel so front ends can react when it becomes visible. Once visible the
//! overlay stays up for the life of the session; a reload means a new
//! [`Session`](crate::Session).

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::error::ErrorCategory;

/// What the overlay currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub visible: bool,
    pub category: Option<ErrorCategory>,
    pub status: Option<u16>,
    pub detail: Option<String>,
}

/// Session-wide modal failure state.
#[derive(Debug)]
pub struct ErrorOverlay {
    state: ArcSwap<OverlayState>,
    changed: watch::Sender<bool>,
}

impl ErrorOverlay {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: ArcSwap::from_pointee(OverlayState::default()),
            changed: tx,
        }
    }

    /// Shows the overlay. The first trigger wins; later ones are ignored so
    /// the operator sees the failure that broke the session.
    ///
    /// Returns `true` if this call made the overlay visible.
    pub fn trigger(&self, category: ErrorCategory, status: Option<u16>, detail: Option<String>) -> bool {
        let next = Arc::new(OverlayState {
            visible: true,
            category: Some(category),
            status,
            detail,
        });
        let mut raised = false;
        self.state.rcu(|current| {
            raised = !current.visible;
            if raised {
                Arc::clone(&next)
            } else {
                Arc::clone(current)
            }
        });
        if !raised {
            return false;
        }
        tracing::warn!(%category, ?status, "session overlay raised");
        // Ignore send errors -- receivers may have been dropped
        let _ = self.changed.send(true);
        true
    }

    /// Raised by the transport on HTTP 401.
    pub fn trigger_auth_error(&self) -> bool {
        self.trigger(
            ErrorCategory::Auth,
            Some(401),
            Some("Your session is no longer authorized. Reload to sign in again.".to_string()),
        )
    }

    #[must_use]
    pub fn state(&self) -> OverlayState {
        OverlayState::clone(&self.state.load())
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.load().visible
    }

    /// Receiver that flips to `true` when the overlay becomes visible.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.changed.subscribe()
    }
}

impl Default for ErrorOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_hidden() {
        let overlay = ErrorOverlay::new();
        assert!(!overlay.is_visible());
        assert_eq!(overlay.state(), OverlayState::default());
    }

    #[test]
    fn auth_trigger_shows_overlay() {
        let overlay = ErrorOverlay::new();
        assert!(overlay.trigger_auth_error());
        let state = overlay.state();
        assert!(state.visible);
        assert_eq!(state.category, Some(ErrorCategory::Auth));
        assert_eq!(state.status, Some(401));
        assert!(state.detail.is_some());
    }

    #[test]
    fn first_trigger_wins() {
        let overlay = ErrorOverlay::new();
        assert!(overlay.trigger(ErrorCategory::Unknown, None, Some("boom".into())));
        assert!(!overlay.trigger_auth_error());
        let state = overlay.state();
        assert_eq!(state.category, Some(ErrorCategory::Unknown));
        assert_eq!(state.detail.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn subscribers_are_notified() {
        let overlay = ErrorOverlay::new();
        let mut rx = overlay.subscribe();
        assert!(!*rx.borrow());
        overlay.trigger_auth_error();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
