//! Transient operator notifications.
//!
//! The queue is append-only: every `add` creates a new entry with a fresh id,
//! even for identical messages. Entries leave the queue after the display
//! window or on `remove`, whichever comes first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: SystemTime,
}

/// Queue changes, for consumers that render as they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Added(Notification),
    Removed(u64),
}

#[derive(Debug)]
struct Entry {
    notification: Notification,
    expires_at: Instant,
}

type Entries = Arc<Mutex<Vec<Entry>>>;

/// Session-wide notification queue.
#[derive(Debug)]
pub struct NotificationQueue {
    entries: Entries,
    next_id: AtomicU64,
    ttl: Duration,
    events: broadcast::Sender<NotificationEvent>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let (events, _rx) = broadcast::channel(64);
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            ttl,
            events,
        }
    }

    /// Appends a notification and schedules its removal.
    ///
    /// Removal is scheduled on the current tokio runtime when there is one;
    /// expired entries are also pruned on every add and read.
    pub fn add(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = Notification {
            id,
            message: message.into(),
            kind,
            created_at: SystemTime::now(),
        };
        tracing::debug!(id, ?kind, message = %notification.message, "notification added");

        {
            let mut entries = self.entries.lock();
            self.prune(&mut entries);
            entries.push(Entry {
                notification: notification.clone(),
                expires_at: Instant::now() + self.ttl,
            });
        }
        let _ = self.events.send(NotificationEvent::Added(notification));

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let entries = Arc::downgrade(&self.entries);
            let events = self.events.clone();
            let ttl = self.ttl;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                expire(&entries, &events, id);
            });
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.add(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.add(message, NotificationKind::Error)
    }

    /// Dismisses a notification. Unknown or already removed ids are ignored.
    pub fn remove(&self, id: u64) {
        remove_entry(&self.entries, &self.events, id);
    }

    /// Live notifications, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        let mut entries = self.entries.lock();
        self.prune(&mut entries);
        entries.iter().map(|e| e.notification.clone()).collect()
    }

    /// Drains every live notification, for one-shot front ends.
    pub fn take_all(&self) -> Vec<Notification> {
        let now = Instant::now();
        std::mem::take(&mut *self.entries.lock())
            .into_iter()
            .filter(|e| e.expires_at > now)
            .map(|e| e.notification)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops entries past their window, reporting each removal.
    fn prune(&self, entries: &mut Vec<Entry>) {
        let now = Instant::now();
        entries.retain(|e| {
            let live = e.expires_at > now;
            if !live {
                let _ = self.events.send(NotificationEvent::Removed(e.notification.id));
            }
            live
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }
}

fn expire(entries: &Weak<Mutex<Vec<Entry>>>, events: &broadcast::Sender<NotificationEvent>, id: u64) {
    if let Some(entries) = entries.upgrade() {
        remove_entry(&entries, events, id);
    }
}

fn remove_entry(entries: &Entries, events: &broadcast::Sender<NotificationEvent>, id: u64) {
    let removed = {
        let mut guard = entries.lock();
        let before = guard.len();
        guard.retain(|e| e.notification.id != id);
        guard.len() != before
    };
    if removed {
        let _ = events.send(NotificationEvent::Removed(id));
    }
}
