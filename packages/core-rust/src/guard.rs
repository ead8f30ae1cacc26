//! Result-application guard and loading counter.
//!
//! [`RequestGeneration`] decides *which* response may update a view: every
//! fetch takes a [`Ticket`] when it is issued and only the holder of the
//! latest ticket may apply its result. [`InFlight`] answers a different
//! question, whether *any* request is still pending, and is what a loading
//! indicator reads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generation stamp captured when a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic per-view request counter.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

impl RequestGeneration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the generation and returns the new ticket.
    ///
    /// Any ticket issued earlier stops being current.
    pub fn issue(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the latest one issued.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }

    /// The latest generation issued (0 before the first fetch).
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Counter of requests that have been issued but not yet settled.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    count: Arc<AtomicU64>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one request as pending until the returned guard is dropped.
    #[must_use]
    pub fn begin(&self) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            count: Arc::clone(&self.count),
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.count() > 0
    }
}

/// RAII guard that settles one pending request on drop.
///
/// Dropped on every exit path of the request, including errors and
/// cancelled futures.
#[derive(Debug)]
pub struct InFlightGuard {
    count: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_ticket_is_current() {
        let generation = RequestGeneration::new();
        assert_eq!(generation.current(), 0);

        let first = generation.issue();
        assert!(generation.is_current(first));

        let second = generation.issue();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn in_flight_guard_increments_and_decrements() {
        let in_flight = InFlight::new();
        assert!(!in_flight.is_loading());

        let a = in_flight.begin();
        let b = in_flight.begin();
        assert_eq!(in_flight.count(), 2);

        drop(a);
        assert_eq!(in_flight.count(), 1);
        assert!(in_flight.is_loading());

        drop(b);
        assert_eq!(in_flight.count(), 0);
    }

    #[test]
    fn clones_share_the_counter() {
        let in_flight = InFlight::new();
        let view = in_flight.clone();
        let _guard = in_flight.begin();
        assert_eq!(view.count(), 1);
    }
}
