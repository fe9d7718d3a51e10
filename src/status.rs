//! Shared connection-status counter.
//!
//! [`ConnectionStatus`] counts transport connections that are currently
//! open. Every subscription to a message stream increments it once when
//! its transport opens and decrements it once when that transport closes,
//! fails, or is abandoned.
//!
//! # Pairing
//!
//! An increment hands out an [`OpenGuard`]; the matching decrement happens
//! when that guard is dropped. A [`Lifecycle`] holds at most one guard per
//! transport connection, so a transport that reports both an error and a
//! close only decrements once.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::watch;
use tracing::trace;

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Number of currently open transport connections.
///
/// Cloning is cheap and every clone observes the same counter. Observers
/// always start from the current value; intermediate values may be
/// coalesced for observers that fall behind.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    tx: Arc<watch::Sender<usize>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatus {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Returns the current value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> usize {
        *self.tx.borrow()
    }

    /// Returns a watch receiver positioned at the current value.
    ///
    /// Use [`watch::Receiver::changed`] or [`watch::Receiver::wait_for`]
    /// to follow updates.
    #[inline]
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<usize> {
        self.tx.subscribe()
    }

    /// Returns a stream yielding the current value, then every change.
    ///
    /// The stream never ends while any clone of this counter is alive.
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, usize> {
        stream::unfold((self.watch(), true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let value = *rx.borrow_and_update();
            Some((value, (rx, false)))
        })
        .boxed()
    }

    /// Records an open transition.
    ///
    /// The returned guard undoes it when dropped.
    pub(crate) fn open(&self) -> OpenGuard {
        self.tx.send_modify(|count| *count += 1);
        trace!(value = self.get(), "Connection status incremented");
        OpenGuard {
            status: self.clone(),
        }
    }

    fn close(&self) {
        self.tx.send_modify(|count| {
            debug_assert!(*count > 0, "decrement without matching increment");
            *count = count.saturating_sub(1);
        });
        trace!(value = self.get(), "Connection status decremented");
    }
}

// ============================================================================
// OpenGuard
// ============================================================================

/// One recorded open transition.
///
/// Dropping the guard records the matching close.
#[derive(Debug)]
#[must_use = "dropping the guard immediately records the close"]
pub(crate) struct OpenGuard {
    status: ConnectionStatus,
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.status.close();
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Open/closed state of a single transport connection.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    guard: Option<OpenGuard>,
}

impl Lifecycle {
    /// Creates a lifecycle in the not-yet-open state.
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records the open transition.
    ///
    /// Returns `false` if the connection was already open.
    pub(crate) fn opened(&mut self, status: &ConnectionStatus) -> bool {
        if self.guard.is_some() {
            return false;
        }
        self.guard = Some(status.open());
        true
    }

    /// Records the open-to-closed transition.
    ///
    /// Returns `false` if there was nothing to close.
    pub(crate) fn closed(&mut self) -> bool {
        self.guard.take().is_some()
    }

    /// Returns `true` between open and close.
    #[inline]
    pub(crate) fn is_open(&self) -> bool {
        self.guard.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_starts_at_zero() {
        let status = ConnectionStatus::new();
        assert_eq!(status.get(), 0);
        assert_eq!(*status.watch().borrow(), 0);
    }

    #[test]
    fn test_guard_pairs_increment_and_decrement() {
        let status = ConnectionStatus::new();
        let guard = status.open();
        assert_eq!(status.get(), 1);
        drop(guard);
        assert_eq!(status.get(), 0);
    }

    #[test]
    fn test_clones_share_value() {
        let status = ConnectionStatus::new();
        let other = status.clone();
        let _guard = status.open();
        assert_eq!(other.get(), 1);
    }

    #[test]
    fn test_lifecycle_closes_once() {
        let status = ConnectionStatus::new();
        let mut lifecycle = Lifecycle::new();

        assert!(lifecycle.opened(&status));
        assert!(lifecycle.is_open());
        assert_eq!(status.get(), 1);

        assert!(lifecycle.closed());
        assert!(!lifecycle.closed());
        assert_eq!(status.get(), 0);
    }

    #[test]
    fn test_lifecycle_close_before_open_is_noop() {
        let status = ConnectionStatus::new();
        let mut lifecycle = Lifecycle::new();
        assert!(!lifecycle.closed());
        assert_eq!(status.get(), 0);
    }

    #[test]
    fn test_dropping_open_lifecycle_decrements() {
        let status = ConnectionStatus::new();
        let mut lifecycle = Lifecycle::new();
        lifecycle.opened(&status);
        drop(lifecycle);
        assert_eq!(status.get(), 0);
    }

    #[tokio::test]
    async fn test_stream_yields_current_then_changes() {
        let status = ConnectionStatus::new();
        let first = status.open();
        let mut values = status.stream();

        assert_eq!(values.next().await, Some(1));

        let second = status.open();
        assert_eq!(values.next().await, Some(2));

        drop(second);
        assert_eq!(values.next().await, Some(1));
        drop(first);
        assert_eq!(values.next().await, Some(0));
    }

    #[tokio::test]
    async fn test_late_observer_sees_latest() {
        let status = ConnectionStatus::new();
        let _a = status.open();
        let _b = status.open();

        let mut values = status.stream();
        assert_eq!(values.next().await, Some(2));
    }

    #[derive(Debug, Clone, Copy)]
    enum Event {
        Open(usize),
        Error(usize),
        Close(usize),
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (0..4usize).prop_map(Event::Open),
            (0..4usize).prop_map(Event::Error),
            (0..4usize).prop_map(Event::Close),
        ]
    }

    proptest! {
        #[test]
        fn status_equals_opens_minus_guarded_closes(
            events in proptest::collection::vec(event(), 0..64)
        ) {
            let status = ConnectionStatus::new();
            let mut connections: Vec<Lifecycle> = (0..4).map(|_| Lifecycle::new()).collect();
            let mut open = [false; 4];
            let mut expected: usize = 0;

            for event in events {
                match event {
                    Event::Open(i) => {
                        connections[i].opened(&status);
                        if !open[i] {
                            open[i] = true;
                            expected += 1;
                        }
                    }
                    Event::Error(i) | Event::Close(i) => {
                        connections[i].closed();
                        if open[i] {
                            open[i] = false;
                            expected -= 1;
                        }
                    }
                }
                prop_assert_eq!(status.get(), expected);
            }

            drop(connections);
            prop_assert_eq!(status.get(), 0);
        }
    }
}
