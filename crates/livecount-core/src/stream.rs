// ── Reactive state stream ──
//
// Subscription type for consuming observed-state changes from a Poller.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::ObservedState;

/// A subscription to a poller's observed state.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
/// Only real changes of the `{count, loading, error}` triple wake it.
pub struct StateStream {
    current: ObservedState,
    receiver: watch::Receiver<ObservedState>,
}

impl StateStream {
    pub(crate) fn new(receiver: watch::Receiver<ObservedState>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &ObservedState {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> ObservedState {
        self.receiver.borrow().clone()
    }

    /// True if a change has been published that `changed()` has not yet seen.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the poller has been dropped.
    pub async fn changed(&mut self) -> Option<ObservedState> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current state first, then every change.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StateWatchStream {
    inner: WatchStream<ObservedState>,
}

impl Stream for StateWatchStream {
    type Item = ObservedState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn changed_tracks_published_state() {
        let (tx, rx) = watch::channel(ObservedState::disabled());
        let mut stream = StateStream::new(rx);
        assert_eq!(stream.current(), &ObservedState::disabled());

        tx.send_replace(ObservedState {
            active_visitors: 5,
            is_loading: false,
            error: None,
        });

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.active_visitors, 5);
        assert_eq!(stream.current().active_visitors, 5);
        assert!(!stream.has_changed());
    }

    #[tokio::test]
    async fn changed_returns_none_when_sender_dropped() {
        let (tx, rx) = watch::channel(ObservedState::disabled());
        let mut stream = StateStream::new(rx);
        drop(tx);
        assert!(stream.changed().await.is_none());
    }

    #[tokio::test]
    async fn into_stream_yields_current_then_changes() {
        let (tx, rx) = watch::channel(ObservedState::disabled());
        let mut stream = StateStream::new(rx).into_stream();

        assert_eq!(stream.next().await, Some(ObservedState::disabled()));

        tx.send_replace(ObservedState {
            active_visitors: 1,
            is_loading: false,
            error: None,
        });
        assert_eq!(stream.next().await.map(|s| s.active_visitors), Some(1));
    }
}
