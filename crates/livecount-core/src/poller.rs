// ── Poller facade ──
//
// Lifecycle management for one live visitor count: arms a refresh session
// when enabled, forwards parameter changes into it, and tears it down on
// disable or shutdown. Consumers read the reconciled state through a
// `watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::debug;

use crate::config::{PollConfig, PollerOptions};
use crate::executor::QueryExecutor;
use crate::scheduler::{Outputs, Session, SessionId};
use crate::state::ObservedState;
use crate::stream::StateStream;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<PollerInner>`. Dropping the last handle
/// cancels any armed session.
pub struct Poller<E: QueryExecutor> {
    inner: Arc<PollerInner<E>>,
}

struct PollerInner<E: QueryExecutor> {
    executor: Arc<E>,
    options: PollerOptions,
    outputs: Arc<Outputs>,
    lifecycle: Mutex<Lifecycle>,
    next_session: AtomicU64,
}

#[derive(Default)]
struct Lifecycle {
    config: PollConfig,
    session: Option<Session>,
}

impl<E: QueryExecutor> Clone for Poller<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: QueryExecutor> Poller<E> {
    /// Create a disabled poller. Call [`update()`](Self::update) with an
    /// enabled config to start polling.
    pub fn new(executor: E, options: PollerOptions) -> Self {
        let (state, _) = watch::channel(ObservedState::disabled());
        let (refresh_counter, _) = watch::channel(0);

        Self {
            inner: Arc::new(PollerInner {
                executor: Arc::new(executor),
                options,
                outputs: Arc::new(Outputs {
                    state,
                    refresh_counter,
                }),
                lifecycle: Mutex::new(Lifecycle::default()),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Apply a new configuration.
    ///
    /// - disabled → enabled: arms a fresh session (counter 0, no retained count)
    /// - enabled → disabled: cancels the session and publishes the disabled state
    /// - enabled → enabled: forwards the change without restarting the timer
    pub async fn update(&self, config: PollConfig) {
        let mut lifecycle = self.inner.lifecycle.lock().await;

        match (lifecycle.session.take(), config.enabled) {
            (None, true) => {
                lifecycle.session = Some(self.arm(config.clone()));
            }
            (Some(session), false) => {
                session.disarm().await;
                self.publish_disabled();
            }
            (Some(session), true) => {
                session.reconfigure(config.clone());
                lifecycle.session = Some(session);
            }
            (None, false) => {}
        }

        lifecycle.config = config;
    }

    /// Stop polling and wait for the session to wind down.
    ///
    /// The stored config keeps its other fields but is marked disabled.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Some(session) = lifecycle.session.take() {
            session.disarm().await;
        }
        lifecycle.config.enabled = false;
        self.publish_disabled();
        debug!("poller shut down");
    }

    fn arm(&self, config: PollConfig) -> Session {
        let id = SessionId(self.inner.next_session.fetch_add(1, Ordering::Relaxed));
        Session::arm(
            id,
            Arc::clone(&self.inner.executor),
            &self.inner.options,
            config,
            Arc::clone(&self.inner.outputs),
        )
    }

    fn publish_disabled(&self) {
        let disabled = ObservedState::disabled();
        self.inner.outputs.state.send_if_modified(|current| {
            if *current == disabled {
                false
            } else {
                *current = disabled;
                true
            }
        });
    }

    // ── State observation ────────────────────────────────────────

    /// The current observed state.
    pub fn state(&self) -> ObservedState {
        self.inner.outputs.state.borrow().clone()
    }

    /// Subscribe to observed state changes.
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.outputs.state.subscribe())
    }

    /// The refresh counter of the armed (or last armed) session.
    pub fn refresh_counter(&self) -> u64 {
        *self.inner.outputs.refresh_counter.borrow()
    }

    /// Identifier of the armed session, if polling.
    pub async fn session_id(&self) -> Option<SessionId> {
        self.inner
            .lifecycle
            .lock()
            .await
            .session
            .as_ref()
            .map(Session::id)
    }

    /// The most recently applied configuration.
    pub async fn config(&self) -> PollConfig {
        self.inner.lifecycle.lock().await.config.clone()
    }
}
