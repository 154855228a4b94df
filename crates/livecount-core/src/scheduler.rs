// ── Refresh scheduler ──
//
// One armed session per enable cycle: a tokio task that owns the refresh
// interval, the session's reconciler, and the in-flight queries. The
// session handle is a scoped acquisition: disarming it or dropping it
// cancels the task, so no exit path leaves a timer running.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use livecount_api::Row;
use tokio::sync::watch;
use tokio::task::{Id as TaskId, JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{PollConfig, PollerOptions};
use crate::error::CoreError;
use crate::executor::QueryExecutor;
use crate::params::{QueryParams, QueryRequest, ResolvedTarget};
use crate::reconcile::Reconciler;
use crate::state::{FetchOutcome, ObservedState};

/// Default refresh period.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);
/// Floor for configured periods; keeps a zero value from busy-looping.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Identifies one armed refresh session. Strictly increasing per poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub(crate) u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Channels a session publishes into. Owned by the poller, shared with
/// every session it arms.
pub(crate) struct Outputs {
    pub state: watch::Sender<ObservedState>,
    pub refresh_counter: watch::Sender<u64>,
}

// ── Session handle ───────────────────────────────────────────────

/// Handle to an armed refresh session.
pub(crate) struct Session {
    id: SessionId,
    cancel: CancellationToken,
    config_tx: watch::Sender<PollConfig>,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    /// Arm a new session: reset the counter, issue the first query, and
    /// start the refresh interval.
    pub(crate) fn arm<E: QueryExecutor>(
        id: SessionId,
        executor: Arc<E>,
        options: &PollerOptions,
        config: PollConfig,
        outputs: Arc<Outputs>,
    ) -> Self {
        let period = options.refresh_interval.max(MIN_REFRESH_INTERVAL);
        let cancel = CancellationToken::new();
        let (config_tx, config_rx) = watch::channel(config);

        let task = SessionTask::new(
            executor,
            options.endpoint_key.clone(),
            period,
            config_rx,
            outputs,
        );
        let handle = tokio::spawn(task.run(cancel.clone()));

        info!(%id, interval_secs = period.as_secs(), "refresh session armed");

        Self {
            id,
            cancel,
            config_tx,
            handle: Some(handle),
        }
    }

    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    /// Forward a config change. Only parameter-affecting changes wake the
    /// session; the timer keeps running either way.
    pub(crate) fn reconfigure(&self, config: PollConfig) {
        self.config_tx.send_if_modified(|current| {
            if current.query_differs(&config) {
                *current = config;
                true
            } else {
                false
            }
        });
    }

    /// Cancel the session and wait for its task to finish.
    ///
    /// Once this returns the session can no longer publish.
    pub(crate) async fn disarm(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!(id = %self.id, "refresh session panicked");
                }
            }
        }
        info!(id = %self.id, "refresh session disarmed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Session task ─────────────────────────────────────────────────

struct SessionTask<E: QueryExecutor> {
    executor: Arc<E>,
    endpoint_key: String,
    period: Duration,
    config_rx: watch::Receiver<PollConfig>,
    config: PollConfig,
    target: ResolvedTarget,
    outputs: Arc<Outputs>,
    reconciler: Reconciler,
    refresh_counter: u64,
    /// Tag of the most recently issued query.
    issued: u64,
    in_flight: JoinSet<Result<Vec<Row>, CoreError>>,
    tags: HashMap<TaskId, u64>,
}

impl<E: QueryExecutor> SessionTask<E> {
    fn new(
        executor: Arc<E>,
        endpoint_key: String,
        period: Duration,
        mut config_rx: watch::Receiver<PollConfig>,
        outputs: Arc<Outputs>,
    ) -> Self {
        let config = config_rx.borrow_and_update().clone();
        let target = ResolvedTarget::resolve(config.site.as_ref(), &endpoint_key);

        Self {
            executor,
            endpoint_key,
            period,
            config_rx,
            config,
            target,
            outputs,
            reconciler: Reconciler::new(),
            refresh_counter: 0,
            issued: 0,
            in_flight: JoinSet::new(),
            tags: HashMap::new(),
        }
    }

    async fn run(mut self, cancel: CancellationToken) {
        self.outputs.refresh_counter.send_replace(0);

        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.issue();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = self.config_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.apply_config();
                }
                _ = interval.tick() => {
                    self.refresh_counter += 1;
                    self.outputs.refresh_counter.send_replace(self.refresh_counter);
                    self.issue();
                }
                Some(joined) = self.in_flight.join_next_with_id(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok((id, result)) => {
                            if let Some(tag) = self.tags.remove(&id) {
                                self.apply_result(tag, result);
                            }
                        }
                        Err(e) => self.apply_join_error(&e),
                    }
                }
            }
        }

        self.in_flight.abort_all();
    }

    fn apply_config(&mut self) {
        let next = self.config_rx.borrow_and_update().clone();
        if next.site != self.config.site {
            self.target = ResolvedTarget::resolve(next.site.as_ref(), &self.endpoint_key);
            debug!(endpoint = %self.target.endpoint_url, "resolved new analytics target");
        }
        self.config = next;
        self.issue();
    }

    /// Issue a query for the current parameters and counter.
    ///
    /// The new query has no data yet, so a loading snapshot is reconciled
    /// right away.
    fn issue(&mut self) {
        self.issued += 1;
        let tag = self.issued;

        let params = QueryParams::build(&self.config, self.refresh_counter);
        debug!(
            site = %params.site_uuid,
            resource = params.resource_uuid.as_deref().unwrap_or("-"),
            refresh_counter = params.refresh_counter,
            "issuing active visitor query"
        );

        let request = QueryRequest::new(&self.target, params);
        let executor = Arc::clone(&self.executor);
        let handle = self
            .in_flight
            .spawn(async move { executor.execute(&request).await });
        self.tags.insert(handle.id(), tag);

        self.publish(&FetchOutcome::loading());
    }

    fn apply_result(&mut self, tag: u64, result: Result<Vec<Row>, CoreError>) {
        if tag < self.issued {
            trace!(tag, latest = self.issued, "discarding superseded query result");
            return;
        }

        if let Err(ref e) = result {
            warn!(error = %e, "active visitor query failed");
        }
        self.publish(&FetchOutcome::from_result(result));
    }

    /// A query task that died without a result. If it was the latest
    /// query, surface the failure so the state does not stay loading.
    fn apply_join_error(&mut self, err: &JoinError) {
        let tag = self.tags.remove(&err.id());
        if err.is_cancelled() {
            return;
        }
        warn!(error = %err, "active visitor query task failed");
        if let Some(tag) = tag {
            self.apply_result(
                tag,
                Err(CoreError::Internal(format!("query task failed: {err}"))),
            );
        }
    }

    fn publish(&mut self, outcome: &FetchOutcome) {
        let next = self.reconciler.reconcile(true, outcome);
        self.outputs.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
