// ── Query-execution seam ──
//
// The poller only needs "run this query, give me rows or an error".
// `AnalyticsClient` provides the HTTP implementation; anything else
// (tests, an in-process backend) can stand in.

use std::future::Future;
use std::sync::Arc;

use livecount_api::{AnalyticsClient, Row};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::params::QueryRequest;

/// Executes one active-visitor query.
///
/// Called once per issued query. The poller may have several calls in
/// flight; results of superseded calls are discarded by the poller, so
/// implementations need not cancel them.
pub trait QueryExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<Vec<Row>, CoreError>> + Send;
}

impl<E: QueryExecutor> QueryExecutor for Arc<E> {
    fn execute(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<Vec<Row>, CoreError>> + Send {
        (**self).execute(request)
    }
}

impl QueryExecutor for AnalyticsClient {
    async fn execute(&self, request: &QueryRequest) -> Result<Vec<Row>, CoreError> {
        let resp = self
            .query_pipe(&request.endpoint_url, &request.token, &request.params)
            .await
            .inspect_err(|e| {
                if e.is_auth_failure() {
                    warn!(endpoint = %request.endpoint_url, "read token rejected");
                } else if e.is_transient() {
                    debug!(status = ?e.status(), "transient pipe failure, next refresh retries");
                }
            })?;

        debug!(
            rows = resp.data.len(),
            refresh_counter = request.params.refresh_counter,
            elapsed = ?resp.statistics.as_ref().map(|s| s.elapsed),
            "pipe query complete"
        );

        Ok(resp.data)
    }
}
