// ── Fetch outcomes and observed state ──

use std::sync::Arc;

use livecount_api::Row;

use crate::error::CoreError;

const ACTIVE_VISITORS_FIELD: &str = "active_visitors";

/// Snapshot of one query-execution client call.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Result rows, `None` while loading or after a failure.
    pub rows: Option<Vec<Row>>,
    pub is_loading: bool,
    pub error: Option<Arc<CoreError>>,
}

impl FetchOutcome {
    /// A query that has been issued but has not resolved.
    pub fn loading() -> Self {
        Self {
            rows: None,
            is_loading: true,
            error: None,
        }
    }

    /// A resolved query with rows.
    pub fn settled(rows: Vec<Row>) -> Self {
        Self {
            rows: Some(rows),
            is_loading: false,
            error: None,
        }
    }

    /// A resolved query that failed.
    pub fn failed(error: impl Into<Arc<CoreError>>) -> Self {
        Self {
            rows: None,
            is_loading: false,
            error: Some(error.into()),
        }
    }

    pub fn from_result(result: Result<Vec<Row>, CoreError>) -> Self {
        match result {
            Ok(rows) => Self::settled(rows),
            Err(e) => Self::failed(e),
        }
    }

    /// The count carried by the first row, if it is a valid visitor-count
    /// record (has a numeric `active_visitors` field).
    ///
    /// Negative values clamp to 0 and fractional values truncate.
    pub fn active_visitors(&self) -> Option<u64> {
        let row = self.rows.as_ref()?.first()?;
        let value = row.get(ACTIVE_VISITORS_FIELD)?;

        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        if value.is_i64() {
            return Some(0);
        }
        value.as_f64().map(truncate_non_negative)
    }
}

#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn truncate_non_negative(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f.trunc() as u64
    } else {
        0
    }
}

/// The externally observed `{value, loading, error}` triple.
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    pub active_visitors: u64,
    pub is_loading: bool,
    pub error: Option<Arc<CoreError>>,
}

impl ObservedState {
    /// What consumers see while the poller is disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// True once a count (possibly a retained one) is being shown.
    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }
}

// Errors compare by identity: the same surfaced error is the same state.
impl PartialEq for ObservedState {
    fn eq(&self, other: &Self) -> bool {
        self.active_visitors == other.active_visitors
            && self.is_loading == other.is_loading
            && match (&self.error, &other.error) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for ObservedState {}
