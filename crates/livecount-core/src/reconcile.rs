// ── Result reconciler ──
//
// Folds each fetch outcome into the observed state. The last valid count
// is retained so a refresh that is still loading, came back empty, or
// failed keeps showing the previous value instead of resetting.

use tracing::trace;

use crate::state::{FetchOutcome, ObservedState};

/// Per-session reconciliation state.
///
/// A fresh `Reconciler` is created for every enable session, so the
/// retained count always starts out empty.
#[derive(Debug, Default)]
pub struct Reconciler {
    retained: Option<u64>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last valid count seen in this session.
    pub fn retained(&self) -> Option<u64> {
        self.retained
    }

    /// Reconcile one outcome against the retained count.
    ///
    /// The error is passed through untouched in every enabled branch; it
    /// never forces the count to 0 or loading to true.
    pub fn reconcile(&mut self, enabled: bool, outcome: &FetchOutcome) -> ObservedState {
        if !enabled {
            return ObservedState::disabled();
        }

        let error = outcome.error.clone();

        if let Some(count) = outcome.active_visitors() {
            trace!(count, "retaining fresh count");
            self.retained = Some(count);
            return ObservedState {
                active_visitors: count,
                is_loading: false,
                error,
            };
        }

        match self.retained {
            // Once a value has been shown, loading is suppressed.
            Some(retained) => ObservedState {
                active_visitors: retained,
                is_loading: false,
                error,
            },
            None => ObservedState {
                active_visitors: 0,
                is_loading: outcome.is_loading,
                error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use livecount_api::Row;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::error::CoreError;

    fn record(value: serde_json::Value) -> Vec<Row> {
        match value {
            serde_json::Value::Object(map) => vec![map],
            _ => Vec::new(),
        }
    }

    fn observed(active_visitors: u64, is_loading: bool) -> ObservedState {
        ObservedState {
            active_visitors,
            is_loading,
            error: None,
        }
    }

    // ── Scenarios ────────────────────────────────────────────────────

    #[test]
    fn first_load_reports_loading() {
        let mut rec = Reconciler::new();
        let state = rec.reconcile(true, &FetchOutcome::loading());
        assert_eq!(state, observed(0, true));
        assert_eq!(rec.retained(), None);
    }

    #[test]
    fn valid_record_passes_through_and_is_retained() {
        let mut rec = Reconciler::new();
        let outcome = FetchOutcome::settled(record(json!({ "active_visitors": 42 })));
        assert_eq!(rec.reconcile(true, &outcome), observed(42, false));
        assert_eq!(rec.retained(), Some(42));
    }

    #[test]
    fn refresh_after_value_keeps_value_without_loading() {
        let mut rec = Reconciler::new();
        rec.reconcile(
            true,
            &FetchOutcome::settled(record(json!({ "active_visitors": 42 }))),
        );
        let state = rec.reconcile(true, &FetchOutcome::loading());
        assert_eq!(state, observed(42, false));
    }

    #[test]
    fn invalid_record_without_history_settles_at_zero() {
        let mut rec = Reconciler::new();
        let outcome = FetchOutcome::settled(record(json!({ "some_other_field": 42 })));
        assert_eq!(rec.reconcile(true, &outcome), observed(0, false));
        assert_eq!(rec.retained(), None);
    }

    #[test]
    fn disabled_ignores_fresh_data() {
        let mut rec = Reconciler::new();
        rec.reconcile(
            true,
            &FetchOutcome::settled(record(json!({ "active_visitors": 20 }))),
        );
        let offered = FetchOutcome::settled(record(json!({ "active_visitors": 30 })));
        assert_eq!(rec.reconcile(false, &offered), ObservedState::disabled());
    }

    // ── Retention rules ──────────────────────────────────────────────

    #[test]
    fn empty_settled_response_keeps_retained_value() {
        let mut rec = Reconciler::new();
        rec.reconcile(
            true,
            &FetchOutcome::settled(record(json!({ "active_visitors": 9 }))),
        );

        let state = rec.reconcile(true, &FetchOutcome::settled(Vec::new()));
        assert_eq!(state, observed(9, false));
        assert_eq!(rec.retained(), Some(9));
    }

    #[test]
    fn confirmed_zero_replaces_retained_value() {
        let mut rec = Reconciler::new();
        rec.reconcile(
            true,
            &FetchOutcome::settled(record(json!({ "active_visitors": 5 }))),
        );
        let state = rec.reconcile(
            true,
            &FetchOutcome::settled(record(json!({ "active_visitors": 0 }))),
        );

        assert_eq!(state, observed(0, false));
        assert_eq!(rec.retained(), Some(0));

        // Zero is history: a following refresh must not report loading.
        assert_eq!(rec.reconcile(true, &FetchOutcome::loading()), observed(0, false));
    }

    #[test]
    fn error_is_orthogonal_to_count() {
        let mut rec = Reconciler::new();
        rec.reconcile(
            true,
            &FetchOutcome::settled(record(json!({ "active_visitors": 11 }))),
        );

        let err = Arc::new(CoreError::Timeout);
        let state = rec.reconcile(true, &FetchOutcome::failed(Arc::clone(&err)));

        assert_eq!(state.active_visitors, 11);
        assert!(!state.is_loading);
        assert!(state.error.as_ref().is_some_and(|e| Arc::ptr_eq(e, &err)));
        assert_eq!(rec.retained(), Some(11));
    }

    #[test]
    fn error_during_first_load_does_not_force_loading() {
        let mut rec = Reconciler::new();
        let state = rec.reconcile(true, &FetchOutcome::failed(CoreError::Timeout));
        assert_eq!(state.active_visitors, 0);
        assert!(!state.is_loading);
        assert!(state.error.is_some());
    }

    #[test]
    fn data_and_error_together_surface_both() {
        let mut rec = Reconciler::new();
        let err = Arc::new(CoreError::Api {
            message: "partial".into(),
            status: None,
        });
        let outcome = FetchOutcome {
            rows: Some(record(json!({ "active_visitors": 4 }))),
            is_loading: false,
            error: Some(Arc::clone(&err)),
        };

        let state = rec.reconcile(true, &outcome);
        assert_eq!(state.active_visitors, 4);
        assert!(state.error.is_some_and(|e| Arc::ptr_eq(&e, &err)));
    }

    #[test]
    fn disabled_output_is_constant_for_any_outcome() {
        let mut rec = Reconciler::new();
        for outcome in [
            FetchOutcome::loading(),
            FetchOutcome::settled(record(json!({ "active_visitors": 3 }))),
            FetchOutcome::failed(CoreError::Timeout),
            FetchOutcome::default(),
        ] {
            assert_eq!(rec.reconcile(false, &outcome), ObservedState::disabled());
        }
        assert_eq!(rec.retained(), None);
    }
}
