//! Reactive polling engine for a live "active visitors" count.
//!
//! This crate owns the polling-and-staleness state machine that sits
//! between `livecount-api` and any consumer (CLI printer, UI, metrics
//! bridge):
//!
//! - **[`Poller`]**: Facade driven by [`PollConfig`] updates. Enabling it
//!   arms one refresh session (a 60 second interval plus the in-flight
//!   queries); disabling or shutting it down cancels that session.
//!
//! - **[`Reconciler`]**: Pure state machine that folds each
//!   [`FetchOutcome`] into an [`ObservedState`], retaining the last valid
//!   count so refresh cycles never flash back to zero or loading.
//!
//! - **[`QueryParams`]**: Deterministic parameter builder. The resource
//!   filter is omitted from the wire entirely when absent.
//!
//! - **[`QueryExecutor`]**: Seam to the query-execution client.
//!   [`livecount_api::AnalyticsClient`] implements it; tests script it.
//!
//! - **[`StateStream`]**: Subscription handle exposing `current()` /
//!   `latest()` / `changed()` for reactive consumers.

pub mod config;
pub mod error;
pub mod executor;
pub mod params;
pub mod poller;
pub mod reconcile;
pub mod scheduler;
pub mod state;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{PollConfig, PollerOptions};
pub use error::CoreError;
pub use executor::QueryExecutor;
pub use params::{QueryParams, QueryRequest, ResolvedTarget};
pub use poller::Poller;
pub use reconcile::Reconciler;
pub use scheduler::{MIN_REFRESH_INTERVAL, REFRESH_INTERVAL, SessionId};
pub use state::{FetchOutcome, ObservedState};
pub use stream::StateStream;

pub use livecount_api::{Row, SiteIdentity};
