//! Async client for analytics pipe endpoints.
//!
//! Speaks the `GET {endpoint}/v0/pipes/{name}.json` protocol used by
//! Tinybird-style analytics backends and resolves endpoint URLs and
//! access tokens from a [`SiteIdentity`]. Higher layers (`livecount-core`)
//! decide *when* to query; this crate only knows *how*.

pub mod client;
pub mod error;
pub mod site;
pub mod transport;

pub use client::{AnalyticsClient, PipeResponse, Row};
pub use error::Error;
pub use site::{ACTIVE_VISITORS_ENDPOINT, LocalOverride, SiteIdentity, resolve_endpoint, resolve_token};
pub use transport::{TlsMode, TransportConfig};
