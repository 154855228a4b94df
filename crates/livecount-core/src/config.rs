// ── Runtime poll configuration ──
//
// These types describe *what* to poll and *how often*. They never touch
// disk: the CLI (via livecount-config) or an embedding application builds
// a `PollConfig` and hands it to `Poller::update`.

use std::time::Duration;

use livecount_api::{ACTIVE_VISITORS_ENDPOINT, SiteIdentity};

use crate::scheduler::REFRESH_INTERVAL;

/// Caller input for one poller.
///
/// Only `enabled` controls the refresh lifecycle. Changing `site` or
/// `resource_filter` while enabled re-derives the query parameters
/// without restarting the timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollConfig {
    /// Which site's analytics endpoint and token to use.
    pub site: Option<SiteIdentity>,
    /// Optional sub-resource (e.g. a single post) to count visitors for.
    pub resource_filter: Option<String>,
    /// Gate for the whole subsystem.
    pub enabled: bool,
}

impl PollConfig {
    /// An enabled config for the given site, unfiltered.
    pub fn enabled(site: SiteIdentity) -> Self {
        Self {
            site: Some(site),
            resource_filter: None,
            enabled: true,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource_filter = Some(resource.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// True if `other` would produce different query parameters or target.
    pub(crate) fn query_differs(&self, other: &Self) -> bool {
        self.site != other.site || self.resource_filter != other.resource_filter
    }
}

/// Tuning for a `Poller` instance.
#[derive(Debug, Clone)]
pub struct PollerOptions {
    /// Period of the refresh timer. Clamped to `MIN_REFRESH_INTERVAL`.
    pub refresh_interval: Duration,
    /// Pipe name queried for the count.
    pub endpoint_key: String,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            refresh_interval: REFRESH_INTERVAL,
            endpoint_key: ACTIVE_VISITORS_ENDPOINT.into(),
        }
    }
}
