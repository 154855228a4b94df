// ── Query parameter builder ──
//
// Derives the pipe parameters and resolved target for one query. The
// refresh counter rides along as request identity but is never put on
// the wire.

use livecount_api::{SiteIdentity, resolve_endpoint, resolve_token};
use secrecy::SecretString;
use serde::Serialize;

use crate::config::PollConfig;

/// Parameters sent with each active-visitor query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParams {
    /// Site uuid, empty when no site identity is configured.
    pub site_uuid: String,
    /// Sub-resource filter. Omitted from the query string when `None`.
    #[serde(rename = "post_uuid", skip_serializing_if = "Option::is_none")]
    pub resource_uuid: Option<String>,
    /// Distinguishes one tick's query from the next.
    #[serde(skip)]
    pub refresh_counter: u64,
}

impl QueryParams {
    pub fn build(config: &PollConfig, refresh_counter: u64) -> Self {
        Self {
            site_uuid: config
                .site
                .as_ref()
                .map(|s| s.id.clone())
                .unwrap_or_default(),
            resource_uuid: config
                .resource_filter
                .as_deref()
                .filter(|r| !r.is_empty())
                .map(str::to_owned),
            refresh_counter,
        }
    }
}

/// Endpoint URL and token, resolved once per site identity change.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub endpoint_url: String,
    pub token: SecretString,
}

impl ResolvedTarget {
    pub fn resolve(site: Option<&SiteIdentity>, endpoint_key: &str) -> Self {
        Self {
            endpoint_url: resolve_endpoint(site, endpoint_key),
            token: resolve_token(site),
        }
    }
}

/// Everything the query-execution client needs for one call.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub endpoint_url: String,
    pub token: SecretString,
    pub params: QueryParams,
}

impl QueryRequest {
    pub fn new(target: &ResolvedTarget, params: QueryParams) -> Self {
        Self {
            endpoint_url: target.endpoint_url.clone(),
            token: target.token.clone(),
            params,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use livecount_api::ACTIVE_VISITORS_ENDPOINT;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    fn site() -> SiteIdentity {
        SiteIdentity::new("site-abc")
            .with_endpoint("https://api.example.com")
            .with_token("tok")
    }

    #[test]
    fn site_uuid_comes_from_identity() {
        let params = QueryParams::build(&PollConfig::enabled(site()), 7);
        assert_eq!(params.site_uuid, "site-abc");
        assert_eq!(params.resource_uuid, None);
        assert_eq!(params.refresh_counter, 7);
    }

    #[test]
    fn missing_site_yields_empty_uuid() {
        let params = QueryParams::build(&PollConfig::default(), 0);
        assert_eq!(params.site_uuid, "");
    }

    #[test]
    fn absent_resource_is_omitted_from_wire() {
        let params = QueryParams::build(&PollConfig::enabled(site()), 3);
        let wire = serde_json::to_value(&params).unwrap();
        assert_eq!(wire, json!({ "site_uuid": "site-abc" }));
    }

    #[test]
    fn empty_resource_is_treated_as_absent() {
        let config = PollConfig::enabled(site()).with_resource("");
        let params = QueryParams::build(&config, 0);
        assert_eq!(params.resource_uuid, None);
        let wire = serde_json::to_value(&params).unwrap();
        assert!(wire.get("post_uuid").is_none());
    }

    #[test]
    fn present_resource_is_sent_as_post_uuid() {
        let config = PollConfig::enabled(site()).with_resource("post-1");
        let wire = serde_json::to_value(QueryParams::build(&config, 0)).unwrap();
        assert_eq!(wire, json!({ "site_uuid": "site-abc", "post_uuid": "post-1" }));
    }

    #[test]
    fn target_resolves_endpoint_and_token() {
        let target = ResolvedTarget::resolve(Some(&site()), ACTIVE_VISITORS_ENDPOINT);
        assert_eq!(
            target.endpoint_url,
            "https://api.example.com/v0/pipes/api_active_visitors.json"
        );
        assert_eq!(target.token.expose_secret(), "tok");
    }
}
