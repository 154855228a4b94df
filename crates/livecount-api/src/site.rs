// ── Site identity and endpoint resolution ──
//
// A site identity carries the analytics host and read token for one
// tenant. Endpoint and token are resolved from it once per identity
// change; a local override redirects both to a development instance.

use secrecy::{ExposeSecret, SecretString};

/// Pipe name serving the live visitor count.
pub const ACTIVE_VISITORS_ENDPOINT: &str = "api_active_visitors";

/// Redirects a site's queries to a locally running analytics instance.
#[derive(Debug, Clone, Default)]
pub struct LocalOverride {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub token: Option<SecretString>,
}

/// Identifies which site's analytics endpoint and credentials to use.
#[derive(Debug, Clone)]
pub struct SiteIdentity {
    /// Site uuid, sent as the `site_uuid` pipe parameter.
    pub id: String,
    /// Analytics host base URL, e.g. `https://api.tinybird.co`.
    pub endpoint: Option<String>,
    pub token: Option<SecretString>,
    pub local: Option<LocalOverride>,
}

impl SiteIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: None,
            token: None,
            local: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_local(mut self, local: LocalOverride) -> Self {
        self.local = Some(local);
        self
    }

    fn active_local(&self) -> Option<&LocalOverride> {
        self.local.as_ref().filter(|l| l.enabled)
    }
}

impl PartialEq for SiteIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.endpoint == other.endpoint
            && secret_eq(self.token.as_ref(), other.token.as_ref())
            && match (&self.local, &other.local) {
                (Some(a), Some(b)) => {
                    a.enabled == b.enabled
                        && a.endpoint == b.endpoint
                        && secret_eq(a.token.as_ref(), b.token.as_ref())
                }
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for SiteIdentity {}

fn secret_eq(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        (None, None) => true,
        _ => false,
    }
}

/// Resolve the pipe URL for `endpoint_key` on the given site.
///
/// The enabled local override wins over the site's own endpoint. With no
/// site (or no endpoint) the base is empty and the resulting relative URL
/// fails at request time, which surfaces as a query error.
pub fn resolve_endpoint(site: Option<&SiteIdentity>, endpoint_key: &str) -> String {
    let base = site
        .and_then(|s| match s.active_local() {
            Some(local) => local.endpoint.as_deref(),
            None => s.endpoint.as_deref(),
        })
        .unwrap_or("")
        .trim_end_matches('/');

    format!("{base}/v0/pipes/{endpoint_key}.json")
}

/// Resolve the read token for the given site. Empty when none is configured.
pub fn resolve_token(site: Option<&SiteIdentity>) -> SecretString {
    site.and_then(|s| match s.active_local() {
        Some(local) => local.token.clone(),
        None => s.token.clone(),
    })
    .unwrap_or_else(|| SecretString::from(String::new()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn endpoint_uses_site_host() {
        let site = SiteIdentity::new("site-1").with_endpoint("https://api.example.com/");
        assert_eq!(
            resolve_endpoint(Some(&site), ACTIVE_VISITORS_ENDPOINT),
            "https://api.example.com/v0/pipes/api_active_visitors.json"
        );
    }

    #[test]
    fn enabled_local_override_wins() {
        let site = SiteIdentity::new("site-1")
            .with_endpoint("https://api.example.com")
            .with_token("remote-token")
            .with_local(LocalOverride {
                enabled: true,
                endpoint: Some("http://localhost:7181".into()),
                token: Some(SecretString::from("local-token".to_string())),
            });

        assert_eq!(
            resolve_endpoint(Some(&site), ACTIVE_VISITORS_ENDPOINT),
            "http://localhost:7181/v0/pipes/api_active_visitors.json"
        );
        assert_eq!(resolve_token(Some(&site)).expose_secret(), "local-token");
    }

    #[test]
    fn disabled_local_override_is_ignored() {
        let site = SiteIdentity::new("site-1")
            .with_endpoint("https://api.example.com")
            .with_token("remote-token")
            .with_local(LocalOverride {
                enabled: false,
                endpoint: Some("http://localhost:7181".into()),
                token: None,
            });

        assert_eq!(
            resolve_endpoint(Some(&site), ACTIVE_VISITORS_ENDPOINT),
            "https://api.example.com/v0/pipes/api_active_visitors.json"
        );
        assert_eq!(resolve_token(Some(&site)).expose_secret(), "remote-token");
    }

    #[test]
    fn absent_site_resolves_to_empty_base_and_token() {
        assert_eq!(
            resolve_endpoint(None, ACTIVE_VISITORS_ENDPOINT),
            "/v0/pipes/api_active_visitors.json"
        );
        assert_eq!(resolve_token(None).expose_secret(), "");
    }

    #[test]
    fn identity_equality_covers_token() {
        let a = SiteIdentity::new("s").with_token("one");
        let b = SiteIdentity::new("s").with_token("two");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
