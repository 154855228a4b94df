// Async HTTP client for analytics pipe endpoints.
//
// Endpoint: GET {base}/v0/pipes/{name}.json?{params}
// Auth: Authorization: Bearer <token>

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// One result row of a pipe query, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

// ── Response envelope ────────────────────────────────────────────────

/// Column descriptor from the `meta` block of a pipe response.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Query statistics reported alongside the data.
#[derive(Debug, Clone, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub elapsed: f64,
    #[serde(default)]
    pub rows_read: u64,
    #[serde(default)]
    pub bytes_read: u64,
}

/// The `{ meta, data, rows, statistics }` envelope returned by a pipe.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    #[serde(default)]
    pub meta: Vec<ColumnMeta>,
    pub data: Vec<Row>,
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for analytics pipe queries.
///
/// Stateless apart from the pooled `reqwest::Client`; the endpoint URL and
/// token are supplied per call because they are resolved per site.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    http: reqwest::Client,
}

impl AnalyticsClient {
    /// Build a client from transport settings.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Query a pipe and return its decoded envelope.
    ///
    /// `params` is serialized into the query string; fields the caller
    /// wants omitted must be skipped by its `Serialize` impl. An empty
    /// token sends no `Authorization` header.
    pub async fn query_pipe<P>(
        &self,
        endpoint_url: &str,
        token: &SecretString,
        params: &P,
    ) -> Result<PipeResponse, Error>
    where
        P: Serialize + ?Sized,
    {
        self.get(endpoint_url, token, params).await
    }

    async fn get<T, P>(&self, endpoint_url: &str, token: &SecretString, params: &P) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let url = Url::parse(endpoint_url)?;
        debug!("GET {url}");

        let mut request = self.http.get(url).query(params);
        let token = token.expose_secret();
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        Self::handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: error_message(&body).unwrap_or_else(|| format!("HTTP {status}")),
            });
        }

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or(body),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// Pull the `error` field out of an error body, if it has one.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn envelope_without_meta_or_statistics_decodes() {
        let resp: PipeResponse =
            serde_json::from_str(r#"{"data":[{"active_visitors":3}]}"#).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert!(resp.meta.is_empty());
        assert!(resp.statistics.is_none());
    }

    #[test]
    fn error_field_is_extracted() {
        assert_eq!(
            error_message(r#"{"error":"[Error] Missing columns"}"#).as_deref(),
            Some("[Error] Missing columns")
        );
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }
}
