use thiserror::Error;

/// Top-level error type for the `livecount-api` crate.
///
/// Covers every failure mode of a pipe query: transport, authentication,
/// non-success responses, and payload decoding. `livecount-core` maps these
/// into the errors its consumers observe.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token missing, expired, or lacking read scope on the pipe.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Pipe API ────────────────────────────────────────────────────
    /// Non-success response from the pipe endpoint.
    #[error("Analytics API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the token was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error that the next refresh
    /// cycle may not see again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_rate_limits_are_transient() {
        let unavailable = Error::Api {
            status: 503,
            message: "unavailable".into(),
        };
        let throttled = Error::Api {
            status: 429,
            message: "slow down".into(),
        };
        let bad_request = Error::Api {
            status: 400,
            message: "bad param".into(),
        };

        assert!(unavailable.is_transient());
        assert!(throttled.is_transient());
        assert!(!bad_request.is_transient());
        assert_eq!(bad_request.status(), Some(400));
    }

    #[test]
    fn auth_failures_are_not_transient() {
        let err = Error::Authentication {
            message: "invalid token".into(),
        };
        assert!(err.is_auth_failure());
        assert!(!err.is_transient());
        assert_eq!(err.status(), None);
    }
}
