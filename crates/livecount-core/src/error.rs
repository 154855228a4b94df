// ── Core error types ──
//
// Errors observed by consumers of the poller. These are NOT API-specific:
// the `From<livecount_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants. Query errors are never returned from
// poller methods; they surface through `ObservedState::error`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach analytics endpoint at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Analytics query timed out")]
    Timeout,

    // ── Query errors ─────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Invalid response from analytics endpoint: {message}")]
    InvalidResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status code, if the underlying failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<livecount_api::Error> for CoreError {
    fn from(err: livecount_api::Error) -> Self {
        match err {
            livecount_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            livecount_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: err.status(),
                    }
                }
            }
            livecount_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid endpoint URL: {e}"),
            },
            livecount_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            livecount_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            livecount_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_status_and_message() {
        let err = CoreError::from(livecount_api::Error::Api {
            status: 400,
            message: "[Error] Missing required parameter site_uuid".into(),
        });

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("Missing required parameter"));
    }

    #[test]
    fn auth_and_decode_errors_are_mapped() {
        let auth = CoreError::from(livecount_api::Error::Authentication {
            message: "invalid token".into(),
        });
        assert!(matches!(auth, CoreError::AuthenticationFailed { .. }));

        let decode = CoreError::from(livecount_api::Error::Deserialization {
            message: "missing field `data`".into(),
            body: "{}".into(),
        });
        assert!(matches!(decode, CoreError::InvalidResponse { .. }));
    }
}
