//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use livecount_config::ConfigError;
use livecount_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach analytics endpoint at {url}")]
    #[diagnostic(
        code(livecount::connection_failed),
        help(
            "Check that the endpoint is reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Analytics query timed out")]
    #[diagnostic(
        code(livecount::timeout),
        help("Increase the timeout with --timeout or check endpoint responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(livecount::auth_failed),
        help(
            "Verify the read token has access to the active visitors pipe.\n\
             Set it with --token, LIVECOUNT_TOKEN, or the profile's token_env."
        )
    )]
    AuthFailed { message: String },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(livecount::no_credentials),
        help(
            "Add `token` or `token_env` to the profile, store it in the keyring\n\
             under service 'livecount' as '{profile}/token', or pass --token."
        )
    )]
    NoCredentials { profile: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Analytics API error: {message}")]
    #[diagnostic(code(livecount::api_error))]
    ApiError { message: String, status: Option<u16> },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(livecount::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(livecount::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No site configured")]
    #[diagnostic(
        code(livecount::no_config),
        help(
            "Create a profile in {path}\n\
             or pass --site, --endpoint, and --token."
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(livecount::config))]
    Config { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(livecount::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<&CoreError> for CliError {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                message: message.clone(),
            },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Api { message, status } => CliError::ApiError {
                message: message.clone(),
                status: *status,
            },
            CoreError::InvalidResponse { message } => CliError::ApiError {
                message: format!("invalid response: {message}"),
                status: None,
            },
            CoreError::Config { message } => CliError::Config {
                message: message.clone(),
            },
            CoreError::Internal(message) => CliError::ApiError {
                message: message.clone(),
                status: None,
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::from(&err)
    }
}

impl From<livecount_api::Error> for CliError {
    fn from(err: livecount_api::Error) -> Self {
        Self::from(CoreError::from(err))
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        assert_eq!(
            CliError::from(CoreError::AuthenticationFailed {
                message: "bad token".into()
            })
            .exit_code(),
            exit_code::AUTH
        );
        assert_eq!(CliError::from(CoreError::Timeout).exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::from(CoreError::ConnectionFailed {
                url: "https://x".into(),
                reason: "refused".into()
            })
            .exit_code(),
            exit_code::CONNECTION
        );
    }

    #[test]
    fn missing_profile_lists_alternatives() {
        let err = CliError::from(ConfigError::ProfileNotFound {
            name: "prod".into(),
            available: vec!["blog".into(), "shop".into()],
        });
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "blog, shop"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
