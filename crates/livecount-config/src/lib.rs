//! Shared configuration for livecount.
//!
//! TOML site profiles, token resolution (env + keyring + plaintext), and
//! translation to `livecount_core` / `livecount_api` runtime types. The
//! CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use livecount_api::{LocalOverride, SiteIdentity, TlsMode, TransportConfig};
use livecount_core::{PollConfig, PollerOptions};

const KEYRING_SERVICE: &str = "livecount";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named site profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Refresh period in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    #[serde(default)]
    pub insecure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
            insecure: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    livecount_core::REFRESH_INTERVAL.as_secs()
}

/// A named site profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Site uuid sent as `site_uuid`.
    pub site_id: String,

    /// Analytics host base URL (e.g. "https://api.tinybird.co").
    pub endpoint: Option<String>,

    /// Read token in plaintext. Prefer the keyring or `token_env`.
    pub token: Option<String>,

    /// Environment variable name containing the read token.
    pub token_env: Option<String>,

    /// Default resource filter (e.g. a post uuid).
    pub resource: Option<String>,

    /// Route queries to a local analytics instance.
    #[serde(default)]
    pub local_enabled: bool,

    pub local_endpoint: Option<String>,

    pub local_token: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "livecount", "livecount").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("livecount");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from an explicit file path + environment.
///
/// Environment variables use the `LIVECOUNT_` prefix with `__` as the
/// nesting separator, e.g. `LIVECOUNT_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LIVECOUNT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick the profile name: explicit override, then `default_profile`, then "default".
pub fn active_profile_name(cfg: &Config, requested: Option<&str>) -> String {
    requested
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Look up a profile by name.
pub fn profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, ConfigError> {
    cfg.profiles.get(name).ok_or_else(|| {
        let mut available: Vec<String> = cfg.profiles.keys().cloned().collect();
        available.sort();
        ConfigError::ProfileNotFound {
            name: name.into(),
            available,
        }
    })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the read token from the credential chain.
///
/// `flag` is a token passed on the command line; it outranks everything
/// the profile or keyring holds.
pub fn resolve_token(
    profile: &Profile,
    profile_name: &str,
    flag: Option<&str>,
) -> Result<SecretString, ConfigError> {
    // 1. CLI flag
    if let Some(token) = flag {
        return Ok(SecretString::from(token.to_owned()));
    }

    // 2. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to runtime types ────────────────────────────────────

fn validate_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    url::Url::parse(raw)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation {
            field: field.into(),
            reason: format!("invalid URL '{raw}': {e}"),
        })
}

/// Build a `SiteIdentity` from a profile.
///
/// A token is required unless the profile routes to a local instance.
pub fn profile_to_site(
    profile: &Profile,
    profile_name: &str,
    token_flag: Option<&str>,
) -> Result<SiteIdentity, ConfigError> {
    if profile.site_id.is_empty() {
        return Err(ConfigError::Validation {
            field: "site_id".into(),
            reason: "must not be empty".into(),
        });
    }

    let mut site = SiteIdentity::new(profile.site_id.clone());

    if profile.local_enabled {
        let endpoint = profile.local_endpoint.clone().ok_or_else(|| ConfigError::Validation {
            field: "local_endpoint".into(),
            reason: "required when local_enabled is set".into(),
        })?;
        validate_url("local_endpoint", &endpoint)?;
        site = site.with_local(LocalOverride {
            enabled: true,
            endpoint: Some(endpoint),
            token: profile.local_token.clone().map(SecretString::from),
        });
    } else {
        let endpoint = profile.endpoint.as_deref().ok_or_else(|| ConfigError::Validation {
            field: "endpoint".into(),
            reason: "required unless local_enabled is set".into(),
        })?;
        validate_url("endpoint", endpoint)?;
        site = site.with_endpoint(endpoint);
        site.token = Some(resolve_token(profile, profile_name, token_flag)?);
    }

    Ok(site)
}

/// Build the enabled `PollConfig` for a profile, with optional resource
/// and token overrides.
pub fn profile_to_poll_config(
    profile: &Profile,
    profile_name: &str,
    resource: Option<String>,
    token_flag: Option<&str>,
) -> Result<PollConfig, ConfigError> {
    let site = profile_to_site(profile, profile_name, token_flag)?;
    Ok(PollConfig {
        site: Some(site),
        resource_filter: resource.or_else(|| profile.resource.clone()),
        enabled: true,
    })
}

/// Transport settings for a profile, falling back to global defaults.
pub fn transport_config(profile: &Profile, defaults: &Defaults) -> TransportConfig {
    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    TransportConfig {
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    }
}

/// Poller tuning from the global defaults.
pub fn poller_options(defaults: &Defaults) -> PollerOptions {
    PollerOptions {
        refresh_interval: Duration::from_secs(defaults.refresh_interval),
        ..PollerOptions::default()
    }
}
