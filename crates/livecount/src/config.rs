//! CLI configuration: a thin wrapper around `livecount_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--site, --endpoint, --token, etc.) on top of the file profiles.

use std::path::PathBuf;

use livecount_api::TransportConfig;
use livecount_config::{Config, Profile};
use livecount_core::{PollConfig, PollerOptions};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything needed to start polling.
#[derive(Debug)]
pub struct Target {
    pub profile_name: String,
    pub poll: PollConfig,
    pub transport: TransportConfig,
    pub options: PollerOptions,
}

/// The config file path, honouring `--config`.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(livecount_config::config_path)
}

/// Load the config file and `LIVECOUNT_` environment overrides.
///
/// A missing file contributes nothing; one that fails to parse is an error.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(livecount_config::load_config_from(&config_path(global))?)
}

/// Resolve the active profile with CLI flag overrides applied.
///
/// When no profile exists, flags alone may describe the site.
pub fn resolve_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let name = livecount_config::active_profile_name(cfg, global.profile.as_deref());

    let mut profile = match livecount_config::profile(cfg, &name) {
        Ok(p) => p.clone(),
        // An explicitly requested profile must exist.
        Err(e) if global.profile.is_some() => return Err(e.into()),
        Err(_) if global.site.is_some() => Profile::default(),
        Err(_) => {
            return Err(CliError::NoConfig {
                path: config_path(global).display().to_string(),
            });
        }
    };

    if let Some(ref site) = global.site {
        profile.site_id.clone_from(site);
    }
    if let Some(ref endpoint) = global.endpoint {
        profile.endpoint = Some(endpoint.clone());
        profile.local_enabled = false;
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok((name, profile))
}

/// Build the polling target for `watch` / `once`.
pub fn resolve_target(global: &GlobalOpts, resource: Option<String>) -> Result<Target, CliError> {
    let mut cfg = load(global)?;
    if let Some(interval) = global.interval {
        cfg.defaults.refresh_interval = interval;
    }

    let (profile_name, profile) = resolve_profile(global, &cfg)?;
    let poll = livecount_config::profile_to_poll_config(
        &profile,
        &profile_name,
        resource,
        global.token.as_deref(),
    )?;
    let transport = livecount_config::transport_config(&profile, &cfg.defaults);
    let options = livecount_config::poller_options(&cfg.defaults);

    Ok(Target {
        profile_name,
        poll,
        transport,
        options,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use figment::Jail;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["livecount"];
        argv.extend_from_slice(args);
        argv.push("once");
        Cli::parse_from(argv).global
    }

    #[test]
    fn env_defaults_apply_without_config_file() {
        Jail::expect_with(|jail| {
            jail.set_env("LIVECOUNT_DEFAULTS__REFRESH_INTERVAL", "15");
            let missing = jail.directory().join("absent").join("config.toml");
            let opts = global(&["--config", missing.to_str().unwrap()]);

            let cfg = load(&opts).unwrap();
            assert_eq!(cfg.defaults.refresh_interval, 15);
            Ok(())
        });
    }

    #[test]
    fn token_flag_beats_profile_token_env() {
        Jail::expect_with(|jail| {
            jail.set_env("LIVECOUNT_TEST_CLI_TOKEN", "env-token");
            jail.create_file(
                "config.toml",
                r#"
[profiles.blog]
site_id = "site-blog"
endpoint = "https://api.example.com"
token_env = "LIVECOUNT_TEST_CLI_TOKEN"
"#,
            )?;
            let path = jail.directory().join("config.toml");
            let opts = global(&[
                "--config",
                path.to_str().unwrap(),
                "--profile",
                "blog",
                "--token",
                "flag-token",
            ]);

            let target = resolve_target(&opts, None).unwrap();
            let site = target.poll.site.unwrap();
            assert_eq!(
                livecount_api::resolve_token(Some(&site)).expose_secret(),
                "flag-token"
            );
            Ok(())
        });
    }
}
