//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_line(&config::config_path(global).display().to_string(), global.quiet)?;
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = config::load(global)?;
            for profile in cfg.profiles.values_mut() {
                for secret in [&mut profile.token, &mut profile.local_token] {
                    if secret.is_some() {
                        *secret = Some(REDACTED.into());
                    }
                }
            }

            let rendered = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::Plain => {
                    toml::to_string_pretty(&cfg).map_err(|e| CliError::Config {
                        message: format!("failed to serialize config: {e}"),
                    })?
                }
            };
            output::print_line(rendered.trim_end(), global.quiet)?;
            Ok(())
        }
    }
}
