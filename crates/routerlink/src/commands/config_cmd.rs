//! Config command handlers. These never touch a device.

use std::io::BufRead;

use tracing::info;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{Config, config_path, load_config};
use crate::error::CliError;

const REDACTED: &str = "****";

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config_path().display());
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = load_config()?;
            print!("{}", format_config_redacted(&cfg)?);
            Ok(())
        }
        ConfigCommand::SetPassword { ref name } => {
            let password = match global.password {
                Some(ref pw) => pw.clone(),
                None => read_password_line(std::io::stdin().lock())?,
            };
            routerlink_config::store_password(name, &password)?;
            info!(profile = %name, "password stored in keyring");
            Ok(())
        }
    }
}

fn read_password_line(mut input: impl BufRead) -> Result<String, CliError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "empty".into(),
        });
    }
    Ok(password.to_owned())
}

/// Render the config as TOML with stored passwords masked.
pub fn format_config_redacted(cfg: &Config) -> Result<String, CliError> {
    let mut redacted = cfg.clone();
    for profile in redacted.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    toml::to_string_pretty(&redacted).map_err(|e| CliError::Render(e.to_string()))
}
