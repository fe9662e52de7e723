//! CLI configuration: thin wrapper around `routerlink_config`.
//!
//! Adds the resolution step that layers `GlobalOpts` flags (--host,
//! --username, --timeout, ...) over the selected profile.

use secrecy::SecretString;

use routerlink_api::{ClientConfig, StreamConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use routerlink_config::{Config, Profile, config_path, load_config};

/// Profile name used when flags alone describe the device.
const ADHOC_PROFILE: &str = "cli";

/// A profile with every CLI override applied.
#[derive(Debug)]
pub struct Resolved {
    pub name: String,
    pub profile: Profile,
}

impl Resolved {
    /// An empty profile, for commands that only need flags.
    pub fn adhoc() -> Self {
        Self {
            name: ADHOC_PROFILE.to_owned(),
            profile: Profile::default(),
        }
    }
}

/// Pick the active profile and apply flag overrides.
///
/// An explicit `--profile` must exist. Without one, the config's default
/// profile is used when present, otherwise `--host` is required.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let (name, mut profile) = match config.profile(global.profile.as_deref()) {
        Some((name, profile)) => (name.to_owned(), profile.clone()),
        None => {
            if let Some(ref name) = global.profile {
                let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                return Err(CliError::ProfileNotFound {
                    name: name.clone(),
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available.join(", ")
                    },
                });
            }
            if global.host.is_none() {
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            }
            let Resolved { name, profile } = Resolved::adhoc();
            (name, profile)
        }
    };

    apply_overrides(&mut profile, global);
    Ok(Resolved { name, profile })
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if global.port.is_some() {
        profile.port = global.port;
    }
    if global.username.is_some() {
        profile.username.clone_from(&global.username);
    }
    if global.no_tls {
        profile.tls = Some(false);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
    if global.retries.is_some() {
        profile.retry_attempts = global.retries;
    }
}

/// Build the control-plane client configuration.
///
/// `--password` wins over every stored credential source.
pub fn client_config(
    resolved: &Resolved,
    global: &GlobalOpts,
    config: &Config,
) -> Result<ClientConfig, CliError> {
    let Some(username) = resolved.profile.username.clone() else {
        return Err(CliError::NoCredentials {
            profile: resolved.name.clone(),
        });
    };
    let password = match global.password {
        Some(ref pw) => SecretString::from(pw.clone()),
        None => routerlink_config::resolve_password(&resolved.profile, &resolved.name)?,
    };
    Ok(routerlink_config::build_client_config(
        &resolved.profile,
        &config.defaults,
        username,
        password,
    )?)
}

/// Build the event-stream configuration, `--url` taking priority.
pub fn stream_config(resolved: &Resolved, url: Option<&str>) -> Result<StreamConfig, CliError> {
    let cfg = match url {
        Some(url) => routerlink_config::stream_config(url, &resolved.profile)?,
        None => routerlink_config::profile_to_stream_config(&resolved.profile)?,
    };
    Ok(cfg)
}
