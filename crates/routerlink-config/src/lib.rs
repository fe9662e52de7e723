//! Shared configuration for routerlink tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `routerlink_api::ClientConfig` / `StreamConfig`. The CLI
//! layers its `GlobalOpts` overrides on top of what this crate produces.

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
use tracing::debug;

use routerlink_api::{ClientConfig, StreamConfig};

/// Prefix for environment overrides (`ROUTERLINK_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "ROUTERLINK_";
/// Fallback password variable, consulted after a profile's `password_env`.
pub const PASSWORD_ENV: &str = "ROUTERLINK_PASSWORD";
const KEYRING_SERVICE: &str = "routerlink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in {path}")]
    UnknownProfile { name: String, path: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
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

impl Config {
    /// Look up a profile, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Option<(&str, &Profile)> {
        let name = name.or(self.default_profile.as_deref())?;
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_output() -> String {
    "json".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

/// A named device profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Device host name or address.
    pub host: String,

    /// Override the scheme's default port.
    pub port: Option<u16>,

    /// Username for Basic auth.
    pub username: Option<String>,

    /// Plaintext password. Prefer keyring or `password_env`.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Use HTTPS. Defaults to `true`.
    pub tls: Option<bool>,

    /// REST prefix, `/rest` when unset.
    pub base_path: Option<String>,

    /// Skip certificate verification. Defaults to `true`: appliances
    /// usually ship self-signed certificates.
    pub insecure: Option<bool>,

    /// Override the default timeout (seconds).
    pub timeout: Option<u64>,

    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,

    /// Telemetry gateway endpoint (`ws://` or `wss://`).
    pub stream_url: Option<String>,
    pub reconnect_interval_ms: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "routerlink", "routerlink").map_or_else(
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
    p.push("routerlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if present), then `ROUTERLINK_*`
/// variables. Nested keys use a double underscore.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve a profile's password.
///
/// Order: the profile's `password_env` variable, `ROUTERLINK_PASSWORD`, the
/// system keyring (`routerlink` / `{profile}/password`), then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(pw));
    }

    // 2. Global env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation to API configs ──────────────────────────────────────

/// Build a `ClientConfig` from a profile, without CLI flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }

    let username = profile
        .username
        .clone()
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let password = resolve_password(profile, profile_name)?;

    build_client_config(profile, defaults, username, password)
}

/// Build a `ClientConfig` from a profile with credentials already resolved.
pub fn build_client_config(
    profile: &Profile,
    defaults: &Defaults,
    username: String,
    password: SecretString,
) -> Result<ClientConfig, ConfigError> {
    let mut cfg = ClientConfig::new(profile.host.trim(), username, password)
        .with_tls(profile.tls.unwrap_or(true))
        .with_verify_tls(!profile.insecure.unwrap_or(true))
        .with_timeout(Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)))
        .with_retry(
            profile.retry_attempts.unwrap_or(defaults.retry_attempts),
            Duration::from_millis(profile.retry_delay_ms.unwrap_or(defaults.retry_delay_ms)),
        );
    if let Some(port) = profile.port {
        cfg = cfg.with_port(port);
    }
    if let Some(ref base_path) = profile.base_path {
        cfg = cfg.with_base_path(base_path.clone());
    }

    // Surface a bad host or base path here rather than on the first request.
    cfg.base_url().map_err(|e| ConfigError::Validation {
        field: "host".into(),
        reason: e.to_string(),
    })?;
    Ok(cfg)
}

/// Build a `StreamConfig` from a profile's `stream_url` and reconnect settings.
pub fn profile_to_stream_config(profile: &Profile) -> Result<StreamConfig, ConfigError> {
    let raw = profile
        .stream_url
        .as_deref()
        .ok_or_else(|| ConfigError::Validation {
            field: "stream_url".into(),
            reason: "not configured".into(),
        })?;
    stream_config(raw, profile)
}

/// Apply a profile's reconnect settings to an explicit endpoint.
pub fn stream_config(url: &str, profile: &Profile) -> Result<StreamConfig, ConfigError> {
    let cfg = StreamConfig::parse(url).map_err(|e| ConfigError::Validation {
        field: "stream_url".into(),
        reason: e.to_string(),
    })?;
    let interval = profile
        .reconnect_interval_ms
        .map_or(cfg.reconnect_interval, Duration::from_millis);
    let max = profile
        .max_reconnect_attempts
        .unwrap_or(cfg.max_reconnect_attempts);
    Ok(cfg.with_reconnect(interval, max))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile() -> Profile {
        Profile {
            host: "10.0.0.1".into(),
            username: Some("admin".into()),
            ..Profile::default()
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "edge"

[defaults]
timeout = 20

[profiles.edge]
host = "192.168.88.1"
username = "admin"
password = "hunter2"
port = 8443
insecure = false
retry_attempts = 5
stream_url = "ws://192.168.88.10:3001/ws"
reconnect_interval_ms = 2000
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.timeout, 20);
        assert_eq!(cfg.defaults.output, "json");

        let (name, edge) = cfg.profile(None).unwrap();
        assert_eq!(name, "edge");
        assert_eq!(edge.port, Some(8443));

        let client = build_client_config(
            edge,
            &cfg.defaults,
            "admin".into(),
            SecretString::from("hunter2".to_string()),
        )
        .unwrap();
        assert_eq!(client.effective_port(), 8443);
        assert!(client.use_tls);
        assert!(client.verify_tls);
        assert_eq!(client.timeout, Duration::from_secs(20));
        assert_eq!(client.retry_attempts, 5);
        assert_eq!(client.retry_delay_base, Duration::from_millis(1000));

        let stream = profile_to_stream_config(edge).unwrap();
        assert_eq!(stream.reconnect_interval, Duration::from_millis(2000));
        assert_eq!(stream.max_reconnect_attempts, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
        assert!(cfg.profile(None).is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile());

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].host, "10.0.0.1");
    }

    #[test]
    fn password_resolution_order() {
        let mut p = profile();
        p.password = Some("plain".into());
        p.password_env = Some("EDGE_PW".into());

        let env = |name: &str| match name {
            "EDGE_PW" => Some("from-profile-env".to_string()),
            PASSWORD_ENV => Some("from-global-env".to_string()),
            _ => None,
        };
        let keyring = |_: &str| Some("from-keyring".to_string());

        let pw = resolve_password_with(&p, "edge", env, keyring).unwrap();
        assert_eq!(pw.expose_secret(), "from-profile-env");

        let global_only = |name: &str| (name == PASSWORD_ENV).then(|| "from-global-env".to_string());
        let pw = resolve_password_with(&p, "edge", global_only, keyring).unwrap();
        assert_eq!(pw.expose_secret(), "from-global-env");

        let pw = resolve_password_with(&p, "edge", no_env, keyring).unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");

        let pw = resolve_password_with(&p, "edge", no_env, no_env).unwrap();
        assert_eq!(pw.expose_secret(), "plain");

        p.password = None;
        assert!(matches!(
            resolve_password_with(&p, "edge", no_env, no_env),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn client_defaults_accept_self_signed() {
        let cfg = build_client_config(
            &profile(),
            &Defaults::default(),
            "admin".into(),
            SecretString::from("pw".to_string()),
        )
        .unwrap();
        assert!(!cfg.verify_tls);
        assert_eq!(cfg.base_path, "/rest");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.retry_attempts, 3);
    }

    #[test]
    fn empty_host_is_rejected() {
        let mut p = profile();
        p.host = "  ".into();
        assert!(matches!(
            profile_to_client_config(&p, "default", &Defaults::default()),
            Err(ConfigError::Validation { ref field, .. }) if field == "host"
        ));
    }

    #[test]
    fn stream_url_must_be_websocket() {
        let mut p = profile();
        assert!(profile_to_stream_config(&p).is_err());

        p.stream_url = Some("https://10.0.0.1/ws".into());
        assert!(matches!(
            profile_to_stream_config(&p),
            Err(ConfigError::Validation { ref field, .. }) if field == "stream_url"
        ));
    }
}
