// ── Control-plane client configuration ──
//
// Describes *how* to reach one device. Carries credentials and retry
// tuning, never touches disk -- `routerlink-config` builds these.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

pub const DEFAULT_BASE_PATH: &str = "/rest";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_BASE: Duration = Duration::from_millis(1_000);

/// Connection settings for a single device.
///
/// Handed to [`DeviceClient::new`](crate::DeviceClient::new), which keeps its
/// own copy; the client never mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hostname or IP address of the device.
    pub host: String,
    /// Explicit port. `None` derives 443/80 from `use_tls`.
    pub port: Option<u16>,
    pub username: String,
    pub password: SecretString,
    /// Use HTTPS for the control plane.
    pub use_tls: bool,
    /// Path prefix every operation path is appended to.
    pub base_path: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Validate the device certificate. Off by default: appliances
    /// usually ship self-signed certificates.
    pub verify_tls: bool,
    /// Total attempts per operation (minimum 1).
    pub retry_attempts: u32,
    /// Linear backoff unit: the wait after attempt `n` is `n * retry_delay_base`.
    pub retry_delay_base: Duration,
}

impl ClientConfig {
    /// Config with documented defaults for everything but the address and
    /// credentials.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: username.into(),
            password: password.into(),
            use_tls: true,
            base_path: DEFAULT_BASE_PATH.into(),
            timeout: DEFAULT_TIMEOUT,
            verify_tls: false,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_base: DEFAULT_RETRY_DELAY_BASE,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay_base: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_base = delay_base;
        self
    }

    /// The port actually dialed.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.use_tls { 443 } else { 80 })
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    /// `{scheme}://{host}:{port}{base_path}` with a normalized prefix
    /// (leading slash, no trailing slash).
    pub fn base_url(&self) -> Result<Url, Error> {
        let trimmed = self.base_path.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        let raw = format!(
            "{}://{}:{}{prefix}",
            self.scheme(),
            self.host,
            self.effective_port()
        );
        Ok(Url::parse(&raw)?)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
