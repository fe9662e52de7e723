// Pooled HTTP transport for the control-plane client.
//
// One `reqwest::Client` per device client. Connection reuse, keep-alive,
// TLS policy and the per-attempt timeout are all fixed here at build time.

use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Error;

/// Sockets a single device client may hold open (and requests in flight).
pub const MAX_CONNECTIONS: usize = 5;

const TCP_KEEPALIVE: Duration = Duration::from_secs(60);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const USER_AGENT: &str = concat!("routerlink/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode derived from [`ClientConfig::verify_tls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the bundled web PKI roots.
    Verify,
    /// Accept any certificate (self-signed appliances).
    DangerAcceptInvalid,
}

impl TlsMode {
    pub fn from_config(config: &ClientConfig) -> Self {
        if config.verify_tls {
            Self::Verify
        } else {
            Self::DangerAcceptInvalid
        }
    }
}

/// Transport settings for building the pooled HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: crate::config::DEFAULT_TIMEOUT,
            max_idle_per_host: MAX_CONNECTIONS,
        }
    }
}

impl From<&ClientConfig> for TransportConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            tls: TlsMode::from_config(config),
            timeout: config.timeout,
            max_idle_per_host: MAX_CONNECTIONS,
        }
    }
}

impl TransportConfig {
    /// Build a keep-alive `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .user_agent(USER_AGENT)
            .use_rustls_tls();

        if self.tls == TlsMode::DangerAcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(|e| Error::ClientBuild(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn transport_follows_client_config() {
        let cfg = ClientConfig::new("10.0.0.1", "admin", SecretString::from(String::new()))
            .with_verify_tls(true)
            .with_timeout(Duration::from_secs(3));
        let transport = TransportConfig::from(&cfg);
        assert_eq!(transport.tls, TlsMode::Verify);
        assert_eq!(transport.timeout, Duration::from_secs(3));
        assert_eq!(transport.max_idle_per_host, MAX_CONNECTIONS);
        assert!(transport.build_client().is_ok());
    }

    #[test]
    fn insecure_by_default() {
        let cfg = ClientConfig::new("10.0.0.1", "admin", SecretString::from(String::new()));
        assert_eq!(TlsMode::from_config(&cfg), TlsMode::DangerAcceptInvalid);
    }
}
