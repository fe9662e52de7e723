//! CLI error types with miette diagnostics.
//!
//! Maps api, core and config errors into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use routerlink_api::{ConnectionErrorCode, StreamError};
use routerlink_config::ConfigError;
use routerlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to device at {host}:{port}")]
    #[diagnostic(
        code(routerlink::connection_failed),
        help(
            "Check that the device is reachable and its REST service is enabled.\n\
             Try --no-tls or --port if the service listens on plain HTTP."
        )
    )]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS handshake with {host}:{port} failed")]
    #[diagnostic(
        code(routerlink::tls_error),
        help("Use --insecure (-k) to accept a self-signed certificate.")
    )]
    TlsError { host: String, port: u16 },

    #[error("Request to {host}:{port} timed out")]
    #[diagnostic(
        code(routerlink::timeout),
        help("Increase the timeout with --timeout or check device load.")
    )]
    Timeout { host: String, port: u16 },

    #[error("Telemetry stream failed: {0}")]
    #[diagnostic(
        code(routerlink::stream),
        help("Check the gateway URL (--url or the profile's stream_url).")
    )]
    Stream(StreamError),

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed for {host}:{port}")]
    #[diagnostic(
        code(routerlink::auth_failed),
        help(
            "Verify the username and password for this device.\n\
             The password can come from --password, ROUTERLINK_PASSWORD,\n\
             the system keyring, or the profile."
        )
    )]
    AuthFailed { host: String, port: u16 },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(routerlink::no_credentials),
        help(
            "Pass --username and --password, set ROUTERLINK_PASSWORD,\n\
             or add username/password to the profile."
        )
    )]
    NoCredentials { profile: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Device API error (HTTP {status}): {message}")]
    #[diagnostic(code(routerlink::api_error))]
    Api { status: u16, message: String },

    #[error("Unexpected response from device: {message}")]
    #[diagnostic(code(routerlink::bad_response))]
    BadResponse { message: String },

    // ── Validation / configuration ───────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(routerlink::validation))]
    Validation { field: String, reason: String },

    #[error("No device selected")]
    #[diagnostic(
        code(routerlink::no_config),
        help(
            "Pass --host, or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(routerlink::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(routerlink::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } | Self::Stream(_) => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::ProfileNotFound { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Connection {
                code,
                host,
                port,
                message,
            } => match code {
                ConnectionErrorCode::AuthenticationFailed => Self::AuthFailed { host, port },
                ConnectionErrorCode::Timeout => Self::Timeout { host, port },
                ConnectionErrorCode::SslError => Self::TlsError { host, port },
                ConnectionErrorCode::ConnectionFailed => Self::ConnectionFailed {
                    host,
                    port,
                    source: message.into(),
                },
            },
            CoreError::Stream(e) => Self::Stream(e),
            CoreError::Closed => Self::Internal("device client already closed".into()),
            CoreError::Api { status, message } => Self::Api { status, message },
            CoreError::MissingDevice { .. } | CoreError::InvalidPayload { .. } => {
                Self::BadResponse {
                    message: err.to_string(),
                }
            }
            CoreError::Internal(message) => Self::BadResponse { message },
        }
    }
}

impl From<routerlink_api::Error> for CliError {
    fn from(err: routerlink_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<StreamError> for CliError {
    fn from(err: StreamError) -> Self {
        Self::Stream(err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownProfile { name, path: _ } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}
