use std::error::Error as StdError;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Boxed transport cause carried inside a [`ConnectionError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Top-level error type for the `routerlink-api` crate.
///
/// Transport failures are folded into [`ConnectionError`] with a four-way
/// code. Application-level failures (non-2xx bodies) are *not* errors at this
/// layer; they come back as [`ApiResponse`](crate::ApiResponse) data.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Classified transport failure, raised after retries are exhausted
    /// or immediately for authentication failures.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed (TLS backend, bad header, ...).
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The client was closed and its connection pool released.
    #[error("Client has been closed")]
    Closed,

    // ── Data ────────────────────────────────────────────────────────
    /// A 2xx body could not be parsed. Never retried.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A `success: false` envelope converted via
    /// [`ApiResponse::into_result`](crate::ApiResponse::into_result).
    #[error("Device API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// The classified connection code, if this is a transport failure.
    pub fn connection_code(&self) -> Option<ConnectionErrorCode> {
        match self {
            Self::Connection(e) => Some(e.code),
            _ => None,
        }
    }

    /// Returns `true` if the device rejected the credentials.
    pub fn is_auth_failure(&self) -> bool {
        self.connection_code() == Some(ConnectionErrorCode::AuthenticationFailed)
    }

    /// Returns `true` if this is a transport error the retry loop may repeat.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(e) if e.is_retryable())
    }
}

// ── ConnectionErrorCode ──────────────────────────────────────────────

/// Four-way transport failure taxonomy shared by the control-plane client
/// and the event stream.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionErrorCode {
    ConnectionFailed,
    AuthenticationFailed,
    Timeout,
    SslError,
}

impl ConnectionErrorCode {
    /// Classify a `reqwest` failure.
    ///
    /// Typed signals come first (HTTP 401, timeout flag, a `rustls` error in
    /// the source chain). Anything else falls back to message matching over
    /// the rendered error chain.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            return Self::AuthenticationFailed;
        }
        if err.is_timeout() {
            return Self::Timeout;
        }
        if chain_contains_tls_error(err) {
            return Self::SslError;
        }

        // The URL is stripped first: a port such as `:40123` must not read as "401".
        let mut message = render_chain(err);
        if let Some(url) = err.url() {
            message = message.replace(url.as_str(), "");
        }
        match Self::classify_message(&message) {
            Self::AuthenticationFailed if err.is_connect() => Self::ConnectionFailed,
            code => code,
        }
    }

    /// Substring heuristic used when no typed cause is available.
    ///
    /// Order matters: an auth marker wins over a timeout marker, which wins
    /// over a TLS marker.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if ["401", "authentication", "unauthorized"]
            .iter()
            .any(|m| lower.contains(m))
        {
            Self::AuthenticationFailed
        } else if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout
        } else if ["ssl", "certificate", "tls"].iter().any(|m| lower.contains(m)) {
            Self::SslError
        } else {
            Self::ConnectionFailed
        }
    }
}

// ── ConnectionError ──────────────────────────────────────────────────

/// A classified transport failure against a specific device.
#[derive(Debug, Error)]
#[error("{code}: {message} ({host}:{port})")]
pub struct ConnectionError {
    pub code: ConnectionErrorCode,
    pub message: String,
    pub host: String,
    pub port: u16,
    /// The underlying transport cause, kept for diagnostics.
    #[source]
    pub source: Option<BoxError>,
}

impl ConnectionError {
    pub fn new(
        code: ConnectionErrorCode,
        message: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            host: host.into(),
            port,
            source: None,
        }
    }

    /// Classify a `reqwest` error and wrap it with the device address.
    pub fn from_transport(err: reqwest::Error, host: &str, port: u16) -> Self {
        let code = ConnectionErrorCode::classify(&err);
        Self {
            code,
            message: render_chain(&err),
            host: host.to_owned(),
            port,
            source: Some(Box::new(err)),
        }
    }

    /// Attach the original cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Authentication failures are never retried.
    pub fn is_retryable(&self) -> bool {
        self.code != ConnectionErrorCode::AuthenticationFailed
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Render an error and all of its sources as `outer: inner: root`.
pub(crate) fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

/// `io::Error::source()` skips its custom payload, so TLS failures wrapped
/// in an `io::Error` are checked through `get_ref()` as well.
pub(crate) fn chain_contains_tls_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<rustls::Error>() {
            return true;
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.get_ref().is_some_and(|inner| inner.is::<rustls::Error>()) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn classify_message_auth_markers() {
        for msg in [
            "Request failed with status code 401",
            "Authentication required",
            "UNAUTHORIZED",
        ] {
            assert_eq!(
                ConnectionErrorCode::classify_message(msg),
                ConnectionErrorCode::AuthenticationFailed,
                "{msg}"
            );
        }
    }

    #[test]
    fn classify_message_timeout_and_tls() {
        assert_eq!(
            ConnectionErrorCode::classify_message("operation timeout after 10000ms"),
            ConnectionErrorCode::Timeout
        );
        assert_eq!(
            ConnectionErrorCode::classify_message("connection timed out"),
            ConnectionErrorCode::Timeout
        );
        assert_eq!(
            ConnectionErrorCode::classify_message("invalid peer certificate: UnknownIssuer"),
            ConnectionErrorCode::SslError
        );
        assert_eq!(
            ConnectionErrorCode::classify_message("SSL routines::wrong version number"),
            ConnectionErrorCode::SslError
        );
    }

    #[test]
    fn classify_message_defaults_to_connection_failed() {
        assert_eq!(
            ConnectionErrorCode::classify_message("connect ECONNREFUSED 10.0.0.1:443"),
            ConnectionErrorCode::ConnectionFailed
        );
    }

    #[test]
    fn code_renders_in_wire_form() {
        assert_eq!(ConnectionErrorCode::SslError.to_string(), "SSL_ERROR");
        assert_eq!(
            ConnectionErrorCode::AuthenticationFailed.as_ref(),
            "AUTHENTICATION_FAILED"
        );
        assert_eq!(
            serde_json::to_string(&ConnectionErrorCode::ConnectionFailed).unwrap(),
            "\"CONNECTION_FAILED\""
        );
    }

    #[test]
    fn connection_error_display_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ConnectionError::new(
            ConnectionErrorCode::ConnectionFailed,
            "connect failed",
            "10.0.0.1",
            443,
        )
        .with_source(io);

        assert_eq!(err.to_string(), "CONNECTION_FAILED: connect failed (10.0.0.1:443)");
        assert!(StdError::source(&err).is_some());
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_errors_are_not_transient() {
        let err: Error = ConnectionError::new(
            ConnectionErrorCode::AuthenticationFailed,
            "HTTP 401",
            "router",
            80,
        )
        .into();
        assert!(err.is_auth_failure());
        assert!(!err.is_transient());
        assert!(!Error::Closed.is_transient());
    }

    #[test]
    fn tls_error_detected_through_io_wrapper() {
        let io = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            rustls::Error::General("handshake".into()),
        );
        assert!(chain_contains_tls_error(&io));

        let plain = std::io::Error::new(std::io::ErrorKind::Other, "nope");
        assert!(!chain_contains_tls_error(&plain));
    }
}
