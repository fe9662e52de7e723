// ── Observable connection state and stream errors ──

use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use super::envelope::SubscriptionEnvelope;
use crate::error::{ConnectionErrorCode, chain_contains_tls_error, render_chain};

/// Where the manager sits in `disconnected → connecting → connected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Lost the socket unexpectedly; waiting out the reconnect interval.
    Reconnecting,
}

/// Snapshot of the manager's connection. Observers only ever see copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    pub is_connected: bool,
    pub is_connecting: bool,
    /// Reconnect cycles since the last successful open.
    pub reconnect_attempts: u32,
    /// Sockets opened over the manager's lifetime. Changes on every open,
    /// even when a drop and reopen land between two observations.
    pub connections: u64,
    pub last_error: Option<StreamError>,
    pub last_message: Option<Arc<SubscriptionEnvelope>>,
}

impl ConnectionState {
    pub(crate) fn set_phase(&mut self, phase: ConnectionPhase) {
        self.phase = phase;
        self.is_connected = phase == ConnectionPhase::Connected;
        self.is_connecting = phase == ConnectionPhase::Connecting;
    }
}

/// Event-stream failures, classified with the same four-way code as the
/// control-plane client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Handshake or socket failure.
    #[error("WebSocket connection error ({code}): {message}")]
    ConnectionFailed {
        code: ConnectionErrorCode,
        message: String,
    },

    /// The peer closed the socket without being asked to.
    #[error("WebSocket closed unexpectedly (code {code:?}): {reason}")]
    ConnectionLost { code: Option<u16>, reason: String },

    /// The reconnect budget is spent; the manager stays disconnected until
    /// `connect()` is called again.
    #[error("WebSocket reconnection limit reached after {attempts} attempts")]
    ReconnectLimitReached { attempts: u32 },

    /// The endpoint URL cannot be used for a WebSocket.
    #[error("Failed to create WebSocket connection: {0}")]
    InvalidUrl(String),
}

impl StreamError {
    /// Four-way code for callers that branch on failure kind.
    pub fn code(&self) -> ConnectionErrorCode {
        match self {
            Self::ConnectionFailed { code, .. } => *code,
            Self::ConnectionLost { .. }
            | Self::ReconnectLimitReached { .. }
            | Self::InvalidUrl(_) => ConnectionErrorCode::ConnectionFailed,
        }
    }

    /// Classify a tungstenite failure from typed variants first.
    pub(crate) fn from_ws(err: &tungstenite::Error) -> Self {
        if let tungstenite::Error::Url(url_err) = err {
            return Self::InvalidUrl(url_err.to_string());
        }

        let code = match err {
            tungstenite::Error::Http(resp) if resp.status().as_u16() == 401 => {
                ConnectionErrorCode::AuthenticationFailed
            }
            tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                ConnectionErrorCode::Timeout
            }
            other if chain_contains_tls_error(other) => ConnectionErrorCode::SslError,
            other => ConnectionErrorCode::classify_message(&render_chain(other)),
        };

        Self::ConnectionFailed {
            code,
            message: render_chain(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_flags_follow_phase() {
        let mut state = ConnectionState::default();
        assert_eq!(state.phase, ConnectionPhase::Disconnected);
        assert!(!state.is_connected && !state.is_connecting);

        state.set_phase(ConnectionPhase::Connecting);
        assert!(state.is_connecting && !state.is_connected);

        state.set_phase(ConnectionPhase::Connected);
        assert!(state.is_connected && !state.is_connecting);

        state.set_phase(ConnectionPhase::Reconnecting);
        assert!(!state.is_connected && !state.is_connecting);
    }

    #[test]
    fn io_errors_are_classified() {
        let refused = tungstenite::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(
            StreamError::from_ws(&refused).code(),
            ConnectionErrorCode::ConnectionFailed
        );

        let timed_out = tungstenite::Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "deadline",
        ));
        assert_eq!(
            StreamError::from_ws(&timed_out).code(),
            ConnectionErrorCode::Timeout
        );
    }

    #[test]
    fn url_errors_become_invalid_url() {
        let err = tungstenite::Error::Url(tungstenite::error::UrlError::UnsupportedUrlScheme);
        assert!(matches!(StreamError::from_ws(&err), StreamError::InvalidUrl(_)));
    }

    #[test]
    fn connection_error_message() {
        let err = StreamError::ConnectionFailed {
            code: ConnectionErrorCode::ConnectionFailed,
            message: "refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "WebSocket connection error (CONNECTION_FAILED): refused"
        );
    }
}
