// ── Core error types ──
//
// Errors surfaced by the telemetry store and device watch. Transport-layer
// failures from routerlink-api are folded in through `From`.

use routerlink_api::{ConnectionErrorCode, EnvelopeKind, StreamError};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach device at {host}:{port} ({code}): {message}")]
    Connection {
        code: ConnectionErrorCode,
        host: String,
        port: u16,
        message: String,
    },

    #[error("Telemetry stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Device client has been closed")]
    Closed,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("'{kind}' envelope is missing a device id")]
    MissingDevice { kind: EnvelopeKind },

    #[error("Invalid '{kind}' payload: {message}")]
    InvalidPayload { kind: EnvelopeKind, message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Device API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The four-way transport code, when one applies.
    pub fn connection_code(&self) -> Option<ConnectionErrorCode> {
        match self {
            Self::Connection { code, .. } => Some(*code),
            Self::Stream(e) => Some(e.code()),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<routerlink_api::Error> for CoreError {
    fn from(err: routerlink_api::Error) -> Self {
        match err {
            routerlink_api::Error::Connection(e) => Self::Connection {
                code: e.code,
                host: e.host,
                port: e.port,
                message: e.message,
            },
            routerlink_api::Error::Closed => Self::Closed,
            routerlink_api::Error::Api { status, message } => Self::Api { status, message },
            routerlink_api::Error::Deserialization { message, body: _ } => {
                Self::Internal(format!("Deserialization error: {message}"))
            }
            routerlink_api::Error::InvalidUrl(e) => Self::Internal(format!("Invalid URL: {e}")),
            routerlink_api::Error::ClientBuild(msg) => Self::Internal(msg),
        }
    }
}
