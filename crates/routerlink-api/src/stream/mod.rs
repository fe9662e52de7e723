//! Telemetry event stream with a single resilient socket.
//!
//! A [`SubscriptionManager`] keeps one WebSocket open to a telemetry gateway,
//! multiplexes per-device subscriptions over it, and fans inbound
//! [`SubscriptionEnvelope`]s out to any number of listeners through a
//! [`tokio::sync::broadcast`] channel. After an unexpected close it waits a
//! fixed interval and reconnects, up to a configured number of cycles.
//!
//! # Example
//!
//! ```rust,ignore
//! use routerlink_api::stream::{StreamConfig, StreamEvent, SubscriptionManager};
//!
//! let manager = SubscriptionManager::new(StreamConfig::parse("ws://10.0.0.5:8080/ws")?);
//! let mut events = manager.events();
//! manager.connect();
//!
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         StreamEvent::Connected => { manager.subscribe("router-1"); }
//!         StreamEvent::Message(env) => println!("{}: {:?}", env.kind, env.payload),
//!         _ => {}
//!     }
//! }
//!
//! manager.disconnect();
//! ```

mod envelope;
mod manager;
mod state;

use std::sync::Arc;
use std::time::Duration;

use url::Url;

pub use envelope::{EnvelopeKind, SubscriptionEnvelope};
pub use manager::SubscriptionManager;
pub use state::{ConnectionPhase, ConnectionState, StreamError};

pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ── StreamConfig ─────────────────────────────────────────────────────

/// Endpoint and reconnect policy for a [`SubscriptionManager`].
///
/// Reconnects use a *fixed* interval, unlike the control-plane client's
/// linear backoff.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: Url,
    /// Wait between an unexpected close and the next connection attempt.
    pub reconnect_interval: Duration,
    /// Reconnect cycles allowed before giving up.
    pub max_reconnect_attempts: u32,
    /// Per-listener buffer. Slow listeners see `RecvError::Lagged`.
    pub event_capacity: usize,
}

impl StreamConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Parse and validate a `ws://` or `wss://` endpoint.
    pub fn parse(raw: &str) -> Result<Self, StreamError> {
        let url = Url::parse(raw).map_err(|e| StreamError::InvalidUrl(format!("{raw}: {e}")))?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self::new(url)),
            other => Err(StreamError::InvalidUrl(format!(
                "{raw}: unsupported scheme '{other}'"
            ))),
        }
    }

    pub fn with_reconnect(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.reconnect_interval = interval;
        self.max_reconnect_attempts = max_attempts;
        self
    }
}

// ── StreamEvent ──────────────────────────────────────────────────────

/// Everything a listener can observe, in arrival order.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Socket opened; the reconnect counter is back at zero.
    Connected,
    /// Socket closed. `requested` is `true` only for `disconnect()`.
    Disconnected {
        code: Option<u16>,
        reason: String,
        requested: bool,
    },
    Error(StreamError),
    Message(Arc<SubscriptionEnvelope>),
}
