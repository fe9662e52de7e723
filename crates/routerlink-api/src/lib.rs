// routerlink-api: Async client for appliance control planes (REST) and telemetry event streams

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod response;
pub mod retry;
pub mod stream;
pub mod transport;

mod endpoints;

pub use client::DeviceClient;
pub use config::ClientConfig;
pub use error::{ConnectionError, ConnectionErrorCode, Error};
pub use metrics::SystemMetrics;
pub use response::ApiResponse;
pub use retry::RetryPolicy;
pub use stream::{
    ConnectionPhase, ConnectionState, EnvelopeKind, StreamConfig, StreamError, StreamEvent,
    SubscriptionEnvelope, SubscriptionManager,
};
