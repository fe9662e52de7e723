// routerlink-core: Consumer-side state between routerlink-api and its front ends.

pub mod error;
pub mod telemetry;
pub mod watch;
pub mod window;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use telemetry::{DeviceTelemetry, MetricSample, TelemetryStore};
pub use watch::DeviceWatch;
pub use window::{DEFAULT_WINDOW_CAPACITY, MetricWindow};
