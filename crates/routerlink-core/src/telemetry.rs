// ── Per-device telemetry store ──
//
// Folds inbound stream envelopes into bounded per-device windows. Reads
// are snapshots; writes take one DashMap shard lock per envelope.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use routerlink_api::{EnvelopeKind, StreamEvent, SubscriptionEnvelope};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::CoreError;
use crate::window::{DEFAULT_WINDOW_CAPACITY, MetricWindow};

/// One metric reading as it arrived on the stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

/// Everything known about one device's stream.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceTelemetry {
    pub device_id: String,
    /// `metrics` envelopes, oldest first.
    pub metrics: MetricWindow<MetricSample>,
    /// `interface-metrics-collected` envelopes, oldest first.
    pub interface_metrics: MetricWindow<MetricSample>,
    /// Last subscription status reported by the gateway.
    pub subscribed: bool,
    pub last_error: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceTelemetry {
    fn new(device_id: &str, capacity: usize) -> Self {
        Self {
            device_id: device_id.to_owned(),
            metrics: MetricWindow::with_capacity(capacity),
            interface_metrics: MetricWindow::with_capacity(capacity),
            subscribed: false,
            last_error: None,
            last_seen: None,
        }
    }
}

/// Thread-safe store of per-device telemetry.
pub struct TelemetryStore {
    devices: DashMap<String, DeviceTelemetry>,
    capacity: usize,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WINDOW_CAPACITY)
    }

    /// Store whose windows hold `capacity` samples per series.
    pub fn with_capacity(capacity: usize) -> Self {
        let (last_update, _) = watch::channel(None);
        Self {
            devices: DashMap::new(),
            capacity: capacity.max(1),
            last_update,
        }
    }

    // ── Ingest ───────────────────────────────────────────────────────

    /// Fold one envelope into the store.
    ///
    /// Returns `Ok(true)` when the envelope changed device state and
    /// `Ok(false)` for kinds the store does not track (`pong`, echoes of
    /// our own requests, unknown types).
    pub fn apply(&self, envelope: &SubscriptionEnvelope) -> Result<bool, CoreError> {
        let kind = envelope.kind;
        match kind {
            EnvelopeKind::Metrics | EnvelopeKind::InterfaceMetricsCollected => {
                let sample = MetricSample {
                    timestamp: envelope.timestamp,
                    payload: envelope.payload.clone().unwrap_or(Value::Null),
                };
                self.update(envelope, |device| {
                    if kind == EnvelopeKind::Metrics {
                        device.metrics.push(sample);
                    } else {
                        device.interface_metrics.push(sample);
                    }
                })?;
            }
            EnvelopeKind::DeviceStatus => {
                let subscribed = subscription_status(envelope.payload.as_ref()).ok_or_else(|| {
                    CoreError::InvalidPayload {
                        kind,
                        message: "expected `subscribed` or `status`".into(),
                    }
                })?;
                self.update(envelope, |device| device.subscribed = subscribed)?;
            }
            EnvelopeKind::Error => {
                let message = error_message(envelope.payload.as_ref());
                if envelope.device_id.is_none() {
                    warn!(%message, "telemetry gateway reported an error");
                    return Ok(false);
                }
                self.update(envelope, |device| device.last_error = Some(message))?;
            }
            EnvelopeKind::Pong
            | EnvelopeKind::Ping
            | EnvelopeKind::Subscribe
            | EnvelopeKind::Unsubscribe
            | EnvelopeKind::Unknown => {
                trace!(%kind, "envelope not tracked");
                return Ok(false);
            }
        }

        self.last_update.send_replace(Some(envelope.timestamp));
        Ok(true)
    }

    fn update(
        &self,
        envelope: &SubscriptionEnvelope,
        f: impl FnOnce(&mut DeviceTelemetry),
    ) -> Result<(), CoreError> {
        let device_id = envelope
            .device_id
            .as_deref()
            .ok_or(CoreError::MissingDevice { kind: envelope.kind })?;

        let mut entry = self
            .devices
            .entry(device_id.to_owned())
            .or_insert_with(|| DeviceTelemetry::new(device_id, self.capacity));
        f(&mut entry);
        entry.last_seen = Some(envelope.timestamp);
        Ok(())
    }

    /// Apply stream messages one at a time until cancelled or the stream
    /// closes. Other stream events are ignored.
    pub async fn run(
        &self,
        mut events: broadcast::Receiver<StreamEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(StreamEvent::Message(envelope)) => {
                        if let Err(e) = self.apply(&envelope) {
                            debug!(error = %e, "envelope rejected by telemetry store");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "telemetry store lagged behind the stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn device(&self, device_id: &str) -> Option<DeviceTelemetry> {
        self.devices.get(device_id).map(|entry| entry.value().clone())
    }

    pub fn is_subscribed(&self, device_id: &str) -> bool {
        self.devices
            .get(device_id)
            .is_some_and(|entry| entry.subscribed)
    }

    /// Known device ids, sorted.
    pub fn devices(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn subscribe_updates(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_update.subscribe()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    pub fn remove(&self, device_id: &str) -> Option<DeviceTelemetry> {
        self.devices.remove(device_id).map(|(_, v)| v)
    }

    pub fn clear(&self) {
        self.devices.clear();
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Payload helpers ──────────────────────────────────────────────────

/// `{"subscribed": true}` or `{"status": "subscribed" | "unsubscribed"}`.
fn subscription_status(payload: Option<&Value>) -> Option<bool> {
    let payload = payload?;
    if let Some(flag) = payload.get("subscribed").and_then(Value::as_bool) {
        return Some(flag);
    }
    match payload.get("status").and_then(Value::as_str)? {
        "subscribed" => Some(true),
        "unsubscribed" => Some(false),
        _ => None,
    }
}

fn error_message(payload: Option<&Value>) -> String {
    match payload {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map_or_else(|| Value::Object(map.clone()).to_string(), str::to_owned),
        Some(other) => other.to_string(),
        None => "unknown error".into(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
