// Wire unit for the telemetry channel, used in both directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

/// Discriminant of a [`SubscriptionEnvelope`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EnvelopeKind {
    Subscribe,
    Unsubscribe,
    Ping,
    Pong,
    Metrics,
    DeviceStatus,
    InterfaceMetricsCollected,
    Error,
    /// Any type this client does not know yet. Still dispatched.
    #[serde(other)]
    Unknown,
}

/// `{type, deviceId?, payload?, timestamp}`
///
/// `timestamp` goes out as epoch milliseconds and is accepted as epoch
/// milliseconds or an RFC 3339 string. A missing timestamp is stamped with
/// the receive time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEnvelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::models::lenient::opt_string"
    )]
    pub device_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(with = "epoch_millis", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl SubscriptionEnvelope {
    pub fn new(kind: EnvelopeKind) -> Self {
        Self {
            kind,
            device_id: None,
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn subscribe(device_id: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::Subscribe).with_device(device_id)
    }

    pub fn unsubscribe(device_id: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::Unsubscribe).with_device(device_id)
    }

    pub fn ping() -> Self {
        Self::new(EnvelopeKind::Ping)
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// `true` for the two metric-carrying kinds.
    pub fn is_metric(&self) -> bool {
        matches!(
            self.kind,
            EnvelopeKind::Metrics | EnvelopeKind::InterfaceMetricsCollected
        )
    }
}

mod epoch_millis {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ts.timestamp_millis())
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Utc::now()),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {n}"))),
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!("invalid timestamp: {other}"))),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
