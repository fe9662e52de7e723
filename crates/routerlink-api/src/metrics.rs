//! Formatted system metrics.
//!
//! Composes the resource query with an optional health query and turns the
//! device's free-text counters into numbers. A missing health endpoint or an
//! unparseable field only drops that field; it never fails the call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::Error;
use crate::models::SystemResource;
use crate::response::ApiResponse;

/// Device load summary, ready for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_load_percent: Option<f64>,
    pub memory_free: Option<u64>,
    pub memory_total: Option<u64>,
    pub memory_used_percent: Option<f64>,
    pub storage_free: Option<u64>,
    pub storage_total: Option<u64>,
    pub storage_used_percent: Option<f64>,
    pub uptime: Option<String>,
    pub version: Option<String>,
    pub board_name: Option<String>,
    /// Only present when the device exposes a health endpoint with a
    /// temperature sensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
}

impl SystemMetrics {
    pub fn from_resource(resource: &SystemResource) -> Self {
        let memory_free = resource.free_memory.as_deref().and_then(parse_counter);
        let memory_total = resource.total_memory.as_deref().and_then(parse_counter);
        let storage_free = resource.free_hdd_space.as_deref().and_then(parse_counter);
        let storage_total = resource.total_hdd_space.as_deref().and_then(parse_counter);

        Self {
            cpu_load_percent: resource.cpu_load.as_deref().and_then(parse_percentage),
            memory_free,
            memory_total,
            memory_used_percent: used_percent(memory_free, memory_total),
            storage_free,
            storage_total,
            storage_used_percent: used_percent(storage_free, storage_total),
            uptime: resource.uptime.clone(),
            version: resource.version.clone(),
            board_name: resource.board_name.clone(),
            temperature_celsius: None,
        }
    }
}

impl DeviceClient {
    /// Resource summary plus temperature, when available.
    ///
    /// A failed resource query comes back as the same `success: false`
    /// envelope. A failed health query is logged and ignored.
    pub async fn get_formatted_system_metrics(&self) -> Result<ApiResponse<SystemMetrics>, Error> {
        let resource = self.get_system_resource().await?;
        if !resource.success {
            return Ok(resource.cast_failure());
        }

        let status = resource.status;
        let mut metrics = resource
            .data
            .as_ref()
            .map(SystemMetrics::from_resource)
            .unwrap_or_default();

        match self.get_system_health().await {
            Ok(ApiResponse {
                success: true,
                data: Some(health),
                ..
            }) => {
                metrics.temperature_celsius = temperature_from_health(&health);
            }
            Ok(resp) => {
                debug!(status = resp.status, "health endpoint unavailable, omitting temperature");
            }
            Err(e) => {
                debug!(error = %e, "health query failed, omitting temperature");
            }
        }

        Ok(ApiResponse::ok(status, metrics))
    }
}

// ── Parsing helpers ──────────────────────────────────────────────────

/// First decimal number in a free-text field: `"12"`, `"12%"`, `"cpu 7.5 %"`.
pub fn parse_percentage(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

/// Byte counter as plain digits or with a binary unit suffix (`"64.5MiB"`).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_counter(text: &str) -> Option<u64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<u64>() {
        return Some(value);
    }

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;
    let multiplier: f64 = match unit.trim() {
        "" | "B" => 1.0,
        "KiB" | "KB" | "K" => 1024.0,
        "MiB" | "MB" | "M" => 1024.0 * 1024.0,
        "GiB" | "GB" | "G" => 1024.0 * 1024.0 * 1024.0,
        "TiB" | "TB" | "T" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((number * multiplier).round() as u64)
}

#[allow(clippy::cast_precision_loss)]
fn used_percent(free: Option<u64>, total: Option<u64>) -> Option<f64> {
    let (free, total) = (free?, total?);
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(free) as f64;
    Some((used / total as f64 * 1000.0).round() / 10.0)
}

/// Pull a temperature out of either health shape.
///
/// Object form: `{"temperature": "41", "voltage": "24.1"}`.
/// List form: `[{"name": "cpu-temperature", "value": "52", "type": "C"}]`.
pub fn temperature_from_health(health: &Value) -> Option<f64> {
    match health {
        Value::Object(map) => map
            .get("temperature")
            .or_else(|| map.get("cpu-temperature"))
            .and_then(number_like),
        Value::Array(entries) => {
            let named = entries.iter().find_map(|entry| {
                let name = entry.get("name")?.as_str()?;
                if name.contains("temperature") {
                    entry.get("value").and_then(number_like)
                } else {
                    None
                }
            });
            named.or_else(|| {
                entries
                    .iter()
                    .find_map(|entry| entry.get("temperature").and_then(number_like))
            })
        }
        _ => None,
    }
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_percentage(s),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn percentage_from_free_text() {
        assert_eq!(parse_percentage("12"), Some(12.0));
        assert_eq!(parse_percentage("12%"), Some(12.0));
        assert_eq!(parse_percentage("load: 7.5 %"), Some(7.5));
        assert_eq!(parse_percentage("n/a"), None);
    }

    #[test]
    fn counters_with_and_without_units() {
        assert_eq!(parse_counter("268435456"), Some(268_435_456));
        assert_eq!(parse_counter("1KiB"), Some(1024));
        assert_eq!(parse_counter("1.5MiB"), Some(1_572_864));
        assert_eq!(parse_counter("12 parsecs"), None);
    }

    #[test]
    fn metrics_from_resource() {
        let resource: SystemResource = serde_json::from_value(json!({
            "cpu-load": "25%",
            "free-memory": "64",
            "total-memory": "256",
            "free-hdd-space": "75",
            "total-hdd-space": "100",
            "uptime": "3d4h",
            "board-name": "hAP ac2"
        }))
        .unwrap();

        let m = SystemMetrics::from_resource(&resource);
        assert_eq!(m.cpu_load_percent, Some(25.0));
        assert_eq!(m.memory_used_percent, Some(75.0));
        assert_eq!(m.storage_used_percent, Some(25.0));
        assert_eq!(m.board_name.as_deref(), Some("hAP ac2"));
        assert!(m.temperature_celsius.is_none());
    }

    #[test]
    fn zero_total_has_no_percentage() {
        assert_eq!(used_percent(Some(0), Some(0)), None);
        assert_eq!(used_percent(None, Some(10)), None);
    }

    #[test]
    fn temperature_from_both_health_shapes() {
        assert_eq!(
            temperature_from_health(&json!({"voltage": "24.1", "temperature": "41"})),
            Some(41.0)
        );
        assert_eq!(
            temperature_from_health(&json!([
                {"name": "voltage", "value": "24.1", "type": "V"},
                {"name": "cpu-temperature", "value": "52", "type": "C"}
            ])),
            Some(52.0)
        );
        assert_eq!(
            temperature_from_health(&json!([{"temperature": 38.5}])),
            Some(38.5)
        );
        assert_eq!(temperature_from_health(&json!([])), None);
    }
}
