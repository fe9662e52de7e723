// Control-plane response models
//
// Appliances report almost every scalar as a string ("true", "1024", "12%"),
// and the field set drifts between firmware versions. Every model therefore
// keeps known fields as leniently-parsed options and flattens the rest into
// `extra`, so nothing the device sends is silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

type Extra = Map<String, Value>;

// ── System ───────────────────────────────────────────────────────────

/// `GET /system/resource`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SystemResource {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub uptime: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub build_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub free_memory: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub total_memory: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cpu: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cpu_count: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cpu_frequency: Option<String>,
    /// Free text on some firmwares ("12", "12%").
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cpu_load: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub free_hdd_space: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub total_hdd_space: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub architecture_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub board_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub platform: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `GET /system/identity`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemIdentity {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Interfaces ───────────────────────────────────────────────────────

/// `GET /interface`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Interface {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient::opt_string")]
    pub interface_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub mac_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub mtu: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub running: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub disabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub rx_byte: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tx_byte: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One sample from `POST /interface/monitor-traffic`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InterfaceTraffic {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub rx_bits_per_second: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tx_bits_per_second: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub rx_packets_per_second: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tx_packets_per_second: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── IP tables ────────────────────────────────────────────────────────

/// `GET /ip/address`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IpAddress {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub network: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub interface: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub dynamic: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub disabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `GET /ip/route`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Route {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dst_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub gateway: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub distance: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub routing_table: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub dynamic: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `GET /ip/arp`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArpEntry {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub mac_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub interface: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub dynamic: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub complete: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── DHCP ─────────────────────────────────────────────────────────────

/// `GET /ip/dhcp-server`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DhcpServer {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub interface: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub address_pool: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub lease_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub disabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `GET /ip/dhcp-server/lease`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DhcpLease {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub mac_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub host_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub expires_after: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_seen: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub dynamic: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Firewall ─────────────────────────────────────────────────────────

/// A filter or NAT rule (`GET /ip/firewall/filter`, `GET /ip/firewall/nat`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FirewallRule {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub chain: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub protocol: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub src_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dst_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dst_port: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub in_interface: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub out_interface: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub disabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bytes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub packets: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Wireless ─────────────────────────────────────────────────────────

/// `GET /interface/wireless/registration-table`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WirelessRegistration {
    #[serde(rename = ".id", default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub interface: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub mac_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub signal_strength: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tx_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub rx_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub uptime: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_ip: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Lenient scalar decoding ──────────────────────────────────────────

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accept a string, number or bool and keep it as text.
    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => Some(other.to_string()),
        })
    }

    /// Accept `true`, `"true"`, `"yes"`, `1` and their negatives.
    pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
            _ => None,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────
