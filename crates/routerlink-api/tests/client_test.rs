#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceClient` using wiremock.

use std::time::{Duration, Instant};

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use routerlink_api::{ClientConfig, ConnectionErrorCode, DeviceClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(port: u16) -> ClientConfig {
    ClientConfig::new("127.0.0.1", "admin", SecretString::from("secret".to_string()))
        .with_tls(false)
        .with_port(port)
        .with_retry(3, Duration::from_millis(10))
}

async fn setup() -> (MockServer, DeviceClient) {
    let server = MockServer::start().await;
    let client = DeviceClient::new(config_for(server.address().port())).unwrap();
    (server, client)
}

fn rest(suffix: &str) -> String {
    format!("/rest{suffix}")
}

// ── Success path ────────────────────────────────────────────────────

#[tokio::test]
async fn test_identity_success_with_basic_auth() {
    let (server, client) = setup().await;

    // "admin:secret"
    Mock::given(method("GET"))
        .and(path(rest("/system/identity")))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "core-router"})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.get_system_identity().await.unwrap();
    assert!(resp.success);
    assert_eq!(resp.status, 200);
    assert!(resp.error.is_none());
    assert_eq!(resp.data.unwrap().name.as_deref(), Some("core-router"));
}

#[tokio::test]
async fn test_list_interfaces() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/interface")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {".id": "*1", "name": "ether1", "type": "ether", "running": "true", "mtu": 1500},
            {".id": "*2", "name": "wlan1", "type": "wlan", "running": false, "disabled": "true"}
        ])))
        .mount(&server)
        .await;

    let ifaces = client.list_interfaces().await.unwrap().data.unwrap();
    assert_eq!(ifaces.len(), 2);
    assert_eq!(ifaces[0].id.as_deref(), Some("*1"));
    assert_eq!(ifaces[0].interface_type.as_deref(), Some("ether"));
    assert_eq!(ifaces[0].running, Some(true));
    assert_eq!(ifaces[0].mtu.as_deref(), Some("1500"));
    assert_eq!(ifaces[1].disabled, Some(true));
}

#[tokio::test]
async fn test_get_interface_by_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/interface/*1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({".id": "*1", "name": "ether1"})))
        .expect(1)
        .mount(&server)
        .await;

    let iface = client.get_interface("*1").await.unwrap().data.unwrap();
    assert_eq!(iface.name.as_deref(), Some("ether1"));
}

#[tokio::test]
async fn test_empty_body_yields_no_data() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/ip/route")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let resp = client.list_routes().await.unwrap();
    assert!(resp.success);
    assert_eq!(resp.status, 204);
    assert!(resp.data.is_none());
}

#[tokio::test]
async fn test_monitor_traffic_posts_single_sample() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(rest("/interface/monitor-traffic")))
        .and(body_json(json!({"interface": "ether1", "duration": "3s", "once": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "ether1", "rx-bits-per-second": "1200", "tx-bits-per-second": "800"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let samples = client
        .monitor_interface_traffic("ether1", Duration::from_secs(3))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(samples[0].rx_bits_per_second.as_deref(), Some("1200"));
}

#[tokio::test]
async fn test_dhcp_leases_filtered_by_server() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/ip/dhcp-server/lease")))
        .and(query_param("server", "lan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {".id": "*A", "address": "10.0.0.20", "mac-address": "AA:BB:CC:00:11:22", "server": "lan"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let leases = client.get_dhcp_leases(Some("lan")).await.unwrap().data.unwrap();
    assert_eq!(leases.len(), 1);
    assert_eq!(leases[0].mac_address.as_deref(), Some("AA:BB:CC:00:11:22"));
}

// ── Error envelopes ─────────────────────────────────────────────────

#[tokio::test]
async fn test_non_2xx_becomes_failure_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/ip/arp")))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": 400, "message": "no such command"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rest("/ip/address")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rest("/ip/firewall/nat")))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&server)
        .await;

    let arp = client.get_arp_table().await.unwrap();
    assert!(!arp.success);
    assert_eq!(arp.status, 400);
    assert_eq!(arp.error.as_deref(), Some("no such command"));
    assert!(arp.data.is_none());

    let addrs = client.list_ip_addresses().await.unwrap();
    assert_eq!(addrs.error.as_deref(), Some("not found"));

    let nat = client.list_firewall_nat_rules().await.unwrap();
    assert_eq!(nat.status, 500);
    assert_eq!(nat.error.as_deref(), Some("internal failure"));

    let err = nat.into_result().unwrap_err();
    assert!(matches!(err, Error::Api { status: 500, .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_unparseable_success_body_is_terminal() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/system/resource")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.get_system_resource().await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body.contains("login")),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Classified transport failures ───────────────────────────────────

#[tokio::test]
async fn test_401_is_auth_failure_without_retry() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/system/identity")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get_system_identity().await.unwrap_err();
    assert!(err.is_auth_failure(), "got: {err:?}");
    assert_eq!(err.connection_code(), Some(ConnectionErrorCode::AuthenticationFailed));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_timeout_is_retried_then_classified() {
    let server = MockServer::start().await;
    let client = DeviceClient::new(
        config_for(server.address().port()).with_timeout(Duration::from_millis(100)),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path(rest("/interface/wireless/registration-table")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let err = client.get_wireless_registrations().await.unwrap_err();
    assert_eq!(err.connection_code(), Some(ConnectionErrorCode::Timeout), "got: {err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_refused_connection_is_retried_with_backoff() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = DeviceClient::new(
        config_for(port).with_retry(3, Duration::from_millis(50)),
    )
    .unwrap();

    let started = Instant::now();
    let err = client.list_dhcp_servers().await.unwrap_err();

    match err {
        Error::Connection(ref e) => {
            assert_eq!(e.code, ConnectionErrorCode::ConnectionFailed);
            assert_eq!(e.host, "127.0.0.1");
            assert_eq!(e.port, port);
        }
        other => panic!("expected Connection error, got: {other:?}"),
    }
    // 50ms after attempt 1, 100ms after attempt 2
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/ip/firewall/filter")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rest("/ip/firewall/filter")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {".id": "*5", "chain": "input", "action": "drop"}
        ])))
        .mount(&server)
        .await;

    let client = DeviceClient::new(client.config().clone().with_timeout(Duration::from_millis(100)))
        .unwrap();
    let rules = client.list_firewall_filter_rules().await.unwrap();
    assert!(rules.success);
    assert_eq!(rules.data.unwrap().len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

// ── Formatted metrics ───────────────────────────────────────────────

fn resource_body() -> serde_json::Value {
    json!({
        "cpu-load": "12",
        "free-memory": "196608",
        "total-memory": "262144",
        "free-hdd-space": "8MiB",
        "total-hdd-space": "16MiB",
        "uptime": "1w2d",
        "version": "7.14.2 (stable)",
        "board-name": "RB4011"
    })
}

// ── Concurrency ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_sixth_concurrent_request_waits_for_a_slot() {
    let (server, client) = setup().await;
    let delay = Duration::from_millis(400);

    Mock::given(method("GET"))
        .and(path(rest("/system/identity")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "core-router"}))
                .set_delay(delay),
        )
        .expect(6)
        .mount(&server)
        .await;

    let started = Instant::now();
    let client = &client;
    let timed = move || async move {
        let resp = client.get_system_identity().await.unwrap();
        assert!(resp.success);
        started.elapsed()
    };
    let in_flight = async {
        tokio::time::sleep(delay / 2).await;
        server.received_requests().await.unwrap().len()
    };

    let (a, b, c, d, e, f, seen) =
        tokio::join!(timed(), timed(), timed(), timed(), timed(), timed(), in_flight);

    assert_eq!(seen, 5, "only five requests reach the device before the first reply");
    let mut elapsed = [a, b, c, d, e, f];
    elapsed.sort_unstable();
    assert!(elapsed[4] < delay * 2, "first five run together: {elapsed:?}");
    assert!(elapsed[5] >= delay * 2, "sixth waits for a slot: {elapsed:?}");
}

#[tokio::test]
async fn test_formatted_metrics_with_temperature() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/system/resource")))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rest("/system/health")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "temperature", "value": "44", "type": "C"}
        ])))
        .mount(&server)
        .await;

    let metrics = client.get_formatted_system_metrics().await.unwrap().data.unwrap();
    assert_eq!(metrics.cpu_load_percent, Some(12.0));
    assert_eq!(metrics.memory_used_percent, Some(25.0));
    assert_eq!(metrics.storage_total, Some(16 * 1024 * 1024));
    assert_eq!(metrics.storage_used_percent, Some(50.0));
    assert_eq!(metrics.board_name.as_deref(), Some("RB4011"));
    assert_eq!(metrics.temperature_celsius, Some(44.0));
}

#[tokio::test]
async fn test_formatted_metrics_without_health() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/system/resource")))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rest("/system/health")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": 404, "message": "Not Found"})))
        .mount(&server)
        .await;

    let resp = client.get_formatted_system_metrics().await.unwrap();
    assert!(resp.success);
    let metrics = resp.data.unwrap();
    assert_eq!(metrics.version.as_deref(), Some("7.14.2 (stable)"));
    assert!(metrics.temperature_celsius.is_none());
}

#[tokio::test]
async fn test_formatted_metrics_propagates_resource_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest("/system/resource")))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let resp = client.get_formatted_system_metrics().await.unwrap();
    assert!(!resp.success);
    assert_eq!(resp.status, 503);
    assert_eq!(resp.error.as_deref(), Some("busy"));
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_closed_client_rejects_calls() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    client.close();
    assert!(matches!(client.get_system_identity().await, Err(Error::Closed)));
}
