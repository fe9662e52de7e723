// Typed control-plane operations
//
// Each method builds one request and funnels it through the shared retry
// loop. Paths are relative to the configured base path.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::client::{DeviceClient, RequestDescriptor};
use crate::error::Error;
use crate::models::{
    ArpEntry, DhcpLease, DhcpServer, FirewallRule, Interface, InterfaceTraffic, IpAddress, Route,
    SystemIdentity, SystemResource, WirelessRegistration,
};
use crate::response::ApiResponse;

impl DeviceClient {
    // ── System ───────────────────────────────────────────────────────

    /// `GET /system/resource`
    pub async fn get_system_resource(&self) -> Result<ApiResponse<SystemResource>, Error> {
        debug!("fetching system resource");
        self.execute(RequestDescriptor::get("/system/resource")).await
    }

    /// `GET /system/identity`
    pub async fn get_system_identity(&self) -> Result<ApiResponse<SystemIdentity>, Error> {
        debug!("fetching system identity");
        self.execute(RequestDescriptor::get("/system/identity")).await
    }

    /// `GET /system/health`
    ///
    /// Loosely typed: older firmwares return one object keyed by sensor,
    /// newer ones a list of `{name, value, type}` entries. Not every device
    /// exposes it.
    pub async fn get_system_health(&self) -> Result<ApiResponse<serde_json::Value>, Error> {
        debug!("fetching system health");
        self.execute(RequestDescriptor::get("/system/health")).await
    }

    // ── Interfaces ───────────────────────────────────────────────────

    /// `GET /interface`
    pub async fn list_interfaces(&self) -> Result<ApiResponse<Vec<Interface>>, Error> {
        debug!("listing interfaces");
        self.execute(RequestDescriptor::get("/interface")).await
    }

    /// `GET /interface/{id}`
    pub async fn get_interface(&self, id: &str) -> Result<ApiResponse<Interface>, Error> {
        debug!(id, "fetching interface");
        self.execute(RequestDescriptor::get(format!("/interface/{id}")))
            .await
    }

    /// Single traffic poll: `POST /interface/monitor-traffic`.
    ///
    /// The device samples for `duration` (whole seconds, minimum 1) and
    /// returns one reading per interface.
    pub async fn monitor_interface_traffic(
        &self,
        interface: &str,
        duration: Duration,
    ) -> Result<ApiResponse<Vec<InterfaceTraffic>>, Error> {
        let secs = duration.as_secs().max(1);
        debug!(interface, secs, "monitoring interface traffic");
        let body = json!({
            "interface": interface,
            "duration": format!("{secs}s"),
            "once": true,
        });
        self.execute(RequestDescriptor::post("/interface/monitor-traffic", body))
            .await
    }

    // ── IP ───────────────────────────────────────────────────────────

    /// `GET /ip/address`
    pub async fn list_ip_addresses(&self) -> Result<ApiResponse<Vec<IpAddress>>, Error> {
        debug!("listing ip addresses");
        self.execute(RequestDescriptor::get("/ip/address")).await
    }

    /// `GET /ip/route`
    pub async fn list_routes(&self) -> Result<ApiResponse<Vec<Route>>, Error> {
        debug!("listing routes");
        self.execute(RequestDescriptor::get("/ip/route")).await
    }

    /// `GET /ip/arp`
    pub async fn get_arp_table(&self) -> Result<ApiResponse<Vec<ArpEntry>>, Error> {
        debug!("fetching arp table");
        self.execute(RequestDescriptor::get("/ip/arp")).await
    }

    // ── DHCP ─────────────────────────────────────────────────────────

    /// `GET /ip/dhcp-server`
    pub async fn list_dhcp_servers(&self) -> Result<ApiResponse<Vec<DhcpServer>>, Error> {
        debug!("listing dhcp servers");
        self.execute(RequestDescriptor::get("/ip/dhcp-server")).await
    }

    /// `GET /ip/dhcp-server/lease`, optionally filtered by server name.
    pub async fn get_dhcp_leases(
        &self,
        server: Option<&str>,
    ) -> Result<ApiResponse<Vec<DhcpLease>>, Error> {
        debug!(?server, "fetching dhcp leases");
        let mut request = RequestDescriptor::get("/ip/dhcp-server/lease");
        if let Some(server) = server {
            request = request.query("server", server);
        }
        self.execute(request).await
    }

    // ── Firewall ─────────────────────────────────────────────────────

    /// `GET /ip/firewall/filter`
    pub async fn list_firewall_filter_rules(
        &self,
    ) -> Result<ApiResponse<Vec<FirewallRule>>, Error> {
        debug!("listing firewall filter rules");
        self.execute(RequestDescriptor::get("/ip/firewall/filter"))
            .await
    }

    /// `GET /ip/firewall/nat`
    pub async fn list_firewall_nat_rules(&self) -> Result<ApiResponse<Vec<FirewallRule>>, Error> {
        debug!("listing firewall nat rules");
        self.execute(RequestDescriptor::get("/ip/firewall/nat")).await
    }

    // ── Wireless ─────────────────────────────────────────────────────

    /// `GET /interface/wireless/registration-table`
    pub async fn get_wireless_registrations(
        &self,
    ) -> Result<ApiResponse<Vec<WirelessRegistration>>, Error> {
        debug!("fetching wireless registration table");
        self.execute(RequestDescriptor::get(
            "/interface/wireless/registration-table",
        ))
        .await
    }
}
