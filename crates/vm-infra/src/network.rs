//! IP address discovery for a running VM.
//!
//! The control plane fills in network metadata some time after the VM has
//! started. [`NetworkPoller`] queries it on a fixed interval until an entry
//! with a recognized hypervisor MAC prefix carries an IP, or the deadline
//! passes.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::task::TaskTracker;
use crate::types::VmId;
use crate::{ControlPlane, Error, Operation, Result};

pub const CHECK_INTERVAL: Duration = Duration::from_secs(1);
pub const CHECK_IP_TIMEOUT: Duration = Duration::from_secs(90);

/// A MAC address vendor prefix (OUI) assigned by a supported hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacVendor {
    pub prefix: &'static str,
    pub vendor: &'static str,
}

/// NICs whose MAC starts with one of these prefixes are managed by the
/// hypervisor and carry the VM's reachable address.
pub const RECOGNIZED_MAC_PREFIXES: [MacVendor; 2] = [
    MacVendor {
        prefix: "00:50:56",
        vendor: "VMware vCenter",
    },
    MacVendor {
        prefix: "00:0c:29",
        vendor: "VMware ESX",
    },
];

/// Vendor whose prefix `mac` starts with, compared case-insensitively.
pub fn recognized_vendor(mac: &str) -> Option<&'static MacVendor> {
    RECOGNIZED_MAC_PREFIXES.iter().find(|v| {
        mac.get(..v.prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(v.prefix))
    })
}

/// One entry of a VM's `networkConnections` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConnection {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
}

impl NetworkConnection {
    /// The IP of this entry if it is present and the MAC is recognized.
    pub fn qualifying_ip(&self) -> Option<&str> {
        let ip = self.ip_address.as_deref().map(str::trim)?;
        if ip.is_empty() || ip == "-" {
            return None;
        }
        recognized_vendor(self.mac_address.as_deref()?)?;
        Some(ip)
    }
}

/// Parse the `networkConnections` list out of a task's result payload.
///
/// Entries that do not have the expected shape are skipped. A payload without
/// the list yields no entries.
pub fn parse_connections(properties: Option<&serde_json::Value>) -> Vec<NetworkConnection> {
    let Some(entries) = properties
        .and_then(|p| p.get("networkConnections"))
        .and_then(serde_json::Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match NetworkConnection::deserialize(entry) {
            Ok(conn) => Some(conn),
            Err(e) => {
                debug!(error = %e, "ignoring malformed network connection entry");
                None
            }
        })
        .collect()
}

/// First qualifying IP in list order.
pub fn first_qualifying_ip(connections: &[NetworkConnection]) -> Option<&str> {
    connections.iter().find_map(NetworkConnection::qualifying_ip)
}

/// Polls a VM's network connections until an IP shows up.
#[derive(Debug, Clone, Copy)]
pub struct NetworkPoller {
    interval: Duration,
    timeout: Duration,
}

impl Default for NetworkPoller {
    fn default() -> Self {
        Self {
            interval: CHECK_INTERVAL,
            timeout: CHECK_IP_TIMEOUT,
        }
    }
}

impl NetworkPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Wait for the VM's IP address.
    ///
    /// The first query goes out one interval after the call. A failed query
    /// ends the wait with [`Error::NetworkQueryFailed`]; reaching the deadline
    /// ends it with [`Error::IpResolutionTimeout`].
    pub async fn resolve(&self, plane: &dyn ControlPlane, vm_id: &VmId) -> Result<String> {
        let deadline = Instant::now() + self.timeout;

        match time::timeout_at(deadline, self.poll_until_found(plane, vm_id)).await {
            Ok(found) => found,
            Err(_) => {
                warn!(vm_id = %vm_id, timeout = ?self.timeout, "timed out waiting for vm IP address");
                Err(Error::IpResolutionTimeout {
                    vm_id: vm_id.clone(),
                    timeout: self.timeout,
                })
            }
        }
    }

    async fn poll_until_found(&self, plane: &dyn ControlPlane, vm_id: &VmId) -> Result<String> {
        let tracker = TaskTracker::new(plane);
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempt: u32 = 0;
        loop {
            ticker.tick().await;
            attempt += 1;

            let task = tracker
                .run(Operation::GetNetworks, plane.get_vm_networks(vm_id))
                .await
                .map_err(|e| {
                    debug!(vm_id = %vm_id, attempt, error = %e, "network query failed");
                    Error::NetworkQueryFailed {
                        vm_id: vm_id.clone(),
                        source: Box::new(e),
                    }
                })?;

            let connections = parse_connections(task.resource_properties.as_ref());
            if let Some(ip) = first_qualifying_ip(&connections) {
                debug!(vm_id = %vm_id, ip, attempt, "vm IP address found");
                return Ok(ip.to_string());
            }

            debug!(
                vm_id = %vm_id,
                attempt,
                entries = connections.len(),
                "no qualifying network entry yet"
            );
        }
    }
}
