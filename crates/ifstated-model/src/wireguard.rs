//! WireGuard desired state (spec §4.4 "WireGuard").

use std::collections::BTreeSet;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireguardModel {
    pub private_key: Option<String>,
    pub listen_port: Option<u16>,
    pub fwmark: Option<u32>,
    /// Peers keyed by public key (spec §4.4).
    pub peers: std::collections::BTreeMap<String, WireguardPeer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireguardPeer {
    pub preshared_key: Option<String>,
    pub endpoint: Option<SocketAddr>,
    pub persistent_keepalive: Option<u16>,
    pub allowed_ips: BTreeSet<String>,
}

impl WireguardPeer {
    /// Peer settings compared per spec §4.4: preshared key, endpoint,
    /// keepalive, and allowed IPs treated as a set.
    pub fn settings_eq(&self, other: &WireguardPeer) -> bool {
        self.preshared_key == other.preshared_key
            && self.endpoint == other.endpoint
            && self.persistent_keepalive == other.persistent_keepalive
            && self.allowed_ips == other.allowed_ips
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_ips_compared_as_set_not_order() {
        let a = WireguardPeer {
            preshared_key: None,
            endpoint: None,
            persistent_keepalive: None,
            allowed_ips: ["10.0.0.0/24", "10.0.1.0/24"].into_iter().map(String::from).collect(),
        };
        let b = WireguardPeer {
            allowed_ips: ["10.0.1.0/24", "10.0.0.0/24"].into_iter().map(String::from).collect(),
            ..a.clone()
        };
        assert!(a.settings_eq(&b));
    }
}
