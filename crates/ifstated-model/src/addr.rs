//! Address desired state (spec §4.4 "Addresses").

use serde::{Deserialize, Serialize};

/// Address key: `ip/prefixlen` (spec §3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddrKey {
    pub ip: std::net::IpAddr,
    pub prefixlen: u8,
}

impl std::fmt::Display for AddrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefixlen)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressModel {
    pub broadcast: Option<std::net::Ipv4Addr>,
    pub label: Option<String>,
    /// SPEC_FULL supplement (original_source `libifstate/address`):
    /// suppresses deletion of this address even when its network isn't
    /// covered by the configured ignore-network set.
    pub noflush: bool,
}

/// Built-in ignore-network defaults (SPEC_FULL supplement, original_source
/// `libifstate/__init__.py`), overlaid with configured entries before the
/// address reconciler's delete pass.
pub fn builtin_ignore_networks() -> Vec<ipnetwork::IpNetwork> {
    vec![
        "169.254.0.0/16".parse().unwrap(),
        "fe80::/10".parse().unwrap(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_key_display() {
        let key = AddrKey { ip: "10.0.0.1".parse().unwrap(), prefixlen: 24 };
        assert_eq!(key.to_string(), "10.0.0.1/24");
    }

    #[test]
    fn builtin_ignore_networks_cover_link_local() {
        let nets = builtin_ignore_networks();
        assert!(nets.iter().any(|n| n.to_string() == "169.254.0.0/16"));
        assert!(nets.iter().any(|n| n.to_string() == "fe80::/10"));
    }
}
