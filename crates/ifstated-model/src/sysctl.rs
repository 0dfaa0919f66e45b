//! Sysctl desired state (spec §4.4 "Sysctl", §6 paths).

use serde::{Deserialize, Serialize};

/// Per-link sysctl key: `(family, key)`; value compared as a string since
/// the kernel file contents are textual.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PerLinkSysctlKey {
    pub family: String, // e.g. "ipv4", "ipv6", "mpls"
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SysctlModel {
    pub value: String,
}

impl PerLinkSysctlKey {
    /// spec §6: `/proc/sys/net/{family}/conf/{ifname}/{key}`.
    pub fn path(&self, ifname: &str) -> String {
        format!("/proc/sys/net/{}/conf/{}/{}", self.family, ifname, self.key)
    }
}

/// Global (non-per-interface) sysctl key: `(proto, key)` (spec §6:
/// `/proc/sys/net/{proto}/{key}`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalSysctlKey {
    pub proto: String,
    pub key: String,
}

impl GlobalSysctlKey {
    pub fn path(&self) -> String {
        format!("/proc/sys/net/{}/{}", self.proto, self.key)
    }
}

/// Pseudo-interface names reconciled once per namespace before per-link
/// settings (spec §4.4 Sysctl).
pub const PSEUDO_INTERFACES: &[&str] = &["all", "default"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_link_path_matches_spec_s6() {
        let key = PerLinkSysctlKey { family: "ipv4".into(), key: "forwarding".into() };
        assert_eq!(key.path("eth0"), "/proc/sys/net/ipv4/conf/eth0/forwarding");
    }

    #[test]
    fn global_path_matches_spec_s6() {
        let key = GlobalSysctlKey { proto: "ipv4".into(), key: "ip_forward".into() };
        assert_eq!(key.path(), "/proc/sys/net/ipv4/ip_forward");
    }
}
