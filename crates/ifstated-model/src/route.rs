//! Route and rule desired state (spec §3, §4.4 "Routes"/"Rules").

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::link::VrrpTag;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    Inet,
    Inet6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::Inet,
            IpAddr::V6(_) => Family::Inet6,
        }
    }

    /// Default route priority: IPv4 = 0, IPv6 = 1024 (spec §4.4 Routes,
    /// testable property #5).
    pub fn default_priority(self) -> u32 {
        match self {
            Family::Inet => 0,
            Family::Inet6 => 1024,
        }
    }
}

/// A next hop that may be of either family (spec §4.4 Routes "via").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub addr: IpAddr,
}

impl Via {
    /// True when this nexthop's family differs from `dst`'s, which forces an
    /// `RTA_VIA` family-qualified nexthop rather than a plain `RTA_GATEWAY`
    /// (spec §4.4 Routes, testable property #6).
    pub fn needs_rta_via(&self, dst_family: Family) -> bool {
        Family::of(&self.addr) != dst_family
    }
}

/// Route key: `(dst, priority, table, tos, proto)` (spec §3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub dst: String, // CIDR text form, e.g. "10.0.0.0/24" or "default"
    pub priority: u32,
    pub table: u32,
    pub tos: u8,
    pub proto: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RouteType {
    Unicast,
    Local,
    Broadcast,
    Multicast,
    Blackhole,
    Unreachable,
    Prohibit,
    Throw,
    Nat,
    Anycast,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteModel {
    pub gateway: Option<IpAddr>,
    pub via: Option<Via>,
    pub oif: Option<String>,
    pub oif_netns: Option<crate::namespace::NamespaceName>,
    pub scope: Option<u8>,
    pub realm: Option<u32>,
    pub prefsrc: Option<IpAddr>,
    #[serde(rename = "type")]
    pub route_type: Option<RouteType>,
    pub vrrp: Option<VrrpTag>,
    /// Set by the reconciler (not configuration) when the configured `oif`
    /// fails to resolve and a gateway is present (spec §4.4 Routes: "An oif
    /// that does not resolve downgrades the route to state down").
    pub forced_down: bool,
}

/// The kernel local table (id 255) is never touched (spec §4.4 Routes).
pub const LOCAL_TABLE: u32 = 255;

/// Protocols/families excluded from the route reconciler's delete pass by
/// default (spec §8 testable property #14).
pub const IGNORED_ROUTE_PROTOS: &[u8] = &[
    1, 2, 8, 9, 10, 11, 12, 13, 14, 15, 16, 18, 42, 186, 187, 188, 189, 192,
];

pub fn route_proto_ignored(proto: u8) -> bool {
    IGNORED_ROUTE_PROTOS.contains(&proto)
}

/// Rule key: `(priority, iif, oif, dst, metric, protocol)` (spec §4.4 Rules).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleKey {
    pub priority: u32,
    pub iif: Option<String>,
    pub oif: Option<String>,
    pub dst: Option<String>,
    pub metric: Option<u32>,
    pub protocol: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RuleAction {
    ToTable(u32),
    Unicast,
    Blackhole,
    Unreachable,
    Prohibit,
    Nat(IpAddr),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleModel {
    pub family: Family,
    pub action: RuleAction,
    pub src: Option<String>,
    pub fwmark: Option<u32>,
    pub tos: Option<u8>,
    /// Additional fields present in the original implementation's rule dict
    /// (SPEC_FULL supplement) but not named in spec §4.4's identity tuple:
    /// compared like any other setting.
    pub suppress_prefixlength: Option<i32>,
    pub suppress_ifgroup: Option<u32>,
    pub vrrp: Option<VrrpTag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_priority_by_family() {
        assert_eq!(Family::Inet.default_priority(), 0);
        assert_eq!(Family::Inet6.default_priority(), 1024);
    }

    #[test]
    fn via_family_mismatch_requires_rta_via() {
        let v4_via_on_v6_dst = Via { addr: "10.0.0.1".parse().unwrap() };
        assert!(v4_via_on_v6_dst.needs_rta_via(Family::Inet6));
        assert!(!v4_via_on_v6_dst.needs_rta_via(Family::Inet));
    }

    #[test]
    fn local_table_never_matches_ignored_proto_logic_but_is_excluded_elsewhere() {
        assert_eq!(LOCAL_TABLE, 255);
        assert!(route_proto_ignored(2));
        assert!(!route_proto_ignored(3));
    }
}
