//! Desired per-interface state (spec §3 "LinkModel") and the observed
//! counterpart kept by the `LinkRegistry` (spec §4.3).

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::namespace::NamespaceName;

/// Kinds for which `bind_netns` is meaningful (spec §3): the link must be
/// created in `bind_netns` and then moved to its owning namespace.
pub const BIND_NETNS_KINDS: &[&str] = &[
    "ip6tnl", "tun", "veth", "vti", "vti6", "vxlan", "ipip", "gre", "gretap",
    "ip6gre", "ip6gretap", "geneve", "wireguard", "xfrm",
];

pub fn kind_supports_bind_netns(kind: &str) -> bool {
    BIND_NETNS_KINDS.contains(&kind)
}

/// Identity key used to match a configured `LinkModel` against a live
/// `LinkRegistryItem`, in declining priority order (spec §3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkIdentity {
    KindBusinfo { kind: String, businfo: String },
    KindPermaddr { kind: String, permaddr: String },
    KindAddressNs { kind: String, address: String, ns: NamespaceName },
    KindIfnameNs { kind: String, ifname: String, ns: NamespaceName },
    /// Only valid for kind == "physical": binds against an orphaned item
    /// previously freed by the registry (spec §4.3 `free_item`).
    PhysicalOrphanIfname { ifname: String },
}

impl LinkIdentity {
    /// Priority used when more than one identity key could match; lower is
    /// tried first (spec §3 "in declining priority").
    pub fn priority(&self) -> u8 {
        match self {
            LinkIdentity::KindBusinfo { .. } => 0,
            LinkIdentity::KindPermaddr { .. } => 1,
            LinkIdentity::KindAddressNs { .. } => 2,
            LinkIdentity::KindIfnameNs { .. } => 3,
            LinkIdentity::PhysicalOrphanIfname { .. } => 4,
        }
    }
}

/// VRRP-selector tag attached to a link, route, or rule (spec §3, §4.6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrrpTag {
    #[serde(rename = "type")]
    pub kind: VrrpKind,
    pub name: String,
    pub states: Vec<VrrpState>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VrrpKind {
    Group,
    Instance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VrrpState {
    Unknown,
    Fault,
    Backup,
    Master,
}

/// The externally-reported VRRP transition driving a selective reconciliation
/// pass (spec §4.6 "by_vrrp").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VrrpSelector {
    pub kind: VrrpKind,
    pub name: String,
    pub state: VrrpState,
}

impl VrrpTag {
    /// Whether `selector` names the same (kind, name) this tag is attached to.
    pub fn matches_object(&self, selector: &VrrpSelector) -> bool {
        self.kind == selector.kind && self.name == selector.name
    }

    /// Whether `selector`'s reported state is one this tag's object should be
    /// considered "up" for.
    pub fn matches_state(&self, selector: &VrrpSelector) -> bool {
        self.states.contains(&selector.state)
    }
}

/// Interface `state` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Up,
    Down,
}

/// Desired link attributes (spec §3 `settings`). Integer-coded attributes are
/// stored already-normalized (see `ifstated_model::normalize`); the raw
/// symbolic strings from configuration are translated at load time by the
/// external config collaborator or by `LinkModel::from_symbolic`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSettings {
    pub kind: String,
    pub ifname: String,
    pub state: Option<AdminState>,
    pub master: Option<String>,
    pub lower_link: Option<String>,
    pub lower_link_netns: Option<NamespaceName>,
    pub peer: Option<String>,
    pub peer_netns: Option<NamespaceName>,
    pub mtu: Option<u32>,
    pub address: Option<String>,
    pub group: Option<u32>,

    // Tunnel underlay (spec §3 "each tunnel-underlay index attribute").
    pub tunnel_link: Option<String>,
    pub tunnel_link_netns: Option<NamespaceName>,

    // VLAN
    pub vlan_id: Option<u16>,
    pub vlan_protocol: Option<u32>,

    // Bond (already-normalized numeric codes; see normalize.rs)
    pub bond_mode: Option<u32>,
    pub bond_arp_validate: Option<u32>,
    pub bond_arp_all_targets: Option<u32>,
    pub bond_primary_reselect: Option<u32>,
    pub bond_fail_over_mac: Option<u32>,
    pub bond_xmit_hash_policy: Option<u32>,
    pub bond_ad_lacp_rate: Option<u32>,
    pub bond_ad_select: Option<u32>,

    pub tun_type: Option<u32>,

    /// Any attribute not modeled explicitly above, kept for kinds the
    /// variant table (see ifstated-engine::linkkind) doesn't special-case.
    pub extra: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EthtoolModel {
    pub change: BTreeMap<String, String>,
    pub coalesce: BTreeMap<String, String>,
    pub features: BTreeMap<String, bool>,
    pub pause: BTreeMap<String, String>,
    pub nfc: BTreeMap<String, String>,
    pub ring: BTreeMap<String, String>,
    pub rxfh: BTreeMap<String, String>,
    pub eee: BTreeMap<String, String>,
    pub wol: BTreeMap<String, String>,
}

impl EthtoolModel {
    pub fn is_empty(&self) -> bool {
        self.change.is_empty()
            && self.coalesce.is_empty()
            && self.features.is_empty()
            && self.pause.is_empty()
            && self.nfc.is_empty()
            && self.ring.is_empty()
            && self.rxfh.is_empty()
            && self.eee.is_empty()
            && self.wol.is_empty()
    }

    /// Each knob group gets its own cache file (spec §4.4 Ethtool / §6).
    pub fn groups(&self) -> Vec<&'static str> {
        let mut groups = Vec::new();
        if !self.change.is_empty() {
            groups.push("change");
        }
        if !self.coalesce.is_empty() {
            groups.push("coalesce");
        }
        if !self.features.is_empty() {
            groups.push("features");
        }
        if !self.pause.is_empty() {
            groups.push("pause");
        }
        if !self.nfc.is_empty() {
            groups.push("nfc");
        }
        if !self.ring.is_empty() {
            groups.push("ring");
        }
        if !self.rxfh.is_empty() {
            groups.push("rxfh");
        }
        if !self.eee.is_empty() {
            groups.push("eee");
        }
        if !self.wol.is_empty() {
            groups.push("wol");
        }
        groups
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrportModel {
    pub cost: Option<u32>,
    pub priority: Option<u16>,
    pub backup_port: Option<String>,
    pub hairpin: Option<bool>,
    pub guard: Option<bool>,
    pub fastleave: Option<bool>,
    pub learning: Option<bool>,
    pub unicast_flood: Option<bool>,
    pub proxyarp: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkModel {
    pub ifname: String,
    pub ns: NamespaceName,
    pub settings: LinkSettings,
    pub ethtool: EthtoolModel,
    pub brport: Option<BrportModel>,
    pub vrrp: Option<VrrpTag>,
    pub bind_netns: Option<NamespaceName>,
}

impl LinkModel {
    /// Identity keys in declining priority (spec §3), built from the model's
    /// settings. `businfo`/`permaddr` are supplied by the caller since they
    /// come from a live ethtool query, not configuration.
    pub fn identity_keys(&self, businfo: Option<&str>, permaddr: Option<&str>) -> Vec<LinkIdentity> {
        let mut keys = Vec::new();
        if let Some(bi) = businfo {
            keys.push(LinkIdentity::KindBusinfo {
                kind: self.settings.kind.clone(),
                businfo: bi.to_string(),
            });
        }
        if let Some(pa) = permaddr {
            keys.push(LinkIdentity::KindPermaddr {
                kind: self.settings.kind.clone(),
                permaddr: pa.to_string(),
            });
        }
        if let Some(addr) = &self.settings.address {
            keys.push(LinkIdentity::KindAddressNs {
                kind: self.settings.kind.clone(),
                address: addr.clone(),
                ns: self.ns.clone(),
            });
        }
        keys.push(LinkIdentity::KindIfnameNs {
            kind: self.settings.kind.clone(),
            ifname: self.ifname.clone(),
            ns: self.ns.clone(),
        });
        if self.settings.kind == "physical" {
            keys.push(LinkIdentity::PhysicalOrphanIfname {
                ifname: self.ifname.clone(),
            });
        }
        keys
    }

    pub fn requires_bind_netns(&self) -> bool {
        self.bind_netns.is_some() && kind_supports_bind_netns(&self.settings.kind)
    }
}

/// Observed live link bound to a namespace (spec §3 "LinkRegistryItem", §4.3).
#[derive(Clone, Debug, PartialEq)]
pub struct LinkRegistryItem {
    pub index: u32,
    pub ns: NamespaceName,
    pub ifname: String,
    /// linkinfo kind string, or "physical" if the kernel reports none.
    pub kind: String,
    pub address: Option<String>,
    pub businfo: Option<String>,
    pub permaddr: Option<String>,
    pub admin_state: AdminState,
    pub master_index: Option<u32>,
    pub alt_names: Vec<String>,
    /// True once this item has been freed as a physical orphan (spec §4.3)
    /// and is eligible to be rebound by a later matching model.
    pub orphan: bool,
    /// Back-pointer key into the configuration's link table; `None` while
    /// unmatched.
    pub matched_ifname: Option<String>,
}

impl LinkRegistryItem {
    pub fn is_physical(&self) -> bool {
        self.kind == "physical"
    }

    pub fn link_ref(&self) -> crate::namespace::LinkRef {
        crate::namespace::LinkRef::new(self.ifname.clone(), self.ns.clone())
    }
}

/// Parse an `ip/prefixlen` or bare address into `(addr, prefixlen)`.
pub fn parse_cidr(s: &str) -> Option<(IpAddr, u8)> {
    let (addr, plen) = s.split_once('/')?;
    let addr: IpAddr = addr.parse().ok()?;
    let plen: u8 = plen.parse().ok()?;
    Some((addr, plen))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keys_are_priority_ordered() {
        let model = LinkModel {
            ifname: "eth0".into(),
            ns: NamespaceName::root(),
            settings: LinkSettings {
                kind: "physical".into(),
                ifname: "eth0".into(),
                ..Default::default()
            },
            ethtool: Default::default(),
            brport: None,
            vrrp: None,
            bind_netns: None,
        };
        let keys = model.identity_keys(Some("0000:00:1f.6"), Some("aa:bb:cc:dd:ee:ff"));
        let priorities: Vec<u8> = keys.iter().map(|k| k.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert!(matches!(keys.last().unwrap(), LinkIdentity::PhysicalOrphanIfname { .. }));
    }

    #[test]
    fn bind_netns_kinds_are_explicit_set() {
        assert!(kind_supports_bind_netns("veth"));
        assert!(kind_supports_bind_netns("wireguard"));
        assert!(!kind_supports_bind_netns("bridge"));
        assert!(!kind_supports_bind_netns("physical"));
    }

    #[test]
    fn vrrp_matching() {
        let tag = VrrpTag {
            kind: VrrpKind::Instance,
            name: "VI_1".into(),
            states: vec![VrrpState::Master],
        };
        let sel_match = VrrpSelector {
            kind: VrrpKind::Instance,
            name: "VI_1".into(),
            state: VrrpState::Master,
        };
        let sel_wrong_state = VrrpSelector {
            kind: VrrpKind::Instance,
            name: "VI_1".into(),
            state: VrrpState::Backup,
        };
        assert!(tag.matches_object(&sel_match));
        assert!(tag.matches_state(&sel_match));
        assert!(tag.matches_object(&sel_wrong_state));
        assert!(!tag.matches_state(&sel_wrong_state));
    }
}
