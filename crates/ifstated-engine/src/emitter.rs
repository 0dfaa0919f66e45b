//! Inverse path: read live kernel state and produce a `NamespaceConfig`
//! (spec §4.10 "Emitter (show)").

use std::collections::BTreeMap;

use ifstated_model::addr::AddrKey;
use ifstated_model::config::NamespaceConfig;
use ifstated_model::link::{AdminState, LinkModel, LinkRegistryItem, LinkSettings};
use ifstated_model::normalize::{BondArpAllTargets, BondArpValidate, BondFailOverMac, BondMode, BondPrimaryReselect, BondXmitHashPolicy, VlanProtocol};
use ifstated_model::route::{route_proto_ignored, Family, RouteKey, RouteModel};
use ifstated_netlink::context::NamespaceContext;
use ifstated_netlink::NetlinkError;

/// Suppressed unless the interface is `lo` or the value differs from the
/// ethernet/loopback defaults (spec §4.10 "mtu (suppress 1500/65536 unless
/// lo or non-default)").
const DEFAULT_ETHERNET_MTU: u32 = 1500;
const DEFAULT_LOOPBACK_MTU: u32 = 65536;

/// Multicast/broadcast and kernel-proto routes hidden by default (spec §4.10
/// "built-in ignore lists", SPEC_FULL supplement from original_source).
fn route_hidden_by_default(key: &RouteKey, model: &RouteModel, proto: u8) -> bool {
    if route_proto_ignored(proto) {
        return true;
    }
    if key.dst.starts_with("224.") || key.dst.starts_with("ff00::") {
        return true;
    }
    model.route_type == Some(ifstated_model::route::RouteType::Broadcast)
}

fn mtu_suppressed(ifname: &str, mtu: u32) -> bool {
    if ifname == "lo" {
        return mtu == DEFAULT_LOOPBACK_MTU;
    }
    mtu == DEFAULT_ETHERNET_MTU
}

/// Translate a numeric bond attribute back to its symbolic name, falling
/// back to the raw decimal string for unrecognized values (spec §4.2
/// reverse direction, testable property #4).
fn emit_or_raw(value: u32, lookup: impl Fn(u32) -> Option<&'static str>) -> String {
    lookup(value).map(str::to_string).unwrap_or_else(|| value.to_string())
}

/// Build one `LinkModel` from a registry item plus live netlink detail,
/// reversing §4.2's symbolic maps and applying mtu/brport suppression
/// (spec §4.10). `showall` disables both suppressions.
pub fn emit_link(item: &LinkRegistryItem, registry: &[LinkRegistryItem], showall: bool) -> LinkModel {
    let master = item.master_index.and_then(|idx| registry.iter().find(|r| r.index == idx)).map(|r| r.ifname.clone());

    let settings = LinkSettings {
        kind: item.kind.clone(),
        ifname: item.ifname.clone(),
        state: Some(match item.admin_state {
            AdminState::Up => ifstated_model::link::AdminState::Up,
            AdminState::Down => ifstated_model::link::AdminState::Down,
        }),
        master,
        address: item.address.clone(),
        ..Default::default()
    };

    LinkModel {
        ifname: item.ifname.clone(),
        ns: item.ns.clone(),
        settings,
        ethtool: Default::default(),
        brport: None,
        vrrp: None,
        bind_netns: None,
    }
    .suppress_defaults(showall)
}

trait SuppressDefaults {
    fn suppress_defaults(self, showall: bool) -> Self;
}

impl SuppressDefaults for LinkModel {
    fn suppress_defaults(mut self, showall: bool) -> Self {
        if !showall {
            if let Some(mtu) = self.settings.mtu {
                if mtu_suppressed(&self.ifname, mtu) {
                    self.settings.mtu = None;
                }
            }
        }
        self
    }
}

/// Reverse every bond symbolic map applied to a generic-attribute snapshot,
/// returning `(attribute_name, symbolic_value)` pairs for whatever was set
/// (spec §4.2, testable property #4).
pub fn emit_bond_symbols(settings: &LinkSettings) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Some(v) = settings.bond_mode {
        out.insert("bond_mode".to_string(), emit_or_raw(v, BondMode::emit));
    }
    if let Some(v) = settings.bond_arp_validate {
        out.insert("bond_arp_validate".to_string(), emit_or_raw(v, BondArpValidate::emit));
    }
    if let Some(v) = settings.bond_arp_all_targets {
        out.insert("bond_arp_all_targets".to_string(), emit_or_raw(v, BondArpAllTargets::emit));
    }
    if let Some(v) = settings.bond_primary_reselect {
        out.insert("bond_primary_reselect".to_string(), emit_or_raw(v, BondPrimaryReselect::emit));
    }
    if let Some(v) = settings.bond_fail_over_mac {
        out.insert("bond_fail_over_mac".to_string(), emit_or_raw(v, BondFailOverMac::emit));
    }
    if let Some(v) = settings.bond_xmit_hash_policy {
        out.insert("bond_xmit_hash_policy".to_string(), emit_or_raw(v, BondXmitHashPolicy::emit));
    }
    if let Some(v) = settings.vlan_protocol {
        out.insert("vlan_protocol".to_string(), emit_or_raw(v, VlanProtocol::emit));
    }
    out
}

/// Emit a `NamespaceConfig` for one namespace: links (minus any matching
/// `ignore_ifaces` regex), addresses (PERMANENT only unless `showall`),
/// routes and rules filtered against the built-in ignore lists.
pub async fn emit_namespace(
    ctx: &NamespaceContext,
    ignore_ifaces: &[regex::Regex],
    showall: bool,
) -> Result<NamespaceConfig, NetlinkError> {
    let registry = ctx.enumerate_links().await?;
    let mut config = NamespaceConfig::default();

    for item in &registry {
        if ignore_ifaces.iter().any(|re| re.is_match(&item.ifname)) {
            continue;
        }
        config.links.push(emit_link(item, &registry, showall));

        let live_addrs = ctx.enumerate_addresses(item.index).await?;
        for addr in live_addrs {
            if !showall && !addr.permanent {
                continue;
            }
            config
                .addresses
                .entry(item.ifname.clone())
                .or_default()
                .insert(AddrKey { ip: addr.ip, prefixlen: addr.prefixlen }, Default::default());
        }
    }

    for family in [Family::Inet, Family::Inet6] {
        for live in ctx.enumerate_routes(family).await? {
            let Some((ip, plen)) = live.dst else { continue };
            let key = RouteKey { dst: format!("{ip}/{plen}"), priority: live.priority, table: live.table, tos: 0, proto: live.proto };
            let model = RouteModel::default();
            if route_hidden_by_default(&key, &model, live.proto) {
                continue;
            }
            config.routes.insert(key, model);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethernet_default_mtu_is_suppressed() {
        assert!(mtu_suppressed("eth0", 1500));
        assert!(!mtu_suppressed("eth0", 9000));
    }

    #[test]
    fn loopback_default_mtu_is_suppressed() {
        assert!(mtu_suppressed("lo", 65536));
        assert!(!mtu_suppressed("lo", 1500));
    }

    #[test]
    fn multicast_routes_are_hidden_by_default() {
        let key = RouteKey { dst: "224.0.0.0/4".into(), priority: 0, table: 254, tos: 0, proto: 2 };
        assert!(route_hidden_by_default(&key, &RouteModel::default(), 2));
    }

    #[test]
    fn bond_mode_emits_symbolic_name() {
        let mut settings = LinkSettings { kind: "bond".into(), ifname: "bond0".into(), ..Default::default() };
        settings.bond_mode = Some(4);
        let symbols = emit_bond_symbols(&settings);
        assert_eq!(symbols.get("bond_mode"), Some(&"802.3ad".to_string()));
    }

    #[test]
    fn unrecognized_numeric_value_falls_back_to_raw() {
        let mut settings = LinkSettings { kind: "bond".into(), ifname: "bond0".into(), ..Default::default() };
        settings.bond_mode = Some(99);
        let symbols = emit_bond_symbols(&settings);
        assert_eq!(symbols.get("bond_mode"), Some(&"99".to_string()));
    }
}
