//! The configuration value tree the engine consumes (spec §1 Non-goals: the
//! YAML reader, `!include` expansion, and schema validation are external
//! collaborators — this is the already-validated shape they hand the
//! engine).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::addr::AddressModel;
use crate::fdb::FdbKey;
use crate::hook::HookModel;
use crate::link::LinkModel;
use crate::neighbour::NeighbourModel;
use crate::route::{RouteKey, RouteModel, RuleKey, RuleModel};
use crate::sysctl::{GlobalSysctlKey, PerLinkSysctlKey};
use crate::tc::TcModel;
use crate::wireguard::WireguardModel;
use crate::xdp::XdpModel;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub links: Vec<LinkModel>,
    pub addresses: BTreeMap<String, BTreeMap<crate::addr::AddrKey, AddressModel>>,
    pub routes: BTreeMap<RouteKey, RouteModel>,
    pub rules: BTreeMap<RuleKey, RuleModel>,
    pub fdb: BTreeMap<String, BTreeMap<FdbKey, crate::fdb::FdbModel>>,
    pub neighbours: BTreeMap<String, Vec<NeighbourModel>>,
    pub tc: BTreeMap<String, TcModel>,
    pub per_link_sysctl: BTreeMap<String, BTreeMap<PerLinkSysctlKey, crate::sysctl::SysctlModel>>,
    pub global_sysctl: BTreeMap<GlobalSysctlKey, crate::sysctl::SysctlModel>,
    pub wireguard: BTreeMap<String, WireguardModel>,
    pub xdp: BTreeMap<String, Vec<XdpModel>>,
    pub hooks: Vec<HookModel>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `None` key is the root namespace; present iff the config manages
    /// namespace lifecycle for it (spec §4.6 step 1, §9 Open Question #3).
    pub namespaces: BTreeMap<Option<String>, NamespaceConfig>,

    /// Networks whose covered addresses are never deleted by the address
    /// reconciler (spec §4.4 Addresses), overlaid on the built-in defaults.
    pub ignore_networks: Vec<String>,

    /// Regexes matched against live ifnames to exclude them from orphan
    /// sweep (spec §4.6 step 3).
    pub ignore_ifaces: Vec<String>,

    /// Restrict address deletion to addresses bearing the PERMANENT flag
    /// (spec §4.4 Addresses, config knob `ipaddr_dynamic`).
    pub ipaddr_dynamic: bool,

    /// Additional errno values the `ExceptionCollector` should tolerate
    /// beyond the built-in recoverable set (SPEC_FULL supplement,
    /// original_source `libifstate/exception.py`).
    pub netlinkerror: Vec<i32>,
}

impl Config {
    pub fn namespace(&self, name: Option<&str>) -> Option<&NamespaceConfig> {
        self.namespaces.get(&name.map(str::to_string))
    }

    pub fn manages_namespaces(&self) -> bool {
        self.namespaces.keys().any(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_manages_no_namespaces() {
        assert!(!Config::default().manages_namespaces());
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let mut cfg = Config::default();
        cfg.ignore_networks.push("192.168.0.0/16".into());
        cfg.namespaces.insert(None, NamespaceConfig::default());
        let yaml = serde_yaml_ng::to_string(&cfg).unwrap();
        let back: Config = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(cfg, back);
    }
}
