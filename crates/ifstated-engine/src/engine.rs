//! Top-level reconciliation orchestrator (spec §4.6 "Engine"): namespace
//! preparation, dependency-graph staging, per-link apply, orphan sweep, and
//! the per-namespace collection reconcilers.

use std::collections::BTreeMap;
use std::os::unix::io::AsRawFd;

use ifstated_model::config::{Config, NamespaceConfig};
use ifstated_model::link::{LinkIdentity, LinkModel, LinkRegistryItem, VrrpSelector};
use ifstated_model::namespace::{LinkRef, NamespaceName};
use ifstated_model::route::Family;
use ifstated_model::tc::FilterAction;
use ifstated_netlink::context::NamespaceContext;
use tracing::{info, warn};

use crate::defaults::Defaults;
use crate::error::EngineError;
use crate::exceptions::ExceptionCollector;
use crate::graph::DependencyGraph;
use crate::registry::{GetLinkFilter, LinkRegistry};
use crate::routing::OifResolver;

/// Engine run mode (spec §4.6: `apply` performs netlink mutation, `check`
/// only computes and logs the diff).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Check,
    Apply,
}

impl Mode {
    fn applies(self) -> bool {
        matches!(self, Mode::Apply)
    }

    fn strict(self) -> bool {
        matches!(self, Mode::Apply)
    }
}

pub struct Engine {
    contexts: BTreeMap<NamespaceName, NamespaceContext>,
    registry: LinkRegistry,
    defaults: Defaults,
    exceptions: ExceptionCollector,
}

/// Resolves an ifname to its live ifindex by searching the registry within
/// one namespace, used to wire `routing::reconcile_routes` (which is
/// namespace-agnostic) into the engine's cross-namespace inventory.
struct RegistryOifResolver<'a> {
    registry: &'a LinkRegistry,
    ns: NamespaceName,
}

impl OifResolver for RegistryOifResolver<'_> {
    fn resolve_oif(&self, ifname: &str) -> Option<u32> {
        self.registry
            .get_link(&GetLinkFilter { ifname: Some(ifname), ns: Some(&self.ns), ..Default::default() })
            .map(|item| item.index)
    }
}

impl Engine {
    pub fn new(defaults: Defaults) -> Self {
        Self { contexts: BTreeMap::new(), registry: LinkRegistry::new(), defaults, exceptions: ExceptionCollector::new() }
    }

    /// The namespace file to pass to `setns_by_fd`/`link_set_netns_by_fd`:
    /// a named namespace's pinned path, or `/proc/1/ns/net` for the root
    /// namespace (the conventional "move back to init" target).
    fn netns_file(ns: &NamespaceName) -> std::io::Result<std::fs::File> {
        let path = if ns.is_root() { std::path::PathBuf::from("/proc/1/ns/net") } else { ifstated_netlink::netns::netns_path(ns.as_str()) };
        std::fs::File::open(path)
    }

    /// Open a context per namespace named in `config` (spec §4.6 step 1) and
    /// populate the registry by enumerating each one.
    async fn prepare_namespaces(&mut self, config: &Config) -> Result<(), EngineError> {
        for name in config.namespaces.keys() {
            let ns = name.clone().map(NamespaceName::named).unwrap_or(NamespaceName::ROOT);
            let ctx = NamespaceContext::new(ns.clone()).await?;
            let items = ctx.enumerate_links().await?;
            self.registry.extend(items);
            self.contexts.insert(ns, ctx);
        }
        Ok(())
    }

    /// Build the cross-namespace dependency graph from every configured
    /// link's master, lower-link, tunnel-underlay, mirred-target, and
    /// brport-backup-port references (spec §4.5).
    fn build_graph(config: &Config) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (ns_name, ns_config) in &config.namespaces {
            let ns = ns_name.clone().map(NamespaceName::named).unwrap_or(NamespaceName::ROOT);
            for link in &ns_config.links {
                let node = LinkRef::new(link.ifname.clone(), ns.clone());
                graph.add_node(node.clone());

                if let Some(master) = &link.settings.master {
                    graph.add_edge(node.clone(), LinkRef::new(master.clone(), ns.clone()));
                }
                if let Some(lower) = &link.settings.lower_link {
                    let lower_ns = link.settings.lower_link_netns.clone().unwrap_or_else(|| ns.clone());
                    graph.add_edge(node.clone(), LinkRef::new(lower.clone(), lower_ns));
                }
                if let Some(tunnel) = &link.settings.tunnel_link {
                    let tunnel_ns = link.settings.tunnel_link_netns.clone().unwrap_or_else(|| ns.clone());
                    graph.add_edge(node.clone(), LinkRef::new(tunnel.clone(), tunnel_ns));
                }
                if let Some(backup) = link.brport.as_ref().and_then(|b| b.backup_port.clone()) {
                    graph.add_edge(node.clone(), LinkRef::new(backup, ns.clone()));
                }
                if let Some(tc) = ns_config.tc.get(&link.ifname) {
                    for filter in &tc.filters {
                        for action in &filter.actions {
                            if let FilterAction::Mirred { dev, dev_netns, .. } = action {
                                let dev_ns = dev_netns.clone().unwrap_or_else(|| ns.clone());
                                graph.add_edge(node.clone(), LinkRef::new(dev.clone(), dev_ns));
                            }
                        }
                    }
                }
            }
        }
        graph
    }

    /// Resolve the live item this `LinkModel` binds to, trying each identity
    /// key the model supports in priority order (spec §3).
    fn resolve_identity(&self, link: &LinkModel, ns: &NamespaceName) -> Option<LinkRegistryItem> {
        let mut keys = link.identity_keys(None, None);
        keys.sort_by_key(LinkIdentity::priority);
        for key in keys {
            let filter = match &key {
                LinkIdentity::KindBusinfo { kind, businfo } => GetLinkFilter { kind: Some(kind), businfo: Some(businfo), ..Default::default() },
                LinkIdentity::KindPermaddr { kind, permaddr } => GetLinkFilter { kind: Some(kind), permaddr: Some(permaddr), ..Default::default() },
                LinkIdentity::KindAddressNs { kind, address, ns } => {
                    GetLinkFilter { kind: Some(kind), address: Some(address), ns: Some(ns), ..Default::default() }
                }
                LinkIdentity::KindIfnameNs { kind, ifname, ns } => GetLinkFilter { kind: Some(kind), ifname: Some(ifname), ns: Some(ns), ..Default::default() },
                LinkIdentity::PhysicalOrphanIfname { ifname } => {
                    GetLinkFilter { ifname: Some(ifname), orphan: Some(true), ..Default::default() }
                }
            };
            if let Some(item) = self.registry.get_link(&filter) {
                return Some(item.clone());
            }
        }
        None
    }

    /// Apply one link's admin-state/mtu/master/reconciler set, creating it
    /// first if it doesn't exist yet and its kind supports creation,
    /// recreating it if its live kind no longer matches, migrating it into
    /// its target namespace if it was resolved elsewhere, and renaming it
    /// (clearing any colliding altname first) if its live name differs
    /// (spec §4.6 step 4).
    async fn apply_link(&mut self, ns: &NamespaceName, link: &LinkModel, mode: Mode) -> Result<(), EngineError> {
        let kind = crate::linkkind::LinkKind::classify(&link.settings.kind);
        let mut resolved = self.resolve_identity(link, ns);

        if let Some(item) = &resolved {
            if kind.can_create() && item.kind != link.settings.kind {
                warn!(ns = %ns, ifname = %link.ifname, live_kind = %item.kind, configured_kind = %link.settings.kind, "link kind changed, recreating");
                if mode.applies() {
                    if let Some(ctx) = self.contexts.get(&item.ns) {
                        ctx.link_del(item.index).await?;
                    }
                }
                self.registry.remove(item.index, &item.ns);
                resolved = None;
            }
        }

        let ctx = self.contexts.get(ns).ok_or_else(|| EngineError::Hook(format!("namespace {ns} not prepared")))?;

        let index = match resolved {
            Some(item) => {
                if item.ns != *ns {
                    info!(ns = %ns, from = %item.ns, ifname = %link.ifname, "migrating link into target namespace");
                    if mode.applies() {
                        let source_ctx = self.contexts.get(&item.ns).ok_or_else(|| EngineError::Hook(format!("namespace {} not prepared", item.ns)))?;
                        let ns_file = Self::netns_file(ns)?;
                        source_ctx.link_set_netns_by_fd(item.index, ns_file.as_raw_fd()).await?;
                    }
                    if let Some(tracked) =
                        self.registry.get_link_mut(&GetLinkFilter { index: Some(item.index), ns: Some(&item.ns), ..Default::default() })
                    {
                        tracked.ns = ns.clone();
                    }
                }

                if item.ifname != link.ifname {
                    if let Some(conflict) = self.registry.find_by_alt_name(ns, &link.ifname).map(|c| c.index) {
                        if mode.applies() {
                            ctx.property_del_altname(conflict, &link.ifname).await?;
                        }
                    }
                    if mode.applies() {
                        ctx.link_rename(item.index, &link.ifname).await?;
                    }
                }
                item.index
            }
            None if kind.can_create() => {
                info!(ns = %ns, ifname = %link.ifname, "+ link");
                if mode.applies() {
                    match kind {
                        crate::linkkind::LinkKind::Veth => {
                            let peer_name = link.settings.peer.clone().unwrap_or_else(|| self.registry.gen_unique_ifname());
                            ctx.link_add_veth(&link.ifname, &peer_name).await?;
                            if let Some(peer_ns) = &link.settings.peer_netns {
                                if let Some(peer_item) = ctx.get_link_by_name(&peer_name).await? {
                                    let ns_file = Self::netns_file(peer_ns)?;
                                    ctx.link_set_netns_by_fd(peer_item.index, ns_file.as_raw_fd()).await?;
                                }
                            }
                        }
                        crate::linkkind::LinkKind::Bridge => ctx.link_add_bridge(&link.ifname).await?,
                        _ => ctx.link_add_generic(&link.ifname, &kind.info_kind(&link.settings), Vec::new()).await?,
                    }
                    match ctx.get_link_by_name(&link.ifname).await? {
                        Some(item) => item.index,
                        None => return Ok(()),
                    }
                } else {
                    return Ok(());
                }
            }
            None => {
                warn!(ns = %ns, ifname = %link.ifname, "link cannot be created (physical/dsa) and is not present");
                return Ok(());
            }
        };

        if let Some(admin) = link.settings.state {
            if mode.applies() {
                ctx.link_set_admin_state(index, admin).await?;
            }
        }
        let mtu = link.settings.mtu.or_else(|| {
            self.defaults
                .get_defaults(&link.ifname, &link.settings.kind)
                .and_then(|fields| fields.link.get("mtu"))
                .and_then(|mtu| mtu.parse().ok())
        });
        if let Some(mtu) = mtu {
            if mode.applies() {
                ctx.link_set_mtu(index, mtu).await?;
            }
        }
        if let Some(master) = &link.settings.master {
            let master_index = self
                .registry
                .get_link(&GetLinkFilter { ifname: Some(master.as_str()), ns: Some(ns), ..Default::default() })
                .map(|item| item.index);
            if mode.applies() {
                ctx.link_set_master(index, master_index).await?;
            }
        }

        if let Some(brport) = &link.brport {
            if kind.can_ethtool() {
                crate::brport::reconcile(ctx, index, &link.ifname, brport, mode.applies()).await?;
            }
        }
        if !link.ethtool.is_empty() && kind.can_ethtool() {
            let identity_key = format!("{ns}:{}", link.ifname);
            crate::ethtool::reconcile(ns, &link.ifname, &identity_key, &link.ethtool, mode.applies())
                .await
                .map_err(|e| EngineError::Hook(e.to_string()))?;
        }
        Ok(())
    }

    /// Sweep every live link not matched by any configured link and free it
    /// from the registry (spec §4.6 step 3, §4.3 `free_item`).
    async fn sweep_orphans(&mut self, config: &Config, mode: Mode) -> Result<(), EngineError> {
        let matched: std::collections::BTreeSet<LinkRef> = config
            .namespaces
            .iter()
            .flat_map(|(name, ns_config)| {
                let ns = name.clone().map(NamespaceName::named).unwrap_or(NamespaceName::ROOT);
                ns_config.links.iter().map(move |l| LinkRef::new(l.ifname.clone(), ns.clone()))
            })
            .collect();

        let orphans: Vec<(u32, NamespaceName)> = self
            .registry
            .items()
            .iter()
            .filter(|item| !matched.contains(&LinkRef::new(item.ifname.clone(), item.ns.clone())))
            .filter(|item| item.ifname != "lo")
            .map(|item| (item.index, item.ns.clone()))
            .collect();

        for (index, ns) in orphans {
            let should_delete = self.registry.free_item(index, &ns).unwrap_or(false);
            if should_delete {
                info!(ns = %ns, index, "- orphan link");
                if let Some(ctx) = self.contexts.get(&ns) {
                    if mode.applies() {
                        ctx.link_del(index).await?;
                    }
                }
            } else {
                info!(ns = %ns, index, "orphan link marked down and released");
                let profile = crate::defaults::builtin_orphan_profile();
                let admin_state = match profile.fields.link.get("state").map(String::as_str) {
                    Some("up") => ifstated_model::link::AdminState::Up,
                    _ => ifstated_model::link::AdminState::Down,
                };
                if let Some(ctx) = self.contexts.get(&ns) {
                    if mode.applies() {
                        ctx.link_set_admin_state(index, admin_state).await?;
                        ctx.link_set_master(index, None).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn reconcile_namespace_collections(&self, ns: &NamespaceName, ns_config: &NamespaceConfig, mode: Mode) -> Result<(), EngineError> {
        let ctx = self.contexts.get(ns).ok_or_else(|| EngineError::Hook(format!("namespace {ns} not prepared")))?;

        for family in [Family::Inet, Family::Inet6] {
            let resolver = RegistryOifResolver { registry: &self.registry, ns: ns.clone() };
            crate::routing::reconcile_routes(ctx, family, &ns_config.routes.clone().into_iter().collect(), &resolver, mode.applies()).await?;
            crate::routing::reconcile_rules(ctx, family, &ns_config.rules.clone().into_iter().collect(), mode.applies()).await?;
        }

        crate::sysctl::reconcile_global(&ns_config.global_sysctl.clone().into_iter().collect(), mode.applies())
            .map_err(|e| EngineError::Hook(e.to_string()))?;

        for link in &ns_config.links {
            let Some(item) = self.resolve_identity(link, ns) else { continue };
            let index = item.index;

            let addresses = ns_config.addresses.get(&link.ifname).cloned().unwrap_or_default().into_iter().collect();
            crate::address::reconcile(ctx, index, &link.ifname, &addresses, mode.applies(), &crate::address::AddressOptions::default()).await?;

            if let Some(fdb) = ns_config.fdb.get(&link.ifname) {
                crate::fdb::reconcile(ctx, index, &link.ifname, &fdb.clone().into_iter().collect(), mode.applies()).await?;
            }
            if let Some(neighbours) = ns_config.neighbours.get(&link.ifname) {
                let keyed = neighbours.iter().map(|n| (n.ip, n.clone())).collect();
                crate::neighbour::reconcile(ctx, index, &link.ifname, &keyed, mode.applies()).await?;
            }
            if let Some(sysctl) = ns_config.per_link_sysctl.get(&link.ifname) {
                crate::sysctl::reconcile_per_link(&link.ifname, &sysctl.clone().into_iter().collect(), mode.applies())
                    .map_err(|e| EngineError::Hook(e.to_string()))?;
            }
            if let Some(wg) = ns_config.wireguard.get(&link.ifname) {
                crate::wireguard::reconcile(index, &link.ifname, wg, mode.applies()).await.map_err(|e| EngineError::Hook(e.to_string()))?;
            }
            if let Some(tc) = ns_config.tc.get(&link.ifname) {
                crate::tc::reconcile(ns, &link.ifname, tc, mode.applies()).await.map_err(|e| EngineError::Hook(e.to_string()))?;
            }
            #[cfg(feature = "bpf")]
            if let Some(programs) = ns_config.xdp.get(&link.ifname) {
                // No live-attachment query exists yet (DESIGN.md), so a config
                // that drops an xdp entry doesn't trigger an automatic detach.
                if let Some(model) = programs.first() {
                    crate::xdp::reconcile(index as i32, &link.ifname, Some(model), false, mode.applies())
                        .map_err(|e| EngineError::Hook(e.to_string()))?;
                }
            }
        }
        Ok(())
    }

    /// Filter `config` down to the objects a VRRP transition selects (spec
    /// §4.6 "by_vrrp" selective reconciliation, testable property 11/12):
    /// an untagged object, or one tagged for a *different* `(type, name)`,
    /// is dropped entirely; one tagged for the reported object but not in
    /// the reported state is kept but forced to `state=down` so the rest of
    /// its settings still reconcile; one tagged and in the reported state
    /// passes through untouched.
    pub fn filter_by_vrrp(config: &Config, selector: &VrrpSelector) -> Config {
        let mut filtered = config.clone();
        for ns_config in filtered.namespaces.values_mut() {
            ns_config.links.retain_mut(|l| match &l.vrrp {
                Some(tag) if tag.matches_object(selector) => {
                    if !tag.matches_state(selector) {
                        l.settings.state = Some(ifstated_model::link::AdminState::Down);
                    }
                    true
                }
                _ => false,
            });
        }
        filtered
    }

    /// Run one full reconciliation pass (spec §4.6): prepare namespaces,
    /// stage the dependency graph, apply every link stage in order (retrying
    /// an `EEXIST` rejection once by deleting the conflicting live link and
    /// recreating), sweep orphans, then reconcile every namespace's
    /// collections.
    pub async fn reconcile(&mut self, config: &Config, mode: Mode) -> Result<(), EngineError> {
        self.prepare_namespaces(config).await?;

        let graph = Self::build_graph(config);
        let stages = graph.stages(mode.strict()).map_err(EngineError::LinkCircularLinked)?;

        let links_by_ref: BTreeMap<LinkRef, &LinkModel> = config
            .namespaces
            .iter()
            .flat_map(|(name, ns_config)| {
                let ns = name.clone().map(NamespaceName::named).unwrap_or(NamespaceName::ROOT);
                ns_config.links.iter().map(move |l| (LinkRef::new(l.ifname.clone(), ns.clone()), l))
            })
            .collect();

        for stage in &stages {
            for node in stage {
                let Some(link) = links_by_ref.get(node) else { continue };
                let Err(err) = self.apply_link(&node.ns, link, mode).await else { continue };

                let errno = err.errno();
                self.exceptions.record("apply_link", err.to_string(), vec![node.ifname.clone()], errno);

                if errno == Some(crate::exceptions::EEXIST) && self.exceptions.should_retry_recreate() {
                    warn!(ns = %node.ns, ifname = %node.ifname, "retrying link after EEXIST by recreating");
                    if let Some(item) = self.resolve_identity(link, &node.ns) {
                        if mode.applies() {
                            if let Some(ctx) = self.contexts.get(&item.ns) {
                                ctx.link_del(item.index).await?;
                            }
                        }
                        self.registry.remove(item.index, &item.ns);
                    }
                    if let Err(retry_err) = self.apply_link(&node.ns, link, mode).await {
                        self.exceptions.record("apply_link_retry", retry_err.to_string(), vec![node.ifname.clone()], retry_err.errno());
                        if mode.strict() {
                            return Err(retry_err);
                        }
                    }
                } else if mode.strict() {
                    return Err(err);
                }
            }
        }

        self.sweep_orphans(config, mode).await?;

        for (name, ns_config) in &config.namespaces {
            let ns = name.clone().map(NamespaceName::named).unwrap_or(NamespaceName::ROOT);
            self.reconcile_namespace_collections(&ns, ns_config, mode).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifstated_model::link::{VrrpKind, VrrpState, VrrpTag};

    fn test_link(ifname: &str) -> LinkModel {
        LinkModel {
            ifname: ifname.to_string(),
            ns: NamespaceName::root(),
            settings: ifstated_model::link::LinkSettings { ifname: ifname.to_string(), ..Default::default() },
            ethtool: Default::default(),
            brport: None,
            vrrp: None,
            bind_netns: None,
        }
    }

    #[test]
    fn vrrp_filter_forces_down_link_in_non_selected_state() {
        let mut config = Config::default();
        let mut ns_config = NamespaceConfig::default();
        let mut link = test_link("wan0bk");
        link.vrrp = Some(VrrpTag { kind: VrrpKind::Instance, name: "vi_1".into(), states: vec![VrrpState::Master] });
        ns_config.links.push(link);
        config.namespaces.insert(None, ns_config);

        let selector = VrrpSelector { kind: VrrpKind::Instance, name: "vi_1".into(), state: VrrpState::Backup };
        let filtered = Engine::filter_by_vrrp(&config, &selector);
        let links = &filtered.namespaces[&None].links;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].settings.state, Some(ifstated_model::link::AdminState::Down));
    }

    #[test]
    fn vrrp_filter_leaves_state_untouched_when_selected() {
        let mut config = Config::default();
        let mut ns_config = NamespaceConfig::default();
        let mut link = test_link("wan0bk");
        link.vrrp = Some(VrrpTag { kind: VrrpKind::Instance, name: "vi_1".into(), states: vec![VrrpState::Master] });
        ns_config.links.push(link);
        config.namespaces.insert(None, ns_config);

        let selector = VrrpSelector { kind: VrrpKind::Instance, name: "vi_1".into(), state: VrrpState::Master };
        let filtered = Engine::filter_by_vrrp(&config, &selector);
        let links = &filtered.namespaces[&None].links;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].settings.state, None);
    }

    #[test]
    fn vrrp_filter_drops_untagged_links() {
        let mut config = Config::default();
        let mut ns_config = NamespaceConfig::default();
        ns_config.links.push(test_link("eth0"));
        config.namespaces.insert(None, ns_config);

        let selector = VrrpSelector { kind: VrrpKind::Instance, name: "vi_1".into(), state: VrrpState::Master };
        let filtered = Engine::filter_by_vrrp(&config, &selector);
        assert!(filtered.namespaces[&None].links.is_empty());
    }

    #[test]
    fn vrrp_filter_drops_links_tagged_for_a_different_object() {
        let mut config = Config::default();
        let mut ns_config = NamespaceConfig::default();
        let mut link = test_link("wan1");
        link.vrrp = Some(VrrpTag { kind: VrrpKind::Instance, name: "vi_2".into(), states: vec![VrrpState::Master] });
        ns_config.links.push(link);
        config.namespaces.insert(None, ns_config);

        let selector = VrrpSelector { kind: VrrpKind::Instance, name: "vi_1".into(), state: VrrpState::Master };
        let filtered = Engine::filter_by_vrrp(&config, &selector);
        assert!(filtered.namespaces[&None].links.is_empty());
    }

    #[test]
    fn dependency_graph_orders_master_before_member() {
        let mut config = Config::default();
        let mut ns_config = NamespaceConfig::default();
        let br = test_link("br0");
        let mut member = test_link("eth0");
        member.settings.master = Some("br0".into());
        ns_config.links.push(member);
        ns_config.links.push(br);
        config.namespaces.insert(None, ns_config);

        let graph = Engine::build_graph(&config);
        let stages = graph.stages(true).unwrap();
        assert_eq!(stages[0], vec![LinkRef::new("br0", NamespaceName::root())]);
        assert_eq!(stages[1], vec![LinkRef::new("eth0", NamespaceName::root())]);
    }

    #[test]
    fn dependency_graph_orders_lower_link_before_vlan() {
        let mut config = Config::default();
        let mut ns_config = NamespaceConfig::default();
        let lower = test_link("eth0");
        let mut vlan = test_link("eth0.100");
        vlan.settings.lower_link = Some("eth0".into());
        ns_config.links.push(vlan);
        ns_config.links.push(lower);
        config.namespaces.insert(None, ns_config);

        let graph = Engine::build_graph(&config);
        let stages = graph.stages(true).unwrap();
        assert_eq!(stages[0], vec![LinkRef::new("eth0", NamespaceName::root())]);
        assert_eq!(stages[1], vec![LinkRef::new("eth0.100", NamespaceName::root())]);
    }
}
