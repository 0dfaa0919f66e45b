//! Cross-namespace inventory of live links and identity matching (spec
//! §4.3).

use ifstated_model::link::LinkRegistryItem;
use ifstated_model::namespace::NamespaceName;
use rand::Rng;

#[derive(Clone, Debug, Default)]
pub struct GetLinkFilter<'a> {
    pub index: Option<u32>,
    pub ifname: Option<&'a str>,
    pub address: Option<&'a str>,
    pub kind: Option<&'a str>,
    pub businfo: Option<&'a str>,
    pub permaddr: Option<&'a str>,
    pub ns: Option<&'a NamespaceName>,
    pub orphan: Option<bool>,
}

impl<'a> GetLinkFilter<'a> {
    fn matches(&self, item: &LinkRegistryItem) -> bool {
        self.index.map_or(true, |v| v == item.index)
            && self.ifname.map_or(true, |v| v == item.ifname)
            && self.address.map_or(true, |v| Some(v.to_string()) == item.address)
            && self.kind.map_or(true, |v| v == item.kind)
            && self.businfo.map_or(true, |v| Some(v.to_string()) == item.businfo)
            && self.permaddr.map_or(true, |v| Some(v.to_string()) == item.permaddr)
            && self.ns.map_or(true, |v| *v == item.ns)
            && self.orphan.map_or(true, |v| v == item.orphan)
    }
}

/// Inventory of every live link across all tracked namespaces (spec §4.3).
#[derive(Clone, Debug, Default)]
pub struct LinkRegistry {
    items: Vec<LinkRegistryItem>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[LinkRegistryItem] {
        &self.items
    }

    /// `add_link(ns, observed)` (spec §4.3): appends an enumerated item.
    pub fn add_link(&mut self, item: LinkRegistryItem) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = LinkRegistryItem>) {
        self.items.extend(items);
    }

    /// `get_link(filters)`: matches by any conjunction of the supported
    /// fields (spec §4.3).
    pub fn get_link(&self, filter: &GetLinkFilter<'_>) -> Option<&LinkRegistryItem> {
        self.items.iter().find(|item| filter.matches(item))
    }

    pub fn get_link_mut(&mut self, filter: &GetLinkFilter<'_>) -> Option<&mut LinkRegistryItem> {
        self.items.iter_mut().find(|item| filter.matches(item))
    }

    pub fn find_by_alt_name(&self, ns: &NamespaceName, alt_name: &str) -> Option<&LinkRegistryItem> {
        self.items.iter().find(|item| &item.ns == ns && item.alt_names.iter().any(|n| n == alt_name))
    }

    /// Mark `item` freed (spec §4.3 `free_item`, invoked by the orphan
    /// sweep). Returns whether the item should additionally be deleted from
    /// the kernel (virtual kinds) as opposed to merely taken down and
    /// retained as a rebindable physical orphan.
    pub fn free_item(&mut self, index: u32, ns: &NamespaceName) -> Option<bool> {
        let item = self.items.iter_mut().find(|i| i.index == index && &i.ns == ns)?;
        if item.is_physical() {
            item.orphan = true;
            item.matched_ifname = None;
            Some(false)
        } else {
            self.items.retain(|i| !(i.index == index && &i.ns == ns));
            Some(true)
        }
    }

    pub fn remove(&mut self, index: u32, ns: &NamespaceName) {
        self.items.retain(|i| !(i.index == index && &i.ns == ns));
    }

    /// `gen_unique_ifname()` (spec §4.3): `ifs.tmp.<6-hex-chars>`, guaranteed
    /// not to collide across all tracked namespaces.
    pub fn gen_unique_ifname(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let suffix: u32 = rng.gen_range(0..0x1000000);
            let candidate = format!("ifs.tmp.{suffix:06x}");
            if !self.items.iter().any(|i| i.ifname == candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifstated_model::link::AdminState;

    fn item(index: u32, ifname: &str, kind: &str) -> LinkRegistryItem {
        LinkRegistryItem {
            index,
            ns: NamespaceName::root(),
            ifname: ifname.to_string(),
            kind: kind.to_string(),
            address: None,
            businfo: None,
            permaddr: None,
            admin_state: AdminState::Down,
            master_index: None,
            alt_names: vec![],
            orphan: false,
            matched_ifname: None,
        }
    }

    #[test]
    fn free_item_marks_physical_orphan_instead_of_removing() {
        let mut reg = LinkRegistry::new();
        reg.add_link(item(1, "eth0", "physical"));
        let should_delete = reg.free_item(1, &NamespaceName::root()).unwrap();
        assert!(!should_delete);
        let found = reg.get_link(&GetLinkFilter { orphan: Some(true), ..Default::default() }).unwrap();
        assert_eq!(found.ifname, "eth0");
    }

    #[test]
    fn free_item_removes_virtual_links() {
        let mut reg = LinkRegistry::new();
        reg.add_link(item(2, "br0", "bridge"));
        let should_delete = reg.free_item(2, &NamespaceName::root()).unwrap();
        assert!(should_delete);
        assert!(reg.items().is_empty());
    }

    #[test]
    fn gen_unique_ifname_avoids_existing_names() {
        let mut reg = LinkRegistry::new();
        for i in 0..5 {
            reg.add_link(item(i, &format!("ifs.tmp.{i:06x}"), "veth"));
        }
        let name = reg.gen_unique_ifname();
        assert!(name.starts_with("ifs.tmp."));
        assert!(!reg.items().iter().any(|it| it.ifname == name));
    }
}
