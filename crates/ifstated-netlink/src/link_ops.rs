//! Link enumerate/create/modify/delete operations (spec §4.1).

use futures::TryStreamExt;
use ifstated_model::link::{AdminState, LinkRegistryItem};
use netlink_packet_route::link::{LinkAttribute, LinkFlags, LinkInfo, State};
use rtnetlink::Handle;

use crate::context::NamespaceContext;
use crate::error::NetlinkError;

fn admin_state(flags: &LinkFlags) -> AdminState {
    if flags.contains(&netlink_packet_route::link::LinkFlag::Up) {
        AdminState::Up
    } else {
        AdminState::Down
    }
}

fn kind_of(attrs: &[LinkAttribute]) -> String {
    for attr in attrs {
        if let LinkAttribute::LinkInfo(infos) = attr {
            for info in infos {
                if let LinkInfo::Kind(kind) = info {
                    return kind.clone();
                }
            }
        }
    }
    "physical".to_string()
}

fn address_of(attrs: &[LinkAttribute]) -> Option<String> {
    attrs.iter().find_map(|a| match a {
        LinkAttribute::Address(bytes) => Some(
            bytes
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(":"),
        ),
        _ => None,
    })
}

fn ifname_of(attrs: &[LinkAttribute]) -> Option<String> {
    attrs.iter().find_map(|a| match a {
        LinkAttribute::IfName(name) => Some(name.clone()),
        _ => None,
    })
}

fn master_of(attrs: &[LinkAttribute]) -> Option<u32> {
    attrs.iter().find_map(|a| match a {
        LinkAttribute::Controller(idx) => Some(*idx),
        _ => None,
    })
}

fn alt_names_of(attrs: &[LinkAttribute]) -> Vec<String> {
    attrs
        .iter()
        .filter_map(|a| match a {
            LinkAttribute::PropList(props) => Some(props.clone()),
            _ => None,
        })
        .flatten()
        .filter_map(|p| match p {
            netlink_packet_route::link::Prop::AltIfName(name) => Some(name),
            _ => None,
        })
        .collect()
}

impl NamespaceContext {
    /// Enumerate every live link in this namespace (spec §4.1
    /// `enumerate_links`, §4.3 registry population).
    pub async fn enumerate_links(&self) -> Result<Vec<LinkRegistryItem>, NetlinkError> {
        let mut stream = self.handle.link().get().execute();
        let mut out = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            let ifname = match ifname_of(&msg.attributes) {
                Some(name) => name,
                None => continue,
            };
            out.push(LinkRegistryItem {
                index: msg.header.index,
                ns: self.ns.clone(),
                ifname,
                kind: kind_of(&msg.attributes),
                address: address_of(&msg.attributes),
                businfo: None,
                permaddr: None,
                admin_state: admin_state(&msg.header.flags),
                master_index: master_of(&msg.attributes),
                alt_names: alt_names_of(&msg.attributes),
                orphan: false,
                matched_ifname: None,
            });
        }
        Ok(out)
    }

    pub async fn get_link_by_name(&self, ifname: &str) -> Result<Option<LinkRegistryItem>, NetlinkError> {
        Ok(self.enumerate_links().await?.into_iter().find(|l| l.ifname == ifname))
    }

    pub async fn get_link_by_index(&self, index: u32) -> Result<Option<LinkRegistryItem>, NetlinkError> {
        Ok(self.enumerate_links().await?.into_iter().find(|l| l.index == index))
    }

    /// Bring a link up or down.
    pub async fn link_set_admin_state(&self, index: u32, state: AdminState) -> Result<(), NetlinkError> {
        let req = self.handle.link().set(index);
        match state {
            AdminState::Up => req.up().execute().await?,
            AdminState::Down => req.down().execute().await?,
        }
        Ok(())
    }

    pub async fn link_set_mtu(&self, index: u32, mtu: u32) -> Result<(), NetlinkError> {
        self.handle.link().set(index).mtu(mtu).execute().await?;
        Ok(())
    }

    pub async fn link_set_master(&self, index: u32, master_index: Option<u32>) -> Result<(), NetlinkError> {
        let req = self.handle.link().set(index);
        match master_index {
            Some(m) => req.controller(m).execute().await?,
            None => req.nocontroller().execute().await?,
        }
        Ok(())
    }

    pub async fn link_rename(&self, index: u32, new_name: &str) -> Result<(), NetlinkError> {
        self.handle.link().set(index).name(new_name.to_string()).execute().await?;
        Ok(())
    }

    /// Move a link into another namespace, identified by its pinned-file fd
    /// (spec §4.1 "setns_by_fd").
    pub async fn link_set_netns_by_fd(&self, index: u32, ns_fd: i32) -> Result<(), NetlinkError> {
        self.handle.link().set(index).setns_by_fd(ns_fd).execute().await?;
        Ok(())
    }

    pub async fn link_del(&self, index: u32) -> Result<(), NetlinkError> {
        self.handle.link().del(index).execute().await?;
        Ok(())
    }

    /// Delete the `IFLA_PROP_LIST` altname `name` on `index` (spec §4.6
    /// "Altname conflict prevention": `property_del altname=...`).
    pub async fn property_del_altname(&self, index: u32, name: &str) -> Result<(), NetlinkError> {
        self.handle
            .link()
            .property_del(index)
            .alt_ifname(name.to_string())
            .execute()
            .await?;
        Ok(())
    }

    /// Create a veth pair (spec §3 bind-netns kind `veth`).
    pub async fn link_add_veth(&self, name: &str, peer: &str) -> Result<(), NetlinkError> {
        self.handle.link().add().veth(name.to_string(), peer.to_string()).execute().await?;
        Ok(())
    }

    /// Create a bridge.
    pub async fn link_add_bridge(&self, name: &str) -> Result<(), NetlinkError> {
        self.handle.link().add().bridge(name.to_string()).execute().await?;
        Ok(())
    }

    /// Create a vlan sub-interface.
    pub async fn link_add_vlan(&self, name: &str, parent_index: u32, vlan_id: u16) -> Result<(), NetlinkError> {
        self.handle
            .link()
            .add()
            .vlan(name.to_string(), parent_index, vlan_id)
            .execute()
            .await?;
        Ok(())
    }

    /// Generic link creation for kinds `rtnetlink`'s builder doesn't special
    /// case (vxlan, gre, ipip, wireguard, xfrm, ...): push `IFLA_LINKINFO`
    /// with `IFLA_INFO_KIND`/`IFLA_INFO_DATA` directly onto the pending
    /// message, the way `rtnetlink`'s own kind-specific builders do
    /// internally.
    pub async fn link_add_generic(&self, name: &str, kind: &str, info_data: Vec<u8>) -> Result<(), NetlinkError> {
        let mut request = self.handle.link().add().name(name.to_string());
        request
            .message_mut()
            .attributes
            .push(LinkAttribute::LinkInfo(vec![LinkInfo::Kind(kind.to_string()), LinkInfo::Data(info_data)]));
        request.execute().await?;
        Ok(())
    }

    pub fn handle_ref(&self) -> &Handle {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_defaults_to_physical_when_no_linkinfo() {
        assert_eq!(kind_of(&[]), "physical");
    }
}
