//! Bridge forwarding-database enumerate/add/del (spec §4.4 "FDB"). FDB
//! entries are `AF_BRIDGE`-family neighbour messages (`RTM_NEWNEIGH` with
//! `NTF_SELF`), distinct from the `AF_INET`/`AF_INET6` neighbour table
//! handled in `neigh_ops`.

use std::net::IpAddr;

use futures::TryStreamExt;
use ifstated_model::fdb::{FdbModel, NTF_SELF};
use netlink_packet_route::neighbour::{NeighbourAddress, NeighbourAttribute, NeighbourFlags, NeighbourMessage, NeighbourState};
use netlink_packet_route::AddressFamily;

use crate::context::NamespaceContext;
use crate::error::NetlinkError;

#[derive(Clone, Debug)]
pub struct LiveFdbEntry {
    pub message: NeighbourMessage,
    pub lladdr: String,
    pub dst: Option<IpAddr>,
}

fn lladdr_of(msg: &NeighbourMessage) -> Option<String> {
    msg.attributes.iter().find_map(|a| match a {
        NeighbourAttribute::LinkLocalAddress(bytes) => Some(bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")),
        _ => None,
    })
}

fn dst_of(msg: &NeighbourMessage) -> Option<IpAddr> {
    msg.attributes.iter().find_map(|a| match a {
        NeighbourAttribute::Destination(NeighbourAddress::Inet(ip)) => Some(IpAddr::V4(*ip)),
        NeighbourAttribute::Destination(NeighbourAddress::Inet6(ip)) => Some(IpAddr::V6(*ip)),
        _ => None,
    })
}

fn is_self(msg: &NeighbourMessage) -> bool {
    msg.header.flags.contains(NeighbourFlags::Self_)
}

impl NamespaceContext {
    pub async fn enumerate_fdb(&self, ifindex: u32) -> Result<Vec<LiveFdbEntry>, NetlinkError> {
        let mut stream = self
            .handle
            .neighbours()
            .get()
            .set_family(AddressFamily::Bridge)
            .set_link_index_filter(ifindex)
            .execute();
        let mut out = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            if !is_self(&msg) {
                continue;
            }
            let Some(lladdr) = lladdr_of(&msg) else { continue };
            out.push(LiveFdbEntry { dst: dst_of(&msg), lladdr, message: msg });
        }
        Ok(out)
    }

    pub async fn fdb_add(&self, ifindex: u32, lladdr: &[u8], dst: Option<IpAddr>, fdb: &FdbModel) -> Result<(), NetlinkError> {
        let mut request = self.handle.neighbours().add(ifindex, dst.unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)));
        let message = request.message_mut();
        message.header.family = AddressFamily::Bridge;
        message.header.state = NeighbourState::from_bits_truncate(fdb.state);
        message.header.flags = NeighbourFlags::from_bits_truncate(fdb.flags | NTF_SELF);
        message.attributes.retain(|a| !matches!(a, NeighbourAttribute::Destination(_)));
        message.attributes.push(NeighbourAttribute::LinkLocalAddress(lladdr.to_vec()));
        if let Some(ip) = dst {
            let addr = match ip {
                IpAddr::V4(v4) => NeighbourAddress::Inet(v4),
                IpAddr::V6(v6) => NeighbourAddress::Inet6(v6),
            };
            message.attributes.push(NeighbourAttribute::Destination(addr));
        }
        if let Some(port) = fdb.port {
            message.attributes.push(NeighbourAttribute::Port(port));
        }
        if let Some(vni) = fdb.vni {
            message.attributes.push(NeighbourAttribute::Vni(vni));
        }
        request.execute().await?;
        Ok(())
    }

    pub async fn fdb_del(&self, entry: LiveFdbEntry) -> Result<(), NetlinkError> {
        self.handle.neighbours().del(entry.message).execute().await?;
        Ok(())
    }
}
