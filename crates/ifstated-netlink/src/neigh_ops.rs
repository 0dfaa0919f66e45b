//! Neighbour-table enumerate/add/del (spec §4.4 "Neighbours"). Only
//! `NUD_PERMANENT` entries are managed; everything else is left to the
//! kernel's own ARP/NDP resolution.

use std::net::IpAddr;

use futures::TryStreamExt;
use netlink_packet_route::neighbour::{NeighbourAddress, NeighbourAttribute, NeighbourMessage, NeighbourState};
use netlink_packet_route::AddressFamily;

use crate::context::NamespaceContext;
use crate::error::NetlinkError;

#[derive(Clone, Debug)]
pub struct LiveNeighbour {
    pub message: NeighbourMessage,
    pub ip: Option<IpAddr>,
    pub lladdr: Option<String>,
}

fn ip_of(msg: &NeighbourMessage) -> Option<IpAddr> {
    msg.attributes.iter().find_map(|a| match a {
        NeighbourAttribute::Destination(NeighbourAddress::Inet(ip)) => Some(IpAddr::V4(*ip)),
        NeighbourAttribute::Destination(NeighbourAddress::Inet6(ip)) => Some(IpAddr::V6(*ip)),
        _ => None,
    })
}

fn lladdr_of(msg: &NeighbourMessage) -> Option<String> {
    msg.attributes.iter().find_map(|a| match a {
        NeighbourAttribute::LinkLocalAddress(bytes) => Some(bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")),
        _ => None,
    })
}

/// Only the permanent entries this collaborator manages (spec §4.4
/// Neighbours: "Only NUD_PERMANENT entries are considered").
fn is_permanent(msg: &NeighbourMessage) -> bool {
    msg.header.state.contains(NeighbourState::Permanent)
}

impl NamespaceContext {
    pub async fn enumerate_neighbours(&self, ifindex: u32) -> Result<Vec<LiveNeighbour>, NetlinkError> {
        let mut stream = self.handle.neighbours().get().set_link_index_filter(ifindex).execute();
        let mut out = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            if !is_permanent(&msg) {
                continue;
            }
            out.push(LiveNeighbour { ip: ip_of(&msg), lladdr: lladdr_of(&msg), message: msg });
        }
        Ok(out)
    }

    pub async fn neigh_add(&self, ifindex: u32, ip: IpAddr, lladdr: &[u8]) -> Result<(), NetlinkError> {
        let family = match ip {
            IpAddr::V4(_) => AddressFamily::Inet,
            IpAddr::V6(_) => AddressFamily::Inet6,
        };
        let mut request = self.handle.neighbours().add(ifindex, ip);
        let message = request.message_mut();
        message.header.family = family;
        message.header.state = NeighbourState::Permanent;
        message.attributes.push(NeighbourAttribute::LinkLocalAddress(lladdr.to_vec()));
        request.execute().await?;
        Ok(())
    }

    pub async fn neigh_del(&self, neighbour: LiveNeighbour) -> Result<(), NetlinkError> {
        self.handle.neighbours().del(neighbour.message).execute().await?;
        Ok(())
    }
}
