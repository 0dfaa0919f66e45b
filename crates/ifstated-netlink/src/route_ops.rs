//! Route enumerate/add/replace/del (spec §4.1, §4.4 "Routes").

use std::net::IpAddr;

use futures::TryStreamExt;
use ifstated_model::route::Family;
use netlink_packet_route::route::{RouteAddress, RouteAttribute, RouteMessage};
use netlink_packet_route::AddressFamily;
use rtnetlink::IpVersion;

use crate::context::NamespaceContext;
use crate::error::NetlinkError;

#[derive(Clone, Debug)]
pub struct LiveRoute {
    pub message: RouteMessage,
    pub dst: Option<(IpAddr, u8)>,
    pub priority: u32,
    pub table: u32,
    pub proto: u8,
}

fn ip_version(family: Family) -> IpVersion {
    match family {
        Family::Inet => IpVersion::V4,
        Family::Inet6 => IpVersion::V6,
    }
}

fn dst_of(msg: &RouteMessage) -> Option<(IpAddr, u8)> {
    msg.attributes.iter().find_map(|a| match a {
        RouteAttribute::Destination(RouteAddress::Inet(ip)) => Some((IpAddr::V4(*ip), msg.header.destination_prefix_length)),
        RouteAttribute::Destination(RouteAddress::Inet6(ip)) => Some((IpAddr::V6(*ip), msg.header.destination_prefix_length)),
        _ => None,
    })
}

fn priority_of(msg: &RouteMessage) -> u32 {
    msg.attributes
        .iter()
        .find_map(|a| match a {
            RouteAttribute::Priority(p) => Some(*p),
            _ => None,
        })
        .unwrap_or(0)
}

fn table_of(msg: &RouteMessage) -> u32 {
    msg.attributes
        .iter()
        .find_map(|a| match a {
            RouteAttribute::Table(t) => Some(*t),
            _ => None,
        })
        .unwrap_or(msg.header.table as u32)
}

impl NamespaceContext {
    /// Enumerate routes of `family`, excluding the local table (id 255,
    /// spec §4.4 "The live kernel's local table is never touched").
    pub async fn enumerate_routes(&self, family: Family) -> Result<Vec<LiveRoute>, NetlinkError> {
        let mut stream = self.handle.route().get(ip_version(family)).execute();
        let mut out = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            let table = table_of(&msg);
            if table == ifstated_model::route::LOCAL_TABLE {
                continue;
            }
            out.push(LiveRoute {
                dst: dst_of(&msg),
                priority: priority_of(&msg),
                table,
                proto: msg.header.protocol.into(),
                message: msg,
            });
        }
        Ok(out)
    }

    /// Add or replace a route. `via` carries an `RTA_VIA`-style nexthop of
    /// either family (spec §4.4 "via accepts an address of either family");
    /// when its family differs from `dst`'s the attribute is still emitted
    /// qualified by its own family, matching the adopted `RTA_VIA` path
    /// (spec §9 Open Question #1).
    #[allow(clippy::too_many_arguments)]
    pub async fn route_replace(
        &self,
        dst: Option<(IpAddr, u8)>,
        priority: u32,
        table: u32,
        gateway: Option<IpAddr>,
        via: Option<IpAddr>,
        oif: Option<u32>,
        proto: u8,
    ) -> Result<(), NetlinkError> {
        let family = match dst.map(|(ip, _)| ip) {
            Some(IpAddr::V4(_)) | None => AddressFamily::Inet,
            Some(IpAddr::V6(_)) => AddressFamily::Inet6,
        };
        let mut request = self.handle.route().add();
        let message = request.message_mut();
        message.header.address_family = family;
        message.header.protocol = proto.into();
        message.header.table = (table & 0xFF) as u8;
        if let Some((ip, plen)) = dst {
            message.header.destination_prefix_length = plen;
            let addr = match ip {
                IpAddr::V4(v4) => RouteAddress::Inet(v4),
                IpAddr::V6(v6) => RouteAddress::Inet6(v6),
            };
            message.attributes.push(RouteAttribute::Destination(addr));
        }
        message.attributes.push(RouteAttribute::Priority(priority));
        message.attributes.push(RouteAttribute::Table(table));
        if let Some(gw) = gateway {
            let addr = match gw {
                IpAddr::V4(v4) => RouteAddress::Inet(v4),
                IpAddr::V6(v6) => RouteAddress::Inet6(v6),
            };
            message.attributes.push(RouteAttribute::Gateway(addr));
        }
        if let Some(via_addr) = via {
            let addr = match via_addr {
                IpAddr::V4(v4) => RouteAddress::Inet(v4),
                IpAddr::V6(v6) => RouteAddress::Inet6(v6),
            };
            message.attributes.push(RouteAttribute::Via(addr));
        }
        if let Some(oif) = oif {
            message.attributes.push(RouteAttribute::Oif(oif));
        }

        request.replace().execute().await.map_err(NetlinkError::Rtnetlink)?;
        Ok(())
    }

    pub async fn route_del(&self, route: LiveRoute) -> Result<(), NetlinkError> {
        self.handle.route().del(route.message).execute().await?;
        Ok(())
    }
}
