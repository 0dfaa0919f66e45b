//! Address enumerate/add/del (spec §4.1, §4.4 "Addresses").

use std::net::IpAddr;

use futures::TryStreamExt;
use netlink_packet_route::address::AddressAttribute;

use crate::context::NamespaceContext;
use crate::error::NetlinkError;

#[derive(Clone, Debug, PartialEq)]
pub struct LiveAddress {
    pub ip: IpAddr,
    pub prefixlen: u8,
    pub permanent: bool,
}

impl NamespaceContext {
    pub async fn enumerate_addresses(&self, ifindex: u32) -> Result<Vec<LiveAddress>, NetlinkError> {
        let mut stream = self.handle.address().get().set_link_index_filter(ifindex).execute();
        let mut out = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            let ip = msg.attributes.iter().find_map(|a| match a {
                AddressAttribute::Address(ip) => Some(*ip),
                _ => None,
            });
            let Some(ip) = ip else { continue };
            // PERMANENT addresses lack IFA_F_TEMPORARY/IFA_F_DADFAILED style
            // transient flags; treat absence of IFA_F_DYNAMIC as permanent.
            let permanent = !msg.attributes.iter().any(|a| matches!(a, AddressAttribute::Flags(f) if f.contains(&netlink_packet_route::address::AddressFlag::Dynamic)));
            out.push(LiveAddress { ip, prefixlen: msg.header.prefix_len, permanent });
        }
        Ok(out)
    }

    pub async fn addr_add(&self, ifindex: u32, ip: IpAddr, prefixlen: u8) -> Result<(), NetlinkError> {
        self.handle.address().add(ifindex, ip, prefixlen).execute().await?;
        Ok(())
    }

    pub async fn addr_del(&self, ifindex: u32, ip: IpAddr, prefixlen: u8) -> Result<(), NetlinkError> {
        let mut stream = self.handle.address().get().set_link_index_filter(ifindex).execute();
        while let Some(msg) = stream.try_next().await? {
            let matches = msg.attributes.iter().any(|a| matches!(a, AddressAttribute::Address(a) if *a == ip))
                && msg.header.prefix_len == prefixlen;
            if matches {
                self.handle.address().del(msg).execute().await?;
                return Ok(());
            }
        }
        Ok(())
    }
}
