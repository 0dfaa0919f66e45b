//! Neighbour-table reconciler (spec §4.4 "Neighbours"): only
//! `NUD_PERMANENT` entries are managed.

use ifstated_model::collection::IndexedCollection;
use ifstated_model::neighbour::NeighbourModel;
use ifstated_netlink::context::NamespaceContext;
use ifstated_netlink::neigh_ops::LiveNeighbour;
use ifstated_netlink::NetlinkError;
use tracing::info;

fn parse_mac(lladdr: &str) -> Option<Vec<u8>> {
    lladdr.split(':').map(|b| u8::from_str_radix(b, 16).ok()).collect()
}

pub async fn reconcile(
    ctx: &NamespaceContext,
    ifindex: u32,
    ifname: &str,
    desired: &IndexedCollection<std::net::IpAddr, NeighbourModel>,
    apply: bool,
) -> Result<(), NetlinkError> {
    let live_list = ctx.enumerate_neighbours(ifindex).await?;
    let live: IndexedCollection<std::net::IpAddr, LiveNeighbour> =
        live_list.into_iter().filter_map(|n| n.ip.map(|ip| (ip, n))).collect();

    for (ip, model) in desired.iter() {
        match live.get(ip) {
            Some(live_n) if live_n.lladdr.as_deref() == Some(model.lladdr.as_str()) => {}
            _ => {
                let Some(lladdr) = parse_mac(&model.lladdr) else { continue };
                info!(ifname, ip = %ip, "+ neighbour");
                if apply {
                    ctx.neigh_add(ifindex, *ip, &lladdr).await?;
                }
            }
        }
    }

    for (ip, live_n) in live.iter() {
        if desired.get(ip).is_some() {
            continue;
        }
        info!(ifname, ip = %ip, "- neighbour");
        if apply {
            ctx.neigh_del(live_n.clone()).await?;
        }
    }

    Ok(())
}
