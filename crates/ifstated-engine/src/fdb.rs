//! FDB reconciler (spec §4.4 "FDB"): keyed by `(mac, dst)`.

use ifstated_model::collection::IndexedCollection;
use ifstated_model::fdb::{FdbKey, FdbModel};
use ifstated_netlink::context::NamespaceContext;
use ifstated_netlink::fdb_ops::LiveFdbEntry;
use ifstated_netlink::NetlinkError;
use tracing::info;

fn parse_mac(lladdr: &str) -> Option<Vec<u8>> {
    lladdr.split(':').map(|b| u8::from_str_radix(b, 16).ok()).collect()
}

pub async fn reconcile(
    ctx: &NamespaceContext,
    ifindex: u32,
    ifname: &str,
    desired: &IndexedCollection<FdbKey, FdbModel>,
    apply: bool,
) -> Result<(), NetlinkError> {
    let live_list = ctx.enumerate_fdb(ifindex).await?;
    let live: IndexedCollection<FdbKey, LiveFdbEntry> =
        live_list.into_iter().map(|e| (FdbKey { lladdr: e.lladdr.clone(), dst: e.dst }, e)).collect();

    for (key, model) in desired.iter() {
        if live.get(key).is_some() {
            continue;
        }
        let Some(lladdr) = parse_mac(&key.lladdr) else { continue };
        info!(ifname, lladdr = %key.lladdr, "+ fdb");
        if apply {
            ctx.fdb_add(ifindex, &lladdr, key.dst, model).await?;
        }
    }

    for (key, live_entry) in live.iter() {
        if desired.get(key).is_some() {
            continue;
        }
        info!(ifname, lladdr = %key.lladdr, "- fdb");
        if apply {
            ctx.fdb_del(live_entry.clone()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_parses_to_six_bytes() {
        assert_eq!(parse_mac("aa:bb:cc:dd:ee:ff"), Some(vec![0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]));
        assert_eq!(parse_mac("not-a-mac"), None);
    }
}
