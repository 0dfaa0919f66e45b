//! Address reconciler (spec §4.4 "Addresses"): keyed by `ip/prefixlen`.

use ifstated_model::addr::{builtin_ignore_networks, AddrKey, AddressModel};
use ifstated_model::collection::IndexedCollection;
use ifstated_netlink::addr_ops::LiveAddress;
use ifstated_netlink::context::NamespaceContext;
use ifstated_netlink::NetlinkError;
use tracing::info;

/// `ipaddr_dynamic` (spec §4.4): when true, deletion is further restricted
/// to addresses bearing the `PERMANENT` flag.
pub struct AddressOptions {
    pub ignore_networks: Vec<ipnetwork::IpNetwork>,
    pub restrict_delete_to_permanent: bool,
}

impl Default for AddressOptions {
    fn default() -> Self {
        Self { ignore_networks: builtin_ignore_networks(), restrict_delete_to_permanent: false }
    }
}

fn covered_by_ignore(ip: std::net::IpAddr, ignore: &[ipnetwork::IpNetwork]) -> bool {
    ignore.iter().any(|net| net.contains(ip))
}

/// Addresses carry no mutable in-place settings (spec §4.4): presence under
/// a key is the whole story, so reconciliation is pure add/remove, not the
/// three-way add/remove/change split `IndexedCollection::diff` gives
/// collections whose value type is shared between desired and live.
pub async fn reconcile(
    ctx: &NamespaceContext,
    ifindex: u32,
    ifname: &str,
    desired: &IndexedCollection<AddrKey, AddressModel>,
    apply: bool,
    opts: &AddressOptions,
) -> Result<(), NetlinkError> {
    let live_list = ctx.enumerate_addresses(ifindex).await?;
    let live: IndexedCollection<AddrKey, LiveAddress> = live_list
        .into_iter()
        .map(|a| (AddrKey { ip: a.ip, prefixlen: a.prefixlen }, a))
        .collect();

    for (key, _) in desired.iter() {
        if live.get(key).is_none() {
            info!(ifname, addr = %key, "+ address");
            if apply {
                ctx.addr_add(ifindex, key.ip, key.prefixlen).await?;
            }
        }
    }

    for (key, live_addr) in live.iter() {
        if desired.get(key).is_some() {
            continue;
        }
        if opts.restrict_delete_to_permanent && !live_addr.permanent {
            continue;
        }
        if covered_by_ignore(key.ip, &opts.ignore_networks) {
            continue;
        }
        info!(ifname, addr = %key, "- address");
        if apply {
            ctx.addr_del(ifindex, key.ip, key.prefixlen).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_local_v4_is_ignored_by_default() {
        let opts = AddressOptions::default();
        assert!(covered_by_ignore("169.254.1.1".parse().unwrap(), &opts.ignore_networks));
        assert!(!covered_by_ignore("10.0.0.1".parse().unwrap(), &opts.ignore_networks));
    }

    #[test]
    fn link_local_v6_is_ignored_by_default() {
        let opts = AddressOptions::default();
        assert!(covered_by_ignore("fe80::1".parse().unwrap(), &opts.ignore_networks));
    }
}
