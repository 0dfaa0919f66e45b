//! Traffic-control reconciler (spec §4.4 "Traffic control"): walks the
//! configured qdisc tree depth-first, replacing each node and recursing into
//! its children at the computed child-parent handle, then reconciles the
//! ingress slot and filter list.

use ifstated_model::namespace::NamespaceName;
use ifstated_model::tc::{child_parent_handle, FilterModel, TcModel, ROOT_HANDLE};
use ifstated_netlink::tc_ops::{self, TcError};
use tracing::info;

fn walk_qdisc(
    ns: &NamespaceName,
    ifname: &str,
    parent: u32,
    qdisc: &ifstated_model::tc::QdiscModel,
    apply: bool,
) -> futures::future::BoxFuture<'static, Result<(), TcError>> {
    let ns = ns.clone();
    let ifname = ifname.to_string();
    let qdisc = qdisc.clone();
    Box::pin(async move {
        info!(ifname, parent = parent, kind = %qdisc.kind, "= qdisc");
        if apply {
            tc_ops::qdisc_replace(&ns, &ifname, parent, &qdisc).await?;
        }
        for (i, child) in qdisc.children.iter().enumerate() {
            let child_parent = child_parent_handle(qdisc.handle, i);
            walk_qdisc(&ns, &ifname, child_parent, child, apply).await?;
        }
        Ok(())
    })
}

pub async fn reconcile(ns: &NamespaceName, ifname: &str, desired: &TcModel, apply: bool) -> Result<(), TcError> {
    if let Some(root) = &desired.root {
        walk_qdisc(ns, ifname, ROOT_HANDLE, root, apply).await?;
    } else if apply {
        tc_ops::qdisc_del(ns, ifname, ROOT_HANDLE).await?;
    }

    if desired.ingress {
        info!(ifname, "= ingress");
        if apply {
            tc_ops::ingress_add(ns, ifname).await?;
        }
    } else if apply {
        tc_ops::ingress_del(ns, ifname).await?;
    }

    reconcile_filters(ns, ifname, &desired.filters, apply).await
}

async fn reconcile_filters(ns: &NamespaceName, ifname: &str, filters: &[FilterModel], apply: bool) -> Result<(), TcError> {
    let mut by_parent: std::collections::BTreeMap<u32, Vec<&FilterModel>> = std::collections::BTreeMap::new();
    for filter in filters {
        by_parent.entry(filter.parent).or_default().push(filter);
    }
    for (parent, group) in by_parent {
        let n = group.len();
        for (i, filter) in group.into_iter().enumerate() {
            let prio = filter.prio.unwrap_or_else(|| FilterModel::default_prio(n, i));
            info!(ifname, parent = parent, prio, "= filter");
            if apply {
                tc_ops::filter_replace(ns, ifname, parent, prio, &filter.protocol, &filter.matches, &filter.actions).await?;
            }
        }
    }
    Ok(())
}
