//! Bridge-port knob reconciler (spec §4.4 "brport"). `backup_port` is
//! resolved by the caller to an ifindex and applied through the dependency
//! graph, not here.

use ifstated_model::link::BrportModel;
use ifstated_netlink::context::NamespaceContext;
use ifstated_netlink::NetlinkError;
use tracing::info;

pub async fn reconcile(ctx: &NamespaceContext, index: u32, ifname: &str, model: &BrportModel, apply: bool) -> Result<(), NetlinkError> {
    info!(ifname, "= brport");
    if apply {
        ctx.brport_set(index, model).await?;
    }
    Ok(())
}
