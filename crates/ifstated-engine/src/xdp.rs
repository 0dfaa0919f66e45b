//! XDP/BPF reconciler (spec §4.4 "XDP / BPF").

#[cfg(feature = "bpf")]
use ifstated_model::xdp::XdpModel;
#[cfg(feature = "bpf")]
use ifstated_netlink::xdp_ops::{apply as xdp_apply, detach as xdp_detach, XdpError};
#[cfg(feature = "bpf")]
use tracing::info;

#[cfg(feature = "bpf")]
pub fn reconcile(ifindex: i32, ifname: &str, model: Option<&XdpModel>, currently_attached: bool, apply: bool) -> Result<(), XdpError> {
    match model {
        Some(model) => {
            info!(ifname, program = %model.program_name, "= xdp");
            if apply {
                xdp_apply(ifindex, model)?;
            }
        }
        None if currently_attached => {
            info!(ifname, "- xdp");
            if apply {
                xdp_detach(ifindex, ifstated_model::xdp::XdpMode::Auto)?;
            }
        }
        None => {}
    }
    Ok(())
}
