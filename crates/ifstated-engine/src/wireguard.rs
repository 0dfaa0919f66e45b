//! WireGuard reconciler (spec §4.4 "WireGuard").
//!
//! The kernel's `wireguard` genetlink family has no typed get-device
//! counterpart in this workspace (see `ifstated_netlink::wireguard_ops`), so
//! this always issues `WG_CMD_SET_DEVICE`; the kernel treats a repeated set
//! with identical fields as a no-op, so this stays idempotent in practice.

use ifstated_model::wireguard::WireguardModel;
use ifstated_netlink::wireguard_ops::{wireguard_set, WireguardError};
use tracing::info;

pub async fn reconcile(ifindex: u32, ifname: &str, model: &WireguardModel, apply: bool) -> Result<(), WireguardError> {
    info!(ifname, peers = model.peers.len(), "= wireguard");
    if apply {
        wireguard_set(ifindex, ifname, model).await?;
    }
    Ok(())
}
