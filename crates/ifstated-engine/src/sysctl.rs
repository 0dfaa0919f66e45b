//! Sysctl reconciler (spec §4.4 "Sysctl", §6 paths). Pseudo-interfaces
//! (`all`, `default`) are reconciled once per namespace ahead of per-link
//! settings.

use ifstated_model::collection::IndexedCollection;
use ifstated_model::sysctl::{GlobalSysctlKey, PerLinkSysctlKey, SysctlModel};
use ifstated_netlink::sysctl::{reconcile as reconcile_path, SysctlError};
use tracing::info;

pub fn reconcile_global(desired: &IndexedCollection<GlobalSysctlKey, SysctlModel>, apply: bool) -> Result<(), SysctlError> {
    for (key, model) in desired.iter() {
        let path = key.path();
        if reconcile_path(&path, &model.value, apply)? {
            info!(path, value = %model.value, "sysctl changed");
        }
    }
    Ok(())
}

pub fn reconcile_per_link(
    ifname: &str,
    desired: &IndexedCollection<PerLinkSysctlKey, SysctlModel>,
    apply: bool,
) -> Result<(), SysctlError> {
    for (key, model) in desired.iter() {
        let path = key.path(ifname);
        if reconcile_path(&path, &model.value, apply)? {
            info!(ifname, path, value = %model.value, "sysctl changed");
        }
    }
    Ok(())
}
