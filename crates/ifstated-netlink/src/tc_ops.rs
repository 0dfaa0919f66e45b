//! Qdisc/filter enumerate/add/change/del (spec §4.4 "Traffic control").
//!
//! Encoding every qdisc kind's `TCA_OPTIONS` nest over raw netlink is a
//! large surface for the option set this reconciles against; this mirrors
//! the teacher's own pragmatic choice in `qdisc.rs` (`tc` via
//! `tokio::process::Command`, scoped with `ip netns exec` when not in the
//! root namespace) rather than hand-rolling the TC attribute encoding.

use ifstated_model::tc::{format_handle, FilterAction, QdiscModel};
use ifstated_model::NamespaceName;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TcError {
    #[error("tc command failed: {0}")]
    Command(String),

    #[error("tc invocation could not start: {0}")]
    Spawn(std::io::Error),
}

fn tc_command(ns: &NamespaceName) -> Command {
    match &ns.0 {
        Some(name) => {
            let mut cmd = Command::new("ip");
            cmd.arg("netns").arg("exec").arg(name).arg("tc");
            cmd
        }
        None => Command::new("tc"),
    }
}

async fn run(mut cmd: Command) -> Result<(), TcError> {
    let output = cmd.output().await.map_err(TcError::Spawn)?;
    if !output.status.success() {
        return Err(TcError::Command(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(())
}

/// Install or replace a qdisc (spec §4.4: "recreates if kind or handle
/// differs and otherwise issues a soft change").
pub async fn qdisc_replace(ns: &NamespaceName, ifname: &str, parent: u32, qdisc: &QdiscModel) -> Result<(), TcError> {
    let mut cmd = tc_command(ns);
    cmd.arg("qdisc").arg("replace").arg("dev").arg(ifname);
    cmd.arg("parent").arg(format_handle(parent));
    cmd.arg("handle").arg(format!("{:x}:", qdisc.handle >> 16));
    cmd.arg(&qdisc.kind);
    for (k, v) in &qdisc.options {
        cmd.arg(k).arg(v);
    }
    debug!(ifname, kind = %qdisc.kind, "replacing qdisc");
    run(cmd).await
}

/// Delete a qdisc by handle. `ENOENT` on the native default qdisc is not an
/// error (spec §4.4: "removing the native default qdisc may fail with
/// ENOENT and that is not an error"); any other failure is best-effort
/// logged.
pub async fn qdisc_del(ns: &NamespaceName, ifname: &str, parent: u32) -> Result<(), TcError> {
    let mut cmd = tc_command(ns);
    cmd.arg("qdisc").arg("del").arg("dev").arg(ifname).arg("parent").arg(format_handle(parent));
    match run(cmd).await {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().to_lowercase().contains("no such file") => Ok(()),
        Err(e) => {
            warn!(ifname, error = %e, "qdisc delete failed");
            Ok(())
        }
    }
}

/// Install an ingress qdisc, a separate slot toggled by the `ingress`
/// boolean (spec §4.4).
pub async fn ingress_add(ns: &NamespaceName, ifname: &str) -> Result<(), TcError> {
    let mut cmd = tc_command(ns);
    cmd.arg("qdisc").arg("add").arg("dev").arg(ifname).arg("ingress");
    run(cmd).await
}

pub async fn ingress_del(ns: &NamespaceName, ifname: &str) -> Result<(), TcError> {
    let mut cmd = tc_command(ns);
    cmd.arg("qdisc").arg("del").arg("dev").arg(ifname).arg("ingress");
    match run(cmd).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(ifname, error = %e, "ingress delete failed");
            Ok(())
        }
    }
}

fn action_args(action: &FilterAction) -> Vec<String> {
    match action {
        FilterAction::Drop => vec!["action".into(), "drop".into()],
        FilterAction::Pass => vec!["action".into(), "pass".into()],
        FilterAction::Mirred { dev, egress, mirror, .. } => {
            let mut args = vec!["action".into(), "mirred".into()];
            args.push(if *egress { "egress".into() } else { "ingress".into() });
            args.push(if *mirror { "mirror".into() } else { "redirect".into() });
            args.push("dev".into());
            args.push(dev.clone());
            args
        }
        FilterAction::Other { kind, options } => {
            let mut args = vec!["action".into(), kind.clone()];
            for (k, v) in options {
                args.push(k.clone());
                args.push(v.clone());
            }
            args
        }
    }
}

/// Replace a filter keyed by `(parent, prio)` (spec §4.4). A `mirred`
/// action's `dev` must already have been resolved to a live ifname by the
/// caller; an unresolved reference is the caller's responsibility to skip
/// (spec §4.4 "unresolved references skip the filter with a warning").
pub async fn filter_replace(
    ns: &NamespaceName,
    ifname: &str,
    parent: u32,
    prio: u32,
    protocol: &str,
    matches: &std::collections::BTreeMap<String, String>,
    actions: &[FilterAction],
) -> Result<(), TcError> {
    let mut cmd = tc_command(ns);
    cmd.arg("filter").arg("replace").arg("dev").arg(ifname);
    cmd.arg("parent").arg(format_handle(parent));
    cmd.arg("protocol").arg(protocol);
    cmd.arg("prio").arg(prio.to_string());
    cmd.arg("flower");
    for (k, v) in matches {
        cmd.arg(k).arg(v);
    }
    for action in actions {
        for arg in action_args(action) {
            cmd.arg(arg);
        }
    }
    run(cmd).await
}

/// Delete a filter by `(parent, prio)` (spec §6: "RTM_DELTFILTER by
/// (index, info, parent)").
pub async fn filter_del(ns: &NamespaceName, ifname: &str, parent: u32, prio: u32) -> Result<(), TcError> {
    let mut cmd = tc_command(ns);
    cmd.arg("filter").arg("del").arg("dev").arg(ifname);
    cmd.arg("parent").arg(format_handle(parent));
    cmd.arg("prio").arg(prio.to_string());
    run(cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirred_action_args_carry_direction_and_mode() {
        let action = FilterAction::Mirred { dev: "eth1".into(), dev_netns: None, egress: true, mirror: false };
        let args = action_args(&action);
        assert_eq!(args, vec!["action", "mirred", "egress", "redirect", "dev", "eth1"]);
    }

    #[test]
    fn drop_action_is_minimal() {
        assert_eq!(action_args(&FilterAction::Drop), vec!["action", "drop"]);
    }
}
