//! Ethtool knob-group reconciler (spec §4.4 "Ethtool"). State is cached per
//! `(identity key, subsystem)` under `/run/libifstate/ethtool/` so a rerun
//! can tell whether previously applied knobs still match without relying on
//! an ethtool round-trip read; the cache is rewritten only after a
//! successful invocation (spec §4.4, §6).

use std::path::PathBuf;

use ifstated_model::link::EthtoolModel;
use ifstated_model::namespace::NamespaceName;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

pub const CACHE_DIR: &str = "/run/libifstate/ethtool";

#[derive(Error, Debug)]
pub enum EthtoolReconcileError {
    #[error("ethtool command failed: {0}")]
    Command(String),

    #[error("ethtool invocation could not start: {0}")]
    Spawn(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn cache_path(cache_dir: &std::path::Path, identity_key: &str, subsystem: &str) -> PathBuf {
    cache_dir.join(format!("{identity_key}__{subsystem}.state"))
}

fn serialize(group: &std::collections::BTreeMap<String, String>) -> String {
    group.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("\n")
}

fn serialize_bool(group: &std::collections::BTreeMap<String, bool>) -> String {
    group.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("\n")
}

fn cached_matches(cache_dir: &std::path::Path, identity_key: &str, subsystem: &str, serialized: &str) -> bool {
    std::fs::read_to_string(cache_path(cache_dir, identity_key, subsystem)).map(|s| s == serialized).unwrap_or(false)
}

fn write_cache(cache_dir: &std::path::Path, identity_key: &str, subsystem: &str, serialized: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(cache_dir)?;
    std::fs::write(cache_path(cache_dir, identity_key, subsystem), serialized)
}

fn ethtool_command(ns: &NamespaceName) -> Command {
    match &ns.0 {
        Some(name) => {
            let mut cmd = Command::new("ip");
            cmd.arg("netns").arg("exec").arg(name).arg("ethtool");
            cmd
        }
        None => Command::new("ethtool"),
    }
}

async fn run(mut cmd: Command) -> Result<(), EthtoolReconcileError> {
    let output = cmd.output().await.map_err(EthtoolReconcileError::Spawn)?;
    if !output.status.success() {
        return Err(EthtoolReconcileError::Command(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(())
}

/// `ethtool` CLI flag for each group (spec §4.4: `change`, `coalesce`,
/// `features`, `pause`, `nfc`, `ring`, `rxfh`, `eee`, `wol`).
fn group_flag(subsystem: &str) -> &'static str {
    match subsystem {
        "change" => "-s",
        "coalesce" => "-C",
        "features" => "-K",
        "pause" => "-A",
        "nfc" => "-N",
        "ring" => "-G",
        "rxfh" => "-X",
        "eee" => "--set-eee",
        "wol" => "-s",
        _ => "-s",
    }
}

async fn apply_group(ns: &NamespaceName, ifname: &str, subsystem: &str, args: Vec<String>) -> Result<(), EthtoolReconcileError> {
    let mut cmd = ethtool_command(ns);
    cmd.arg(group_flag(subsystem)).arg(ifname);
    for arg in args {
        cmd.arg(arg);
    }
    run(cmd).await
}

pub async fn reconcile(
    ns: &NamespaceName,
    ifname: &str,
    identity_key: &str,
    model: &EthtoolModel,
    apply: bool,
) -> Result<(), EthtoolReconcileError> {
    reconcile_at(std::path::Path::new(CACHE_DIR), ns, ifname, identity_key, model, apply).await
}

async fn reconcile_at(
    cache_dir: &std::path::Path,
    ns: &NamespaceName,
    ifname: &str,
    identity_key: &str,
    model: &EthtoolModel,
    apply: bool,
) -> Result<(), EthtoolReconcileError> {
    for subsystem in model.groups() {
        let (serialized, args): (String, Vec<String>) = match subsystem {
            "features" => {
                let s = serialize_bool(&model.features);
                let args = model.features.iter().flat_map(|(k, v)| [k.clone(), if *v { "on".into() } else { "off".into() }]).collect();
                (s, args)
            }
            "change" => (serialize(&model.change), model.change.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            "coalesce" => (serialize(&model.coalesce), model.coalesce.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            "pause" => (serialize(&model.pause), model.pause.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            "nfc" => (serialize(&model.nfc), model.nfc.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            "ring" => (serialize(&model.ring), model.ring.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            "rxfh" => (serialize(&model.rxfh), model.rxfh.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            "eee" => (serialize(&model.eee), model.eee.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            "wol" => (serialize(&model.wol), model.wol.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()),
            _ => continue,
        };

        if cached_matches(cache_dir, identity_key, subsystem, &serialized) {
            debug!(ifname, subsystem, "ethtool group unchanged, skipping");
            continue;
        }

        info!(ifname, subsystem, "= ethtool");
        if apply {
            apply_group(ns, ifname, subsystem, args).await?;
            write_cache(cache_dir, identity_key, subsystem, &serialized)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_flags_match_spec_dispatch() {
        assert_eq!(group_flag("features"), "-K");
        assert_eq!(group_flag("coalesce"), "-C");
        assert_eq!(group_flag("ring"), "-G");
    }

    #[test]
    fn cache_roundtrip_detects_unchanged_state() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!cached_matches(dir.path(), "eth0", "features", "rx=true"));
        write_cache(dir.path(), "eth0", "features", "rx=true").unwrap();
        assert!(cached_matches(dir.path(), "eth0", "features", "rx=true"));
        assert!(!cached_matches(dir.path(), "eth0", "features", "rx=false"));
    }

    #[tokio::test]
    async fn reconcile_skips_invocation_when_cache_matches() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = EthtoolModel::default();
        model.features.insert("rx".into(), true);
        let serialized = serialize_bool(&model.features);
        write_cache(dir.path(), "eth0", "features", &serialized).unwrap();

        // apply=true would spawn the real `ethtool` binary if the cache
        // didn't short-circuit; a successful no-op run proves it did.
        reconcile_at(dir.path(), &NamespaceName::root(), "eth0", "eth0", &model, true).await.unwrap();
    }
}
