//! Namespace entry/exit scoping (spec §4.1, §5).
//!
//! Non-netlink operations (sysctl reads/writes, the ethtool binary, hook
//! wrappers) must run inside the target namespace; this module provides a
//! scoped guard that enters on construction and restores the caller's
//! namespace on every exit path, mirroring the teacher's `NamespaceGuard`
//! in `netns-testbench::netns`.

use std::fs::OpenOptions;
use std::os::unix::io::AsFd;
use std::path::PathBuf;

use nix::sched::{setns, CloneFlags};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum NetNsError {
    #[error("failed to open namespace file {0}: {1}")]
    Open(PathBuf, std::io::Error),

    #[error("failed to enter namespace: {0}")]
    SetNs(nix::Error),

    #[error("namespace '{0}' not found under /var/run/netns")]
    NotFound(String),
}

/// Resolve the `/var/run/netns/<name>` path for a named namespace.
pub fn netns_path(name: &str) -> PathBuf {
    PathBuf::from("/var/run/netns").join(name)
}

/// RAII guard: on drop, restores the namespace that was active before this
/// guard entered its target (spec §5: "guaranteed restoration on all exit
/// paths").
pub struct NamespaceGuard {
    original_ns: std::fs::File,
    entered: String,
}

impl NamespaceGuard {
    /// Enter `name` (or stay in the current namespace if `name` is `None`,
    /// i.e. the root namespace).
    pub fn enter(name: Option<&str>) -> Result<Self, NetNsError> {
        let original_ns = OpenOptions::new()
            .read(true)
            .open("/proc/self/ns/net")
            .map_err(|e| NetNsError::Open(PathBuf::from("/proc/self/ns/net"), e))?;

        if let Some(name) = name {
            let path = netns_path(name);
            if !path.exists() {
                return Err(NetNsError::NotFound(name.to_string()));
            }
            let file = OpenOptions::new()
                .read(true)
                .open(&path)
                .map_err(|e| NetNsError::Open(path, e))?;
            setns(file.as_fd(), CloneFlags::CLONE_NEWNET).map_err(NetNsError::SetNs)?;
            debug!(netns = name, "entered namespace");
        }

        Ok(Self {
            original_ns,
            entered: name.unwrap_or("<root>").to_string(),
        })
    }
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        if let Err(e) = setns(self.original_ns.as_fd(), CloneFlags::CLONE_NEWNET) {
            warn!(from = %self.entered, error = %e, "failed to restore original namespace");
        } else {
            debug!(from = %self.entered, "restored original namespace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netns_path_matches_spec_convention() {
        assert_eq!(netns_path("app"), PathBuf::from("/var/run/netns/app"));
    }
}
