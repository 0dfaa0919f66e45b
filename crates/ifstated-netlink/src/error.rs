//! Top-level error type for the netlink collaborator, composed from each
//! subsystem's error via `#[from]`, following the teacher's
//! `netns-testbench::TestbenchError` pattern.

use thiserror::Error;

use crate::{ethtool::EthtoolError, netns::NetNsError, sysctl::SysctlError};

#[derive(Error, Debug)]
pub enum NetlinkError {
    #[error("netlink connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("netlink request failed: {0}")]
    Rtnetlink(#[from] rtnetlink::Error),

    #[error("generic netlink request failed: {0}")]
    Genetlink(String),

    #[error("namespace error: {0}")]
    NetNs(#[from] NetNsError),

    #[error("ethtool ioctl failed: {0}")]
    Ethtool(#[from] EthtoolError),

    #[error("sysctl I/O failed: {0}")]
    Sysctl(#[from] SysctlError),

    #[error("link '{0}' not found")]
    LinkNotFound(String),

    #[error("BPF operation failed: {0}")]
    Bpf(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Whether a kernel errno is in the built-in recoverable set the
/// `ExceptionCollector` tolerates (spec §7 "NetlinkError (recoverable)"),
/// before considering any configured `netlinkerror` additions.
pub fn is_builtin_recoverable_errno(errno: i32) -> bool {
    matches!(errno, libc::EEXIST | libc::ENOENT | libc::EADDRNOTAVAIL | libc::EADDRINUSE)
}

/// Extract the kernel errno a rejected netlink request carried, when there
/// is one (spec §4.8 EEXIST retry), following the same
/// `rtnetlink::Error::NetlinkError` match arm `nsid.rs` already uses.
pub fn netlink_errno(err: &NetlinkError) -> Option<i32> {
    match err {
        NetlinkError::Rtnetlink(rtnetlink::Error::NetlinkError(msg)) => msg.code.map(|c| c.get().abs()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eexist_is_recoverable() {
        assert!(is_builtin_recoverable_errno(libc::EEXIST));
    }

    #[test]
    fn arbitrary_errno_is_not_recoverable_by_default() {
        assert!(!is_builtin_recoverable_errno(libc::EPERM));
    }
}
