//! Netlink/ioctl/sysctl collaborator (spec §4.1, §6): a typed interface
//! over rtnetlink link/addr/route/rule/neighbour/qdisc/filter families, the
//! bridge protinfo, the nsid family, genetlink WireGuard, and the ethtool
//! and sysctl ioctl/file surfaces the core engine drives.

pub mod addr_ops;
pub mod brport_ops;
pub mod context;
pub mod error;
pub mod ethtool;
pub mod fdb_ops;
pub mod link_ops;
pub mod neigh_ops;
pub mod netns;
pub mod nsid;
pub mod route_ops;
pub mod rttables_loader;
pub mod rule_ops;
pub mod sysctl;
pub mod tc_ops;
pub mod wireguard_ops;

#[cfg(feature = "bpf")]
pub mod xdp_ops;

pub use context::NamespaceContext;
pub use error::{netlink_errno, NetlinkError};
