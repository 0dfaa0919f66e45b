//! Engine-level error type, composed from collaborator errors via
//! `#[from]` (teacher's `TestbenchError` pattern).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("netlink collaborator error: {0}")]
    Netlink(#[from] ifstated_netlink::NetlinkError),

    #[error("dependency graph has a cycle and strict mode requires none: {0:?}")]
    LinkCircularLinked(Vec<ifstated_model::namespace::LinkRef>),

    #[error("hook error: {0}")]
    Hook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// The kernel errno a wrapped netlink rejection carried, if any (spec
    /// §4.8 EEXIST retry).
    pub fn errno(&self) -> Option<i32> {
        match self {
            EngineError::Netlink(inner) => ifstated_netlink::netlink_errno(inner),
            _ => None,
        }
    }
}
