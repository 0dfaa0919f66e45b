//! `NamespaceContext`: per-namespace handle bundle (spec §4.1 "C1
//! NamespaceContext"). One is constructed per tracked namespace and holds
//! the rtnetlink socket, lazily-populated ethtool caches, and the namespace
//! name used to scope non-netlink operations.

use std::cell::RefCell;
use std::collections::HashMap;

use ifstated_model::NamespaceName;
use rtnetlink::Handle;
use tracing::debug;

use crate::error::NetlinkError;
use crate::netns::NamespaceGuard;

pub struct NamespaceContext {
    pub ns: NamespaceName,
    pub(crate) handle: Handle,
    pub(crate) permaddr_cache: RefCell<HashMap<String, Option<String>>>,
    pub(crate) businfo_cache: RefCell<HashMap<String, Option<String>>>,
}

impl NamespaceContext {
    /// Open an rtnetlink connection for `ns`. The connection future is
    /// spawned once to service the socket (teacher's pattern in
    /// `veth.rs::PairManager::new`); every actual operation is awaited in
    /// strict program order by the engine (spec §5).
    pub async fn new(ns: NamespaceName) -> Result<Self, NetlinkError> {
        let _guard = match &ns.0 {
            Some(name) => Some(NamespaceGuard::enter(Some(name))?),
            None => None,
        };
        let (connection, handle, _) = rtnetlink::new_connection()?;
        tokio::spawn(connection);
        debug!(netns = %ns, "opened netlink connection");
        Ok(Self {
            ns,
            handle,
            permaddr_cache: RefCell::new(HashMap::new()),
            businfo_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Scoped-acquisition helper for operations that must run inside this
    /// namespace but aren't netlink (sysctl, ethtool binary, hook wrappers).
    /// Restoration is guaranteed by `NamespaceGuard`'s `Drop` impl even if
    /// `f` returns an error (spec §4.1, §5).
    pub fn with_namespace_entered<T>(&self, f: impl FnOnce() -> T) -> Result<T, NetlinkError> {
        let _guard = NamespaceGuard::enter(self.ns.0.as_deref())?;
        Ok(f())
    }

    pub fn businfo_cached(&self, ifname: &str) -> Option<Option<String>> {
        self.businfo_cache.borrow().get(ifname).cloned()
    }

    pub fn permaddr_cached(&self, ifname: &str) -> Option<Option<String>> {
        self.permaddr_cache.borrow().get(ifname).cloned()
    }

    /// `businfo`/`permaddr` (spec §4.1) via the ethtool ioctls, scoped into
    /// this namespace and cached per ifname.
    pub fn businfo(&self, ifname: &str) -> Result<Option<String>, NetlinkError> {
        if let Some(cached) = self.businfo_cached(ifname) {
            return Ok(cached);
        }
        let value = self.with_namespace_entered(|| crate::ethtool::businfo(ifname))??;
        self.businfo_cache.borrow_mut().insert(ifname.to_string(), value.clone());
        Ok(value)
    }

    pub fn permaddr(&self, ifname: &str) -> Result<Option<String>, NetlinkError> {
        if let Some(cached) = self.permaddr_cached(ifname) {
            return Ok(cached);
        }
        let value = self
            .with_namespace_entered(|| crate::ethtool::permaddr(ifname))??
            .map(crate::ethtool::format_mac);
        self.permaddr_cache.borrow_mut().insert(ifname.to_string(), value.clone());
        Ok(value)
    }
}
