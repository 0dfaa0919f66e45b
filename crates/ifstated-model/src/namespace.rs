//! Namespace identity and the `LinkRef` node identifier used by the
//! dependency graph (spec §3 "Namespace (NS)" and "LinkRef").

use std::cmp::Ordering;
use std::fmt;

/// A network namespace name. `None` is the caller's initial (root) namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NamespaceName(pub Option<String>);

impl NamespaceName {
    pub const ROOT: NamespaceName = NamespaceName(None);

    pub fn root() -> Self {
        Self(None)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "<root>"),
        }
    }
}

/// Node identifier for the dependency graph: `(ifname, ns_name)`.
///
/// Total order: root namespace first; within a namespace `lo` sorts first,
/// then lexicographic by ifname (spec §3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LinkRef {
    pub ifname: String,
    pub ns: NamespaceName,
}

impl LinkRef {
    pub fn new(ifname: impl Into<String>, ns: NamespaceName) -> Self {
        Self { ifname: ifname.into(), ns }
    }

    fn name_rank(&self) -> u8 {
        if self.ifname == "lo" {
            0
        } else {
            1
        }
    }
}

impl PartialOrd for LinkRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LinkRef {
    fn cmp(&self, other: &Self) -> Ordering {
        // root namespace first
        match (self.ns.is_root(), other.ns.is_root()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        self.ns
            .as_str()
            .cmp(other.ns.as_str())
            .then_with(|| self.name_rank().cmp(&other.name_rank()))
            .then_with(|| self.ifname.cmp(&other.ifname))
    }
}

impl fmt::Display for LinkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ns.is_root() {
            write!(f, "{}", self.ifname)
        } else {
            write!(f, "{}@{}", self.ifname, self.ns)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_namespace_sorts_first() {
        let mut refs = vec![
            LinkRef::new("eth0", NamespaceName::named("app")),
            LinkRef::new("eth0", NamespaceName::root()),
        ];
        refs.sort();
        assert_eq!(refs[0].ns, NamespaceName::root());
    }

    #[test]
    fn lo_sorts_first_within_namespace() {
        let mut refs = vec![
            LinkRef::new("eth0", NamespaceName::root()),
            LinkRef::new("lo", NamespaceName::root()),
            LinkRef::new("br0", NamespaceName::root()),
        ];
        refs.sort();
        assert_eq!(refs[0].ifname, "lo");
        assert_eq!(refs[1].ifname, "br0");
        assert_eq!(refs[2].ifname, "eth0");
    }

    #[test]
    fn namespaces_sort_lexicographically_after_root() {
        let mut refs = vec![
            LinkRef::new("x", NamespaceName::named("zeta")),
            LinkRef::new("x", NamespaceName::named("alpha")),
            LinkRef::new("x", NamespaceName::root()),
        ];
        refs.sort();
        assert_eq!(refs[0].ns, NamespaceName::root());
        assert_eq!(refs[1].ns, NamespaceName::named("alpha"));
        assert_eq!(refs[2].ns, NamespaceName::named("zeta"));
    }
}
