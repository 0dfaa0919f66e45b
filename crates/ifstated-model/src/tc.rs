//! Traffic-control model: qdisc tree, ingress slot, and filters (spec §4.4
//! "Traffic control").

use serde::{Deserialize, Serialize};

/// Root qdisc handle (spec §4.4).
pub const ROOT_HANDLE: u32 = 0xFFFF_FFFF;
/// Ingress qdisc handle.
pub const INGRESS_HANDLE: u32 = 0xFFFF_0000;
/// Ingress qdisc parent.
pub const INGRESS_PARENT: u32 = 0xFFFF_FFF1;

/// Parse a `major:minor` handle. Both halves are hexadecimal; an empty minor
/// means zero; the literal `root` is `ROOT_HANDLE` (spec §4.4).
pub fn parse_handle(s: &str) -> Option<u32> {
    if s.eq_ignore_ascii_case("root") {
        return Some(ROOT_HANDLE);
    }
    let (major, minor) = s.split_once(':')?;
    let major = u32::from_str_radix(major, 16).ok()?;
    let minor = if minor.is_empty() {
        0
    } else {
        u32::from_str_radix(minor, 16).ok()?
    };
    Some((major << 16) | (minor & 0xFFFF))
}

pub fn format_handle(handle: u32) -> String {
    if handle == ROOT_HANDLE {
        return "root".to_string();
    }
    format!("{:x}:{:x}", handle >> 16, handle & 0xFFFF)
}

/// Compute the parent handle for child at `slot` (0-based position) under
/// `parent` (spec §4.4: "parents computed as parent | (slot+1)").
pub fn child_parent_handle(parent: u32, slot: usize) -> u32 {
    let minor = (slot as u32 + 1) & 0xFFFF;
    (parent & 0xFFFF_0000) | minor
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QdiscModel {
    pub kind: String,
    pub handle: u32,
    pub options: std::collections::BTreeMap<String, String>,
    pub children: Vec<QdiscModel>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TcModel {
    pub root: Option<QdiscModel>,
    pub ingress: bool,
    pub filters: Vec<FilterModel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterModel {
    pub parent: u32,
    /// Explicit `prio`; if absent the default `0xc001 - n + i` applies (spec
    /// §4.4), computed by the reconciler from the filter's position `i`
    /// among `n` filters sharing the same parent.
    pub prio: Option<u32>,
    pub protocol: String,
    pub matches: std::collections::BTreeMap<String, String>,
    pub actions: Vec<FilterAction>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FilterAction {
    Mirred { dev: String, dev_netns: Option<crate::namespace::NamespaceName>, egress: bool, mirror: bool },
    Drop,
    Pass,
    Other { kind: String, options: std::collections::BTreeMap<String, String> },
}

impl FilterModel {
    /// Default prio when unset: `0xc001 - n + i` (spec §4.4).
    pub fn default_prio(n: usize, i: usize) -> u32 {
        0xc001u32.wrapping_sub(n as u32).wrapping_add(i as u32)
    }

    /// Filters are keyed by `(parent, prio)` (spec §4.4).
    pub fn key(&self, resolved_prio: u32) -> (u32, u32) {
        (self.parent, resolved_prio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_parsing() {
        assert_eq!(parse_handle("root"), Some(ROOT_HANDLE));
        assert_eq!(parse_handle("1:"), Some(0x0001_0000));
        assert_eq!(parse_handle("1:10"), Some(0x0001_0010));
        assert_eq!(parse_handle("ffff:0"), Some(0xFFFF_0000));
        assert_eq!(parse_handle("ffff:fff1"), Some(INGRESS_PARENT));
    }

    #[test]
    fn handle_format_round_trip() {
        for s in ["1:0", "a:b", "ffff:0"] {
            let handle = parse_handle(s).unwrap();
            assert_eq!(parse_handle(&format_handle(handle)), Some(handle));
        }
        assert_eq!(format_handle(ROOT_HANDLE), "root");
    }

    #[test]
    fn child_parent_handles_are_sequential_slots() {
        let parent = parse_handle("1:0").unwrap();
        assert_eq!(child_parent_handle(parent, 0), parse_handle("1:1").unwrap());
        assert_eq!(child_parent_handle(parent, 1), parse_handle("1:2").unwrap());
    }

    #[test]
    fn default_filter_prio() {
        assert_eq!(FilterModel::default_prio(1, 0), 0xc001);
        assert_eq!(FilterModel::default_prio(2, 0), 0xc000);
        assert_eq!(FilterModel::default_prio(2, 1), 0xc001);
    }
}
