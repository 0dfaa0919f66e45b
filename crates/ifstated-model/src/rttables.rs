//! Bidirectional name⇄id maps for routing tables, realms, scopes, protocols,
//! and netdev groups (spec §3 "RT lookup tables", §6 file paths/names).
//!
//! Loading from `/usr/share/iproute2/<name>` etc. is the `ifstated-netlink`
//! crate's job; this module only defines the map shape and the identity-map
//! fallback (spec: "identity maps otherwise").

use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct NameIdMap {
    name_to_id: HashMap<String, u32>,
    id_to_name: HashMap<u32, String>,
}

impl NameIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, name: impl Into<String>) {
        let name = name.into();
        self.id_to_name.insert(id, name.clone());
        self.name_to_id.insert(name, id);
    }

    /// Resolve a name to an id, falling back to parsing it as a raw decimal
    /// id (the "identity map" behavior when no lookup file was found).
    pub fn resolve(&self, name: &str) -> Option<u32> {
        if let Some(id) = self.name_to_id.get(name) {
            return Some(*id);
        }
        name.parse().ok()
    }

    pub fn name_for(&self, id: u32) -> Option<&str> {
        self.id_to_name.get(&id).map(|s| s.as_str())
    }
}

/// One `NameIdMap` per lookup-table kind (spec §6: `rt_tables`, `rt_realms`,
/// `rt_scopes`, `rt_protos`, `group`).
#[derive(Clone, Debug, Default)]
pub struct RtTables {
    pub tables: NameIdMap,
    pub realms: NameIdMap,
    pub scopes: NameIdMap,
    pub protos: NameIdMap,
    pub groups: NameIdMap,
}

/// Parse one `<decimal-id><ws><name>` line (spec §6). Blank lines and `#`
/// comments are skipped.
pub fn parse_line(line: &str) -> Option<(u32, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let id: u32 = parts.next()?.parse().ok()?;
    let name = parts.next()?.trim();
    Some((id, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_map_fallback_parses_raw_decimal() {
        let map = NameIdMap::new();
        assert_eq!(map.resolve("254"), Some(254));
        assert_eq!(map.resolve("notanumber"), None);
    }

    #[test]
    fn named_lookup_wins_over_decimal_parse() {
        let mut map = NameIdMap::new();
        map.insert(254, "main");
        assert_eq!(map.resolve("main"), Some(254));
        assert_eq!(map.name_for(254), Some("main"));
    }

    #[test]
    fn parse_line_skips_comments_and_blanks() {
        assert_eq!(parse_line("# comment"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("254\tmain"), Some((254, "main")));
        assert_eq!(parse_line("0 unspec"), Some((0, "unspec")));
    }
}
