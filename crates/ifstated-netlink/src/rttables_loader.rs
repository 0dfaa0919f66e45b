//! Loads the RT lookup table files (spec §6): searches
//! `/usr/share/iproute2/<name>`, `/usr/lib/iproute2/<name>`,
//! `/etc/iproute2/<name>`, then `/etc/iproute2/<name>.d/*.conf`. Missing
//! files are not an error (spec §6).

use std::path::{Path, PathBuf};

use ifstated_model::rttables::{parse_line, NameIdMap, RtTables};

const SEARCH_ROOTS: &[&str] = &["/usr/share/iproute2", "/usr/lib/iproute2", "/etc/iproute2"];

fn candidate_paths(name: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = SEARCH_ROOTS.iter().map(|root| Path::new(root).join(name)).collect();
    let drop_in = Path::new("/etc/iproute2").join(format!("{name}.d"));
    if let Ok(entries) = std::fs::read_dir(&drop_in) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("conf") {
                paths.push(path);
            }
        }
    }
    paths
}

fn load_one(name: &str) -> NameIdMap {
    let mut map = NameIdMap::new();
    for path in candidate_paths(name) {
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in contents.lines() {
            if let Some((id, name)) = parse_line(line) {
                map.insert(id, name);
            }
        }
    }
    map
}

pub fn load() -> RtTables {
    RtTables {
        tables: load_one("rt_tables"),
        realms: load_one("rt_realms"),
        scopes: load_one("rt_scopes"),
        protos: load_one("rt_protos"),
        groups: load_one("group"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_paths_cover_the_three_roots() {
        let paths = candidate_paths("rt_tables");
        assert!(paths.iter().any(|p| p == Path::new("/usr/share/iproute2/rt_tables")));
        assert!(paths.iter().any(|p| p == Path::new("/usr/lib/iproute2/rt_tables")));
        assert!(paths.iter().any(|p| p == Path::new("/etc/iproute2/rt_tables")));
    }

    #[test]
    fn missing_files_yield_empty_identity_map() {
        let map = load_one("definitely_not_a_real_lookup_table_name");
        assert_eq!(map.resolve("254"), Some(254));
    }
}
