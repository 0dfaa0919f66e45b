//! Interface default profiles matched by regex on ifname/kind (spec §4.7).

use std::collections::BTreeMap;

use regex::Regex;

#[derive(Clone, Debug, Default)]
pub struct ProfileFields {
    pub link: BTreeMap<String, String>,
    pub ethtool: BTreeMap<String, String>,
    pub clear_addresses: bool,
    pub clear_fdb: bool,
    pub clear_neighbours: bool,
    pub clear_tc: bool,
}

#[derive(Clone, Debug)]
pub struct Predicate {
    /// `(option, regex)` pairs; every one must match the queried attribute
    /// (spec §4.7).
    pub matchers: Vec<(String, Regex)>,
}

impl Predicate {
    fn matches(&self, attrs: &BTreeMap<String, String>) -> bool {
        self.matchers.iter().all(|(option, re)| attrs.get(option).is_some_and(|v| re.is_match(v)))
    }
}

#[derive(Clone, Debug)]
pub struct Profile {
    pub predicates: Vec<Predicate>,
    pub fields: ProfileFields,
}

impl Profile {
    fn matches(&self, attrs: &BTreeMap<String, String>) -> bool {
        self.predicates.iter().any(|p| p.matches(attrs))
    }
}

/// Built-in orphan-drop profile (spec §4.7): ifname `""` matches anything,
/// drops to `state=down`, clears master, and clears every collection.
/// Applied to orphans, never to configured links.
pub fn builtin_orphan_profile() -> Profile {
    Profile {
        predicates: vec![Predicate {
            matchers: vec![("ifname".to_string(), Regex::new("").expect("empty regex always compiles"))],
        }],
        fields: ProfileFields {
            link: BTreeMap::from([("state".to_string(), "down".to_string()), ("master".to_string(), String::new())]),
            ethtool: BTreeMap::new(),
            clear_addresses: true,
            clear_fdb: true,
            clear_neighbours: true,
            clear_tc: true,
        },
    }
}

#[derive(Clone, Debug, Default)]
pub struct Defaults {
    profiles: Vec<Profile>,
}

impl Defaults {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }

    /// `get_defaults(ifname, kind)` (spec §4.7): first profile whose any
    /// predicate matches wins.
    pub fn get_defaults(&self, ifname: &str, kind: &str) -> Option<&ProfileFields> {
        let mut attrs = BTreeMap::new();
        attrs.insert("ifname".to_string(), ifname.to_string());
        attrs.insert("kind".to_string(), kind.to_string());
        self.profiles.iter().find(|p| p.matches(&attrs)).map(|p| &p.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_profile_wins() {
        let profiles = vec![
            Profile {
                predicates: vec![Predicate { matchers: vec![("kind".into(), Regex::new("^bond").unwrap())] }],
                fields: ProfileFields { link: BTreeMap::from([("mtu".into(), "9000".into())]), ..Default::default() },
            },
            Profile {
                predicates: vec![Predicate { matchers: vec![("ifname".into(), Regex::new(".*").unwrap())] }],
                fields: ProfileFields { link: BTreeMap::from([("mtu".into(), "1500".into())]), ..Default::default() },
            },
        ];
        let defaults = Defaults::new(profiles);
        let matched = defaults.get_defaults("bond0", "bond").unwrap();
        assert_eq!(matched.link.get("mtu"), Some(&"9000".to_string()));
        let fallback = defaults.get_defaults("eth0", "physical").unwrap();
        assert_eq!(fallback.link.get("mtu"), Some(&"1500".to_string()));
    }

    #[test]
    fn builtin_orphan_profile_clears_everything() {
        let fields = builtin_orphan_profile().fields;
        assert!(fields.clear_addresses && fields.clear_fdb && fields.clear_neighbours && fields.clear_tc);
        assert_eq!(fields.link.get("state"), Some(&"down".to_string()));
    }
}
