//! Per-kind link capability table (spec §7 REDESIGN FLAGS: a tagged
//! `LinkKind` variant replacing dynamic `<Kind>Link` class dispatch).
//!
//! Each variant carries what the reconciler needs to decide whether a link
//! can be created at all, whether ethtool knobs apply to it, and how to
//! build its `IFLA_LINKINFO` payload. The generic case covers kinds this
//! table doesn't special-case (spec: "the generic case covers any kind the
//! variant list doesn't special-case").

use ifstated_model::link::LinkSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Physical,
    Veth,
    Bridge,
    Vlan,
    Bond,
    Tun,
    Dsa,
    Generic,
}

impl LinkKind {
    pub fn classify(kind: &str) -> Self {
        match kind {
            "physical" => LinkKind::Physical,
            "veth" => LinkKind::Veth,
            "bridge" => LinkKind::Bridge,
            "vlan" => LinkKind::Vlan,
            "bond" => LinkKind::Bond,
            "tun" => LinkKind::Tun,
            "dsa" => LinkKind::Dsa,
            _ => LinkKind::Generic,
        }
    }

    /// Physical NICs and DSA ports are never created, only adopted (spec
    /// §3 "physical" identity keys, §4.3 registry).
    pub fn can_create(self) -> bool {
        !matches!(self, LinkKind::Physical | LinkKind::Dsa)
    }

    /// DSA switch ports don't support the generic ethtool ioctls their
    /// parent switch chip doesn't expose per-port (SPEC_FULL supplement).
    pub fn can_ethtool(self) -> bool {
        !matches!(self, LinkKind::Dsa)
    }

    /// `IFLA_INFO_KIND` string this variant creates under, or `None` when
    /// the kind string itself (from `LinkSettings::kind`) should be used
    /// verbatim (the generic/enrichment path).
    pub fn info_kind(self, settings: &LinkSettings) -> String {
        match self {
            LinkKind::Veth => "veth".to_string(),
            LinkKind::Bridge => "bridge".to_string(),
            LinkKind::Vlan => "vlan".to_string(),
            LinkKind::Bond => "bond".to_string(),
            LinkKind::Tun => "tun".to_string(),
            _ => settings.kind.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_and_dsa_cannot_be_created() {
        assert!(!LinkKind::Physical.can_create());
        assert!(!LinkKind::Dsa.can_create());
        assert!(LinkKind::Veth.can_create());
    }

    #[test]
    fn dsa_has_no_ethtool_support() {
        assert!(!LinkKind::Dsa.can_ethtool());
        assert!(LinkKind::Physical.can_ethtool());
    }

    #[test]
    fn unknown_kind_classifies_as_generic() {
        assert_eq!(LinkKind::classify("vxlan"), LinkKind::Generic);
    }
}
