//! Symbolic ⇄ numeric attribute normalization (spec §4.2).
//!
//! Each map below is applied at config-load time (`parse`) and reversed by
//! the emitter (`emit`). Unknown symbolic values pass through unchanged as a
//! raw integer is also accepted by `parse`.

macro_rules! symbolic_map {
    ($name:ident, $doc:expr, [$(($sym:expr, $num:expr)),+ $(,)?]) => {
        #[doc = $doc]
        pub struct $name;

        impl $name {
            const PAIRS: &'static [(&'static str, u32)] = &[$(($sym, $num)),+];

            /// Symbolic name -> numeric value. Unknown names are left for the
            /// caller to interpret as a raw integer (spec: "pass through
            /// unchanged").
            pub fn parse(value: &str) -> Option<u32> {
                Self::PAIRS
                    .iter()
                    .find(|(sym, _)| *sym == value)
                    .map(|(_, num)| *num)
            }

            /// Numeric value -> symbolic name, for the emitter's reverse map.
            pub fn emit(value: u32) -> Option<&'static str> {
                Self::PAIRS
                    .iter()
                    .find(|(_, num)| *num == value)
                    .map(|(sym, _)| *sym)
            }
        }
    };
}

symbolic_map!(
    BondMode,
    "bond_mode (spec §4.2)",
    [
        ("balance-rr", 0),
        ("active-backup", 1),
        ("balance-xor", 2),
        ("broadcast", 3),
        ("802.3ad", 4),
        ("balance-tlb", 5),
        ("balance-alb", 6),
    ]
);

symbolic_map!(
    BondArpValidate,
    "bond_arp_validate (spec §4.2)",
    [
        ("none", 0),
        ("active", 1),
        ("backup", 2),
        ("all", 3),
        ("filter", 4),
        ("filter_active", 5),
        ("filter_backup", 6),
    ]
);

symbolic_map!(
    BondArpAllTargets,
    "bond_arp_all_targets (spec §4.2)",
    [("any", 0), ("all", 1)]
);

symbolic_map!(
    BondPrimaryReselect,
    "bond_primary_reselect (spec §4.2)",
    [("always", 0), ("better", 1), ("failure", 2)]
);

symbolic_map!(
    BondFailOverMac,
    "bond_fail_over_mac (spec §4.2)",
    [("none", 0), ("active", 1), ("follow", 2)]
);

symbolic_map!(
    BondXmitHashPolicy,
    "bond_xmit_hash_policy (spec §4.2)",
    [
        ("layer2", 0),
        ("layer3+4", 1),
        ("layer2+3", 2),
        ("encap2+3", 3),
        ("encap3+4", 4),
        ("vlan+srcmac", 5),
    ]
);

symbolic_map!(
    BondAdLacpRate,
    "bond_ad_lacp_rate (spec §4.2)",
    [("slow", 0), ("fast", 1)]
);

symbolic_map!(
    BondAdSelect,
    "bond_ad_select (spec §4.2)",
    [("stable", 0), ("bandwidth", 1), ("count", 2)]
);

symbolic_map!(TunType, "tun_type (spec §4.2)", [("tun", 1), ("tap", 2)]);

symbolic_map!(
    VlanProtocol,
    "vlan_protocol (spec §4.2)",
    [("802.1ad", 0x88a8), ("802.1q", 0x8100)]
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_mode_round_trip() {
        for (sym, num) in [
            ("balance-rr", 0u32),
            ("active-backup", 1),
            ("balance-xor", 2),
            ("broadcast", 3),
            ("802.3ad", 4),
            ("balance-tlb", 5),
            ("balance-alb", 6),
        ] {
            assert_eq!(BondMode::parse(sym), Some(num));
            assert_eq!(BondMode::emit(num), Some(sym));
        }
    }

    #[test]
    fn vlan_protocol_round_trip() {
        assert_eq!(VlanProtocol::parse("802.1q"), Some(0x8100));
        assert_eq!(VlanProtocol::emit(0x8100), Some("802.1q"));
        assert_eq!(VlanProtocol::parse("802.1ad"), Some(0x88a8));
        assert_eq!(VlanProtocol::emit(0x88a8), Some("802.1ad"));
    }

    #[test]
    fn tun_type_round_trip() {
        assert_eq!(TunType::parse("tun"), Some(1));
        assert_eq!(TunType::emit(1), Some("tun"));
        assert_eq!(TunType::parse("tap"), Some(2));
        assert_eq!(TunType::emit(2), Some("tap"));
    }

    #[test]
    fn unknown_symbol_is_none_and_left_to_caller() {
        assert_eq!(BondMode::parse("made-up"), None);
    }

    #[test]
    fn every_map_round_trips() {
        for (sym, num) in [("none", 0u32), ("active", 1), ("backup", 2), ("all", 3), ("filter", 4), ("filter_active", 5), ("filter_backup", 6)] {
            assert_eq!(BondArpValidate::parse(sym), Some(num));
            assert_eq!(BondArpValidate::emit(num), Some(sym));
        }
        for (sym, num) in [("any", 0u32), ("all", 1)] {
            assert_eq!(BondArpAllTargets::parse(sym), Some(num));
            assert_eq!(BondArpAllTargets::emit(num), Some(sym));
        }
        for (sym, num) in [("always", 0u32), ("better", 1), ("failure", 2)] {
            assert_eq!(BondPrimaryReselect::parse(sym), Some(num));
            assert_eq!(BondPrimaryReselect::emit(num), Some(sym));
        }
        for (sym, num) in [("none", 0u32), ("active", 1), ("follow", 2)] {
            assert_eq!(BondFailOverMac::parse(sym), Some(num));
            assert_eq!(BondFailOverMac::emit(num), Some(sym));
        }
        for (sym, num) in [
            ("layer2", 0u32),
            ("layer3+4", 1),
            ("layer2+3", 2),
            ("encap2+3", 3),
            ("encap3+4", 4),
            ("vlan+srcmac", 5),
        ] {
            assert_eq!(BondXmitHashPolicy::parse(sym), Some(num));
            assert_eq!(BondXmitHashPolicy::emit(num), Some(sym));
        }
        for (sym, num) in [("slow", 0u32), ("fast", 1)] {
            assert_eq!(BondAdLacpRate::parse(sym), Some(num));
            assert_eq!(BondAdLacpRate::emit(num), Some(sym));
        }
        for (sym, num) in [("stable", 0u32), ("bandwidth", 1), ("count", 2)] {
            assert_eq!(BondAdSelect::parse(sym), Some(num));
            assert_eq!(BondAdSelect::emit(num), Some(sym));
        }
    }
}
