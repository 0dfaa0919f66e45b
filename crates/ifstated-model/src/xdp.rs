//! XDP/BPF desired state (spec §4.4 "XDP / BPF").

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XdpMode {
    Xdp,        // driver native
    XdpGeneric, // skb
    XdpOffload, // hardware
    Auto,       // all three OR-ed
}

impl XdpMode {
    /// `auto` combines all three flags (spec §4.4).
    pub fn flag_bits(self) -> u32 {
        const DRV: u32 = 1 << 0;
        const SKB: u32 = 1 << 1;
        const HW: u32 = 1 << 2;
        match self {
            XdpMode::Xdp => DRV,
            XdpMode::XdpGeneric => SKB,
            XdpMode::XdpOffload => HW,
            XdpMode::Auto => DRV | SKB | HW,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct XdpModel {
    pub program_name: String,
    pub object_path: String,
    pub section: String,
    pub mode: XdpMode,
    pub maps: Vec<String>,
}

impl XdpModel {
    pub fn pin_path(&self) -> String {
        format!("/sys/fs/bpf/ifstate/progs/{}", self.program_name)
    }

    pub fn maps_dir(&self) -> String {
        format!("/sys/fs/bpf/ifstate/maps/{}/", self.program_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_ors_all_flags() {
        assert_eq!(
            XdpMode::Auto.flag_bits(),
            XdpMode::Xdp.flag_bits() | XdpMode::XdpGeneric.flag_bits() | XdpMode::XdpOffload.flag_bits()
        );
    }

    #[test]
    fn pin_paths_match_spec_s4_4() {
        let model = XdpModel {
            program_name: "filter".into(),
            object_path: "/opt/bpf/filter.o".into(),
            section: "xdp".into(),
            mode: XdpMode::Auto,
            maps: vec![],
        };
        assert_eq!(model.pin_path(), "/sys/fs/bpf/ifstate/progs/filter");
        assert_eq!(model.maps_dir(), "/sys/fs/bpf/ifstate/maps/filter/");
    }
}
