//! Neighbour-table desired state (spec §4.4 "Neighbours"). Only
//! `NUD_PERMANENT` entries are considered.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::fdb::NUD_PERMANENT;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeighbourModel {
    pub ip: IpAddr,
    pub lladdr: String,
    pub state: u16,
}

impl NeighbourModel {
    pub fn new(ip: IpAddr, lladdr: impl Into<String>) -> Self {
        Self { ip, lladdr: lladdr.into(), state: NUD_PERMANENT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_permanent_state() {
        let n = NeighbourModel::new("10.0.0.1".parse().unwrap(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(n.state, NUD_PERMANENT);
    }
}
