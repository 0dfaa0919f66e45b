//! XDP/BPF program load, pin, and attach (spec §4.4 "XDP / BPF"), via
//! `libbpf-rs`.

use std::path::Path;

use ifstated_model::xdp::{XdpMode, XdpModel};
use libbpf_rs::{ObjectBuilder, XdpFlags};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum XdpError {
    #[error("failed to open BPF object {0}: {1}")]
    Open(String, libbpf_rs::Error),

    #[error("failed to load BPF object: {0}")]
    Load(libbpf_rs::Error),

    #[error("program section '{0}' not found in object")]
    ProgramNotFound(String),

    #[error("pin failed: {0}")]
    Pin(libbpf_rs::Error),

    #[error("attach failed: {0}")]
    Attach(libbpf_rs::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn xdp_flags(mode: XdpMode) -> XdpFlags {
    let mut flags = XdpFlags::empty();
    let bits = mode.flag_bits();
    if bits & 0b001 != 0 {
        flags |= XdpFlags::DRV_MODE;
    }
    if bits & 0b010 != 0 {
        flags |= XdpFlags::SKB_MODE;
    }
    if bits & 0b100 != 0 {
        flags |= XdpFlags::HW_MODE;
    }
    flags
}

/// Currently-pinned program's `bpf_prog_info.tag`, if a program is pinned
/// at `pin_path` (spec §4.4: "compare its tag with the tag of the
/// currently pinned program").
fn pinned_tag(pin_path: &str) -> Option<Vec<u8>> {
    let prog = libbpf_rs::Program::from_pin(pin_path).ok()?;
    prog.info().ok().map(|info| info.tag.to_vec())
}

/// Load, pin, and attach `model` to `ifindex` (spec §4.4 XDP/BPF flow):
/// open, load, find section, compare tag, unpin+pin+recreate maps dir only
/// if different, attach trying `detach then attach` once on failure.
pub fn apply(ifindex: i32, model: &XdpModel) -> Result<(), XdpError> {
    let mut builder = ObjectBuilder::default();
    let open_object = builder
        .open_file(&model.object_path)
        .map_err(|e| XdpError::Open(model.object_path.clone(), e))?;
    let object = open_object.load().map_err(XdpError::Load)?;
    let prog = object
        .prog(&model.section)
        .ok_or_else(|| XdpError::ProgramNotFound(model.section.clone()))?;

    let new_tag = prog.info().map_err(XdpError::Load)?.tag.to_vec();
    let pin_path = model.pin_path();
    let needs_reload = pinned_tag(&pin_path).as_deref() != Some(new_tag.as_slice());

    if needs_reload {
        if Path::new(&pin_path).exists() {
            let _ = std::fs::remove_file(&pin_path);
        }
        if let Some(parent) = Path::new(&pin_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        prog.pin(&pin_path).map_err(XdpError::Pin)?;

        let maps_dir = model.maps_dir();
        let _ = std::fs::remove_dir_all(&maps_dir);
        std::fs::create_dir_all(&maps_dir)?;
        for map_name in &model.maps {
            if let Some(map) = object.map(map_name) {
                let map_pin = format!("{maps_dir}{map_name}");
                map.pin(&map_pin).map_err(XdpError::Pin)?;
            }
        }
    }

    let flags = xdp_flags(model.mode);
    match prog.attach_xdp(ifindex) {
        Ok(_) => {
            info!(ifindex, program = %model.program_name, "attached xdp program");
            Ok(())
        }
        Err(first_err) => {
            warn!(ifindex, error = %first_err, "xdp attach failed, retrying after detach");
            let _ = libbpf_rs::Program::detach_xdp(ifindex, flags);
            prog.attach_xdp(ifindex).map_err(XdpError::Attach)?;
            Ok(())
        }
    }
}

pub fn detach(ifindex: i32, mode: XdpMode) -> Result<(), XdpError> {
    libbpf_rs::Program::detach_xdp(ifindex, xdp_flags(mode)).map_err(XdpError::Attach)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_sets_all_three_flag_bits() {
        let flags = xdp_flags(XdpMode::Auto);
        assert!(flags.contains(XdpFlags::DRV_MODE));
        assert!(flags.contains(XdpFlags::SKB_MODE));
        assert!(flags.contains(XdpFlags::HW_MODE));
    }

    #[test]
    fn xdp_mode_sets_only_drv_mode() {
        let flags = xdp_flags(XdpMode::Xdp);
        assert!(flags.contains(XdpFlags::DRV_MODE));
        assert!(!flags.contains(XdpFlags::SKB_MODE));
    }
}
