//! Ethtool ioctls: `ETHTOOL_GDRVINFO` (bus-info) and `ETHTOOL_GPERMADDR`
//! (permanent hardware address), per spec §6's struct layout and §4.1.
//!
//! rtnetlink has no ethtool support, so these go over the classic
//! `SIOCETHTOOL` ifreq ioctl on a raw `AF_INET`/`SOCK_DGRAM` socket, the way
//! every low-level Linux netdevice tool does it.

use std::ffi::CString;
use std::io;
use std::mem;
use std::os::unix::io::RawFd;

use thiserror::Error;

const SIOCETHTOOL: libc::c_ulong = 0x8946;
const ETHTOOL_GDRVINFO: u32 = 0x0000_0003;
const ETHTOOL_GPERMADDR: u32 = 0x0000_0020;
const IFNAMSIZ: usize = 16;

#[derive(Error, Debug)]
pub enum EthtoolError {
    #[error("interface name too long: {0}")]
    NameTooLong(String),

    #[error("failed to open control socket: {0}")]
    Socket(io::Error),

    #[error("ioctl({0}) on {1} failed: {2}")]
    Ioctl(&'static str, String, io::Error),
}

/// `struct ethtool_drvinfo` (spec §6). `bus_info` is field index 4.
#[repr(C)]
struct EthtoolDrvinfo {
    cmd: u32,
    driver: [u8; 32],
    version: [u8; 32],
    fw_version: [u8; 32],
    bus_info: [u8; 32],
    reserved1: [u8; 32],
    reserved2: [u8; 12],
    n_priv_flags: u32,
    n_stats: u32,
    testinfo_len: u32,
    eedump_len: u32,
    regdump_len: u32,
}

/// `struct ethtool_perm_addr` with a fixed-size trailing buffer large enough
/// for any link-layer address the kernel reports.
#[repr(C)]
struct EthtoolPermAddr {
    cmd: u32,
    size: u32,
    data: [u8; 32],
}

#[repr(C)]
struct IfreqData {
    ifr_name: [libc::c_char; IFNAMSIZ],
    ifr_data: *mut libc::c_void,
}

fn ifname_bytes(ifname: &str) -> Result<[libc::c_char; IFNAMSIZ], EthtoolError> {
    let c = CString::new(ifname).map_err(|_| EthtoolError::NameTooLong(ifname.to_string()))?;
    let bytes = c.as_bytes_with_nul();
    if bytes.len() > IFNAMSIZ {
        return Err(EthtoolError::NameTooLong(ifname.to_string()));
    }
    let mut out = [0 as libc::c_char; IFNAMSIZ];
    for (i, b) in bytes.iter().enumerate() {
        out[i] = *b as libc::c_char;
    }
    Ok(out)
}

fn control_socket() -> Result<RawFd, EthtoolError> {
    // SAFETY: a plain AF_INET/SOCK_DGRAM socket used only for ioctls, closed
    // by the caller.
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(EthtoolError::Socket(io::Error::last_os_error()));
    }
    Ok(fd)
}

unsafe fn do_ioctl(fd: RawFd, ifname: &str, data_ptr: *mut libc::c_void) -> Result<(), io::Error> {
    let ifr_name = match ifname_bytes(ifname) {
        Ok(n) => n,
        Err(_) => return Err(io::Error::from(io::ErrorKind::InvalidInput)),
    };
    let mut ifreq = IfreqData { ifr_name, ifr_data: data_ptr };
    let ret = libc::ioctl(fd, SIOCETHTOOL, &mut ifreq as *mut IfreqData);
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn close(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// Returns the driver-reported bus-info string (e.g. a PCI slot path), or
/// `None` if the driver didn't report one.
pub fn businfo(ifname: &str) -> Result<Option<String>, EthtoolError> {
    let fd = control_socket()?;
    let mut info: EthtoolDrvinfo = unsafe { mem::zeroed() };
    info.cmd = ETHTOOL_GDRVINFO;
    let result = unsafe { do_ioctl(fd, ifname, &mut info as *mut _ as *mut libc::c_void) };
    close(fd);
    result.map_err(|e| EthtoolError::Ioctl("GDRVINFO", ifname.to_string(), e))?;

    let nul = info.bus_info.iter().position(|b| *b == 0).unwrap_or(info.bus_info.len());
    let s = String::from_utf8_lossy(&info.bus_info[..nul]).to_string();
    Ok(if s.is_empty() { None } else { Some(s) })
}

/// Returns the permanent hardware address, or `None` if the kernel reported
/// an all-zero result (spec §6: "treated as absent").
pub fn permaddr(ifname: &str) -> Result<Option<[u8; 6]>, EthtoolError> {
    let fd = control_socket()?;
    let mut addr: EthtoolPermAddr = unsafe { mem::zeroed() };
    addr.cmd = ETHTOOL_GPERMADDR;
    addr.size = addr.data.len() as u32;
    let result = unsafe { do_ioctl(fd, ifname, &mut addr as *mut _ as *mut libc::c_void) };
    close(fd);
    result.map_err(|e| EthtoolError::Ioctl("GPERMADDR", ifname.to_string(), e))?;

    let mac: [u8; 6] = addr.data[..6].try_into().unwrap();
    Ok(if mac == [0; 6] { None } else { Some(mac) })
}

pub fn format_mac(mac: [u8; 6]) -> String {
    mac.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifname_too_long_is_rejected() {
        assert!(ifname_bytes("this-name-is-way-too-long-for-linux").is_err());
    }

    #[test]
    fn ifname_fits_exactly_is_accepted() {
        assert!(ifname_bytes("eth0").is_ok());
    }

    #[test]
    fn mac_formatting() {
        assert_eq!(format_mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]), "aa:bb:cc:dd:ee:ff");
    }
}
