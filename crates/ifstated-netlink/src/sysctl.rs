//! Sysctl file I/O (spec §4.4 "Sysctl", §6 paths). Reads and writes happen
//! while the target namespace is entered (the caller holds a
//! `NamespaceGuard` for the duration).

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SysctlError {
    #[error("failed to read {0}: {1}")]
    Read(String, std::io::Error),

    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
}

/// Read the current value at `path`, trimmed of trailing whitespace.
pub fn read(path: &str) -> Result<String, SysctlError> {
    fs::read_to_string(path)
        .map(|s| s.trim_end().to_string())
        .map_err(|e| SysctlError::Read(path.to_string(), e))
}

/// Write `value` to `path` if it differs from the current contents. Returns
/// `true` if a write was performed.
pub fn reconcile(path: &str, value: &str, apply: bool) -> Result<bool, SysctlError> {
    if !Path::new(path).exists() {
        // IoTransient (spec §7): log and continue, the rest of the pass
        // still runs.
        warn!(path, "sysctl path does not exist, skipping");
        return Ok(false);
    }
    let current = read(path)?;
    if current == value {
        return Ok(false);
    }
    debug!(path, current, desired = value, "sysctl differs");
    if apply {
        fs::write(path, value).map_err(|e| SysctlError::Write(path.to_string(), e))?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reconcile_writes_only_when_different() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "0").unwrap();
        let path = f.path().to_str().unwrap();

        // value differs -> write happens
        assert!(reconcile(path, "1", true).unwrap());
        assert_eq!(read(path).unwrap(), "1");

        // now identical -> no write
        assert!(!reconcile(path, "1", true).unwrap());
    }

    #[test]
    fn check_mode_reports_diff_without_writing() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "0").unwrap();
        let path = f.path().to_str().unwrap();

        assert!(reconcile(path, "1", false).unwrap());
        assert_eq!(read(path).unwrap(), "0");
    }

    #[test]
    fn missing_path_is_tolerated() {
        assert!(!reconcile("/proc/sys/net/does/not/exist", "1", true).unwrap());
    }
}
