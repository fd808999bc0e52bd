use crate::Result;
use std::path::Path;

pub mod adb;

pub use adb::AdbBridge;

/// Device-access bridge. Remote paths are POSIX paths on the device.
pub trait Bridge {
    /// Fails with `BridgeUnavailable` when no device can be reached.
    fn check(&self) -> Result<()>;
    /// Names of the immediate subdirectories of `path`.
    fn list_directories(&self, path: &str) -> Result<Vec<String>>;
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    /// Last-access time of `path`, in seconds since the Unix epoch.
    fn stat_access_time(&self, path: &str) -> Result<i64>;
    /// Copy the remote directory `remote` to the local path `local`.
    fn pull_dir(&self, remote: &str, local: &Path) -> Result<()>;
}

/// Join remote path segments with `/`, whatever the local platform.
pub fn remote_join(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_join() {
        assert_eq!(remote_join("/sdcard/worlds", "abc"), "/sdcard/worlds/abc");
        assert_eq!(remote_join("/sdcard/worlds/", "abc"), "/sdcard/worlds/abc");
    }
}
