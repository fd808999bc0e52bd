#![allow(dead_code)]

use mcbackup::catalog::METADATA_FILE;
use mcbackup::transport::{remote_join, Bridge};
use mcbackup::{BackupError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

pub const ROOT: &str = "/sdcard/games/com.mojang/minecraftWorlds";

/// In-memory device. Worlds are registered per root and materialized on pull.
pub struct MockBridge {
    available: Mutex<bool>,
    dirs: Mutex<HashMap<String, Vec<String>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    atimes: Mutex<HashMap<String, i64>>,
    failing_pulls: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(true),
            dirs: Mutex::new(HashMap::new()),
            files: Mutex::new(HashMap::new()),
            atimes: Mutex::new(HashMap::new()),
            failing_pulls: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap() = available;
    }

    /// Register an (initially empty) directory listing.
    pub fn add_root(&self, root: &str) {
        self.dirs.lock().unwrap().entry(root.to_string()).or_default();
    }

    pub fn add_world(&self, root: &str, id: &str, levelname: Option<&str>, atime: Option<i64>) {
        self.dirs.lock().unwrap().entry(root.to_string()).or_default().push(id.to_string());
        let world = remote_join(root, id);
        if let Some(name) = levelname {
            self.add_file(&remote_join(&world, METADATA_FILE), name.as_bytes());
        }
        if let Some(t) = atime {
            self.atimes.lock().unwrap().insert(world, t);
        }
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.files.lock().unwrap().insert(path.to_string(), content.to_vec());
    }

    pub fn fail_pull(&self, remote: &str) {
        self.failing_pulls.lock().unwrap().insert(remote.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if *self.available.lock().unwrap() {
            Ok(())
        } else {
            Err(BackupError::BridgeUnavailable("no devices/emulators found".into()))
        }
    }
}

impl Bridge for MockBridge {
    fn check(&self) -> Result<()> {
        self.record("check".into())
    }

    fn list_directories(&self, path: &str) -> Result<Vec<String>> {
        self.record(format!("list:{}", path))?;
        self.dirs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BackupError::RemoteCommand(format!("find: {}: No such file or directory", path)))
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.record(format!("read:{}", path))?;
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BackupError::RemoteCommand(format!("cat: {}: No such file or directory", path)))
    }

    fn stat_access_time(&self, path: &str) -> Result<i64> {
        self.record(format!("stat:{}", path))?;
        self.atimes
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .ok_or_else(|| BackupError::RemoteCommand(format!("stat: {}: No such file or directory", path)))
    }

    fn pull_dir(&self, remote: &str, local: &Path) -> Result<()> {
        self.record(format!("pull:{}", remote))?;
        if self.failing_pulls.lock().unwrap().contains(remote) {
            return Err(BackupError::RemoteCommand(format!("adb: error: failed to stat remote object '{}'", remote)));
        }

        std::fs::create_dir_all(local)?;
        let prefix = format!("{}/", remote);
        let files = self.files.lock().unwrap();
        for (path, content) in files.iter() {
            if let Some(rel) = path.strip_prefix(&prefix) {
                let dest = local.join(rel);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(dest, content)?;
            }
        }
        Ok(())
    }
}
