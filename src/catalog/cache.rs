//! On-disk catalog snapshot with a freshness window.
//!
//! The snapshot is a plain text file: the entry count on the first line,
//! then one `id` line and one display name line per entry, in catalog
//! order. Recency keys are not stored because the order already reflects
//! them. The file's modification time is the only clock; nothing inside the
//! file records when it was written.
//!
//! Any stale or unreadable snapshot is deleted on lookup so the next run
//! starts clean.

use crate::Result;
use crate::catalog::{Catalog, CatalogEntry};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(300);

/// Result of checking the snapshot file
#[derive(Debug)]
pub enum CacheLookup {
    Fresh(Catalog),
    Missing,
    Expired { age: Duration },
    Corrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// Snapshot deleted; `age` is unknown if its mtime could not be read
    Removed { age: Option<Duration> },
    NotPresent,
}

pub struct CatalogCache {
    path: PathBuf,
    freshness_window: Duration,
}

impl CatalogCache {
    pub fn new(path: impl Into<PathBuf>, freshness_window: Duration) -> Self {
        Self {
            path: path.into(),
            freshness_window,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Cached catalog if the snapshot is present, fresh and well-formed.
    pub fn load(&self) -> Option<Catalog> {
        match self.lookup() {
            CacheLookup::Fresh(catalog) => Some(catalog),
            _ => None,
        }
    }

    pub fn lookup(&self) -> CacheLookup {
        self.lookup_at(SystemTime::now())
    }

    /// Same as [`lookup`](Self::lookup) with an explicit current time.
    pub fn lookup_at(&self, now: SystemTime) -> CacheLookup {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No catalog cache at {:?}", self.path);
                return CacheLookup::Missing;
            }
            Err(e) => {
                warn!("Cannot stat catalog cache {:?}: {}", self.path, e);
                self.discard();
                return CacheLookup::Corrupt;
            }
        };

        let mtime = match metadata.modified() {
            Ok(t) => t,
            Err(e) => {
                warn!("Cannot read catalog cache mtime: {}", e);
                self.discard();
                return CacheLookup::Corrupt;
            }
        };

        // An mtime in the future counts as brand new.
        let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
        if age > self.freshness_window {
            info!("Catalog cache expired ({}s old), rebuilding", age.as_secs());
            self.discard();
            return CacheLookup::Expired { age };
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return CacheLookup::Missing,
            Err(e) => {
                info!("Catalog cache unreadable ({}), rebuilding", e);
                self.discard();
                return CacheLookup::Corrupt;
            }
        };

        match parse_snapshot(&content) {
            Some(entries) => {
                debug!("Catalog cache hit: {} entries, {}s old", entries.len(), age.as_secs());
                CacheLookup::Fresh(Catalog {
                    entries,
                    built_at: mtime,
                    root: None,
                })
            }
            None => {
                info!("Catalog cache corrupt, rebuilding");
                self.discard();
                CacheLookup::Corrupt
            }
        }
    }

    /// Replace the snapshot. Written to a sibling temp file and renamed over
    /// the target so readers never see a partial file.
    pub fn store(&self, catalog: &Catalog) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(render_snapshot(&catalog.entries).as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Stored {} entries in catalog cache {:?}", catalog.len(), self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<ClearOutcome> {
        let age = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(|t| SystemTime::now().duration_since(t).unwrap_or(Duration::ZERO));

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(ClearOutcome::Removed { age }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ClearOutcome::NotPresent),
            Err(e) => Err(e.into()),
        }
    }

    fn discard(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove catalog cache {:?}: {}", self.path, e),
        }
    }
}

fn render_snapshot(entries: &[CatalogEntry]) -> String {
    let mut out = format!("{}\n", entries.len());
    for entry in entries {
        out.push_str(&entry.id);
        out.push('\n');
        out.push_str(&entry.display_name);
        out.push('\n');
    }
    out
}

fn parse_snapshot(content: &str) -> Option<Vec<CatalogEntry>> {
    let mut lines = content.lines();
    let count: usize = lines.next()?.trim().parse().ok()?;

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    for _ in 0..count {
        let id = lines.next()?;
        let name = lines.next()?;
        if id.is_empty() || !seen.insert(id) {
            return None;
        }
        entries.push(CatalogEntry::new(id, Some(name.to_string()), 0));
    }
    Some(entries)
}
