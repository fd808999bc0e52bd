use crate::Result;
use crate::BackupError;
use crate::catalog::{sort_by_recency, Catalog, CatalogEntry, METADATA_FILE};
use crate::transport::{remote_join, Bridge};
use std::collections::HashSet;
use std::time::SystemTime;
use tracing::debug;

/// Builds a catalog by walking the candidate roots on the device.
pub struct CatalogBuilder<'a> {
    bridge: &'a dyn Bridge,
    roots: &'a [String],
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(bridge: &'a dyn Bridge, roots: &'a [String]) -> Self {
        Self { bridge, roots }
    }

    pub fn build(&self) -> Result<Catalog> {
        let (root, ids) = self.discover()?;
        debug!("Found {} world directories under {}", ids.len(), root);

        let mut entries: Vec<CatalogEntry> = ids
            .into_iter()
            .map(|id| self.resolve_entry(root, id))
            .collect();
        sort_by_recency(&mut entries);

        Ok(Catalog {
            entries,
            built_at: SystemTime::now(),
            root: Some(root.clone()),
        })
    }

    /// First candidate root whose listing contains `id`.
    pub fn locate_root(&self, id: &str) -> Option<&'a str> {
        let roots: &'a [String] = self.roots;
        roots
            .iter()
            .find(|root| {
                self.bridge
                    .list_directories(root)
                    .map(|names| names.iter().any(|n| n == id))
                    .unwrap_or(false)
            })
            .map(String::as_str)
    }

    fn discover(&self) -> Result<(&'a String, Vec<String>)> {
        let roots: &'a [String] = self.roots;
        for root in roots {
            let names = match self.bridge.list_directories(root) {
                Ok(names) => names,
                Err(e) => {
                    debug!("Listing {} failed: {}", root, e);
                    continue;
                }
            };

            let mut seen = HashSet::new();
            let ids: Vec<String> = names
                .into_iter()
                .filter(|n| !n.is_empty() && !n.contains('\n'))
                .filter(|n| seen.insert(n.clone()))
                .collect();

            if ids.is_empty() {
                debug!("No world directories under {}", root);
                continue;
            }
            return Ok((root, ids));
        }
        Err(BackupError::NoWorldsFound)
    }

    fn resolve_entry(&self, root: &str, id: String) -> CatalogEntry {
        let world_path = remote_join(root, &id);

        let display_name = match self.bridge.read_file(&remote_join(&world_path, METADATA_FILE)) {
            Ok(bytes) => first_non_empty_line(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                debug!("No {} for {}: {}", METADATA_FILE, id, e);
                None
            }
        };

        let recency_key = match self.bridge.stat_access_time(&world_path) {
            Ok(t) => t,
            Err(e) => {
                debug!("No access time for {}: {}", id, e);
                0
            }
        };

        CatalogEntry::new(id, display_name, recency_key)
    }
}

fn first_non_empty_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty_line() {
        assert_eq!(first_non_empty_line("  My World  \n"), Some("My World".into()));
        assert_eq!(first_non_empty_line("\n\r\n  \nSecond\nThird"), Some("Second".into()));
        assert_eq!(first_non_empty_line(" \n\t\n"), None);
        assert_eq!(first_non_empty_line(""), None);
    }
}
