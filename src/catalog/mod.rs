use serde::{Deserialize, Serialize};
use std::time::SystemTime;

pub mod builder;
pub mod cache;

pub use builder::CatalogBuilder;
pub use cache::{CacheLookup, CatalogCache, ClearOutcome};

/// Per-world metadata file holding the display name
pub const METADATA_FILE: &str = "levelname.txt";

/// One world discovered on the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Directory name on the device, stable across renames in-game
    pub id: String,
    /// Name shown to the user, falls back to `id`
    pub display_name: String,
    /// Last-access time (Unix seconds), 0 when unknown
    pub recency_key: i64,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, display_name: Option<String>, recency_key: i64) -> Self {
        let id = id.into();
        let display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.clone());
        Self { id, display_name, recency_key }
    }
}

/// Ordered snapshot of the worlds found by one device query
#[derive(Debug, Clone)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub built_at: SystemTime,
    /// Root the entries were listed from. Not persisted in the cache.
    pub root: Option<String>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Exact id match first, then a case-insensitive display name match.
    pub fn find(&self, selector: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.id == selector)
            .or_else(|| {
                let wanted = selector.to_lowercase();
                self.entries.iter().find(|e| e.display_name.to_lowercase() == wanted)
            })
    }
}

/// Most recent first. Stable, so equal keys keep discovery order.
pub fn sort_by_recency(entries: &mut [CatalogEntry]) {
    entries.sort_by(|a, b| b.recency_key.cmp(&a.recency_key));
}
