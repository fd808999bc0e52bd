use crate::Result;
use crate::BackupError;
use crate::archive::{BackupLayout, WorldArchiver, ZipPackager};
use crate::catalog::{Catalog, CatalogBuilder, CatalogCache, CatalogEntry, ClearOutcome};
use crate::config::CatalogConfig;
use crate::transport::Bridge;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub layout: BackupLayout,
    pub dest: PathBuf,
    /// Glob patterns left out of exported archives
    pub excludes: Vec<String>,
}

#[derive(Debug, Default)]
pub struct BackupReport {
    pub completed: Vec<(CatalogEntry, PathBuf)>,
    pub failed: Vec<(CatalogEntry, String)>,
    /// Selectors that matched no world
    pub unmatched: Vec<String>,
}

impl BackupReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Nothing was attempted.
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }

    /// False when any world failed, or when every selector missed.
    pub fn succeeded(&self) -> bool {
        !self.has_failures() && !(self.is_empty() && !self.unmatched.is_empty())
    }
}

pub struct BackupEngine<'a> {
    bridge: &'a dyn Bridge,
    config: CatalogConfig,
    cache: CatalogCache,
    show_progress: bool,
}

impl<'a> BackupEngine<'a> {
    pub fn new(bridge: &'a dyn Bridge, config: CatalogConfig) -> Self {
        let cache = CatalogCache::new(config.cache_path.clone(), config.freshness_window);
        Self {
            bridge,
            config,
            cache,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// World list, from the cache when it is fresh unless `refresh` is set.
    pub fn catalog(&self, refresh: bool) -> Result<Catalog> {
        if !refresh {
            if let Some(catalog) = self.cache.load() {
                info!("Using cached world list ({} worlds).", catalog.len());
                return Ok(catalog);
            }
        }
        self.rebuild()
    }

    fn rebuild(&self) -> Result<Catalog> {
        self.bridge.check()?;

        let builder = CatalogBuilder::new(self.bridge, &self.config.candidate_roots);
        let catalog = self.with_spinner("Scanning device for worlds...", || builder.build())?;
        info!("Found {} worlds.", catalog.len());

        if let Err(e) = self.cache.store(&catalog) {
            warn!("Failed to write catalog cache {:?}: {}", self.cache.path(), e);
        }
        Ok(catalog)
    }

    /// Back up the worlds matching `selectors` (ids or display names).
    pub fn backup(&self, selectors: &[String], options: &BackupOptions) -> Result<BackupReport> {
        let catalog = self.catalog(false)?;
        let mut report = BackupReport::default();

        let mut selected: Vec<CatalogEntry> = Vec::new();
        for selector in selectors {
            match catalog.find(selector) {
                Some(entry) => {
                    if !selected.iter().any(|e| e.id == entry.id) {
                        selected.push(entry.clone());
                    }
                }
                None => {
                    warn!("No world matches '{}'", selector);
                    report.unmatched.push(selector.clone());
                }
            }
        }

        self.run_backups(&catalog, &selected, options, report)
    }

    /// Back up every world. Always re-scans the device.
    pub fn backup_all(&self, options: &BackupOptions) -> Result<BackupReport> {
        let catalog = match self.catalog(true) {
            Ok(c) => c,
            Err(BackupError::NoWorldsFound) => {
                info!("Nothing to back up.");
                return Ok(BackupReport::default());
            }
            Err(e) => return Err(e),
        };
        self.run_backups(&catalog, &catalog.entries, options, BackupReport::default())
    }

    pub fn clear_cache(&self) -> Result<ClearOutcome> {
        self.cache.clear()
    }

    fn run_backups(
        &self,
        catalog: &Catalog,
        entries: &[CatalogEntry],
        options: &BackupOptions,
        mut report: BackupReport,
    ) -> Result<BackupReport> {
        if entries.is_empty() {
            info!("Nothing to back up.");
            return Ok(report);
        }
        self.bridge.check()?;

        let packager = ZipPackager::new(&options.excludes)?;
        let archiver = WorldArchiver::new(self.bridge, &packager, options.dest.clone(), options.layout);
        let builder = CatalogBuilder::new(self.bridge, &self.config.candidate_roots);

        let pb = if self.show_progress {
            let pb = ProgressBar::new(entries.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        for entry in entries {
            pb.set_message(format!("Backing up {}", entry.display_name));

            let root = match &catalog.root {
                Some(root) => Some(root.as_str()),
                None => builder.locate_root(&entry.id),
            };
            let result = match root {
                Some(root) => archiver.backup(root, entry),
                None => Err(BackupError::WorldNotFound(entry.id.clone())),
            };

            match result {
                Ok(path) => {
                    debug!("{} -> {:?}", entry.id, path);
                    pb.suspend(|| info!("Backed up '{}' to {:?}", entry.display_name, path));
                    report.completed.push((entry.clone(), path));
                }
                Err(e) => {
                    pb.suspend(|| warn!("Skipping '{}': {}", entry.display_name, e));
                    report.failed.push((entry.clone(), e.to_string()));
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(report)
    }

    fn with_spinner<T>(&self, message: &str, f: impl FnOnce() -> T) -> T {
        if !self.show_progress {
            return f();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        let result = f();
        spinner.finish_and_clear();
        result
    }
}
