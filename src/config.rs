use crate::Result;
use crate::BackupError;
use crate::archive::BackupLayout;
use crate::catalog::cache::DEFAULT_FRESHNESS_WINDOW;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Where Minecraft keeps worlds, in lookup order.
pub const DEFAULT_WORLD_ROOTS: &[&str] = &[
    "/sdcard/Android/data/com.mojang.minecraftpe/files/games/com.mojang/minecraftWorlds",
    "/sdcard/games/com.mojang/minecraftWorlds",
    "/storage/emulated/0/games/com.mojang/minecraftWorlds",
];

const CACHE_FILE_NAME: &str = "worlds.cache";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// adb executable to use
    #[arg(long, global = true, default_value = "adb")]
    pub adb: PathBuf,

    /// Serial of the device to talk to (see `adb devices`)
    #[arg(short = 's', long, global = true)]
    pub serial: Option<String>,

    /// Catalog cache file
    #[arg(long, global = true)]
    pub cache_file: Option<PathBuf>,

    /// Seconds a cached world list stays valid
    #[arg(long, global = true, default_value_t = DEFAULT_FRESHNESS_WINDOW.as_secs())]
    pub cache_ttl: u64,

    /// World directory on the device; repeat to give fallbacks in order
    #[arg(long = "root", global = true, value_name = "PATH")]
    pub roots: Vec<String>,

    /// Suppress non-error messages
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Hide spinners and progress bars
    #[arg(long, global = true, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List worlds on the device, most recently played first
    List {
        /// Ignore the cached list and query the device
        #[arg(long, default_value_t = false)]
        refresh: bool,

        /// Print the list as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Copy worlds from the device
    Backup {
        /// World ids or names to back up
        #[arg(value_name = "WORLD", required_unless_present = "all")]
        selectors: Vec<String>,

        /// Back up every world (always re-scans the device)
        #[arg(long, conflicts_with = "selectors", default_value_t = false)]
        all: bool,

        /// Output layout
        #[arg(long, value_enum, default_value_t = BackupLayout::Folder)]
        layout: BackupLayout,

        /// Destination directory
        #[arg(short, long, default_value = "backups")]
        dest: PathBuf,

        /// Exclude patterns for exported archives (glob, relative to the world)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Delete the cached world list
    ClearCache,
}

/// Settings for discovering and caching the world catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub cache_path: PathBuf,
    /// Snapshots older than this are rebuilt
    pub freshness_window: Duration,
    /// Fallback list of world directories, tried in order
    pub candidate_roots: Vec<String>,
}

impl CatalogConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let candidate_roots = if args.roots.is_empty() {
            DEFAULT_WORLD_ROOTS.iter().map(|r| r.to_string()).collect()
        } else {
            args.roots.clone()
        };

        let config = Self {
            cache_path: args.cache_file.clone().unwrap_or_else(default_cache_path),
            freshness_window: Duration::from_secs(args.cache_ttl),
            candidate_roots,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.candidate_roots.is_empty() {
            return Err(BackupError::Config("At least one world root is required".into()));
        }
        if let Some(bad) = self.candidate_roots.iter().find(|r| !r.starts_with('/')) {
            return Err(BackupError::Config(format!("World root must be an absolute device path: {}", bad)));
        }
        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            candidate_roots: DEFAULT_WORLD_ROOTS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

pub fn default_cache_path() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(env!("CARGO_PKG_NAME"))
        .join(CACHE_FILE_NAME)
}
