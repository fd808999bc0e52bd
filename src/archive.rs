use crate::Result;
use crate::BackupError;
use crate::catalog::CatalogEntry;
use crate::transport::{remote_join, Bridge};
use chrono::Local;
use clap::ValueEnum;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extension used for exported worlds
pub const EXPORT_EXTENSION: &str = "mcworld";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackupLayout {
    /// Plain directory copy
    Folder,
    /// Portable .mcworld archive
    Export,
}

/// Packs a local directory into a single file.
pub trait Packager {
    fn package(&self, source_dir: &Path, dest_file: &Path) -> Result<()>;
}

pub struct ZipPackager {
    excludes: GlobSet,
}

impl ZipPackager {
    pub fn new(excludes: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in excludes {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self { excludes: builder.build()? })
    }
}

impl Packager for ZipPackager {
    fn package(&self, source_dir: &Path, dest_file: &Path) -> Result<()> {
        let parent = match dest_file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        {
            let mut zip = ZipWriter::new(tmp.as_file_mut());
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            let mut walker = WalkDir::new(source_dir).min_depth(1).sort_by_file_name().into_iter();
            while let Some(entry) = walker.next() {
                let entry = entry?;
                let rel = match entry.path().strip_prefix(source_dir) {
                    Ok(rp) => rp.to_string_lossy().replace('\\', "/"),
                    Err(_) => continue,
                };

                if self.excludes.is_match(&rel) {
                    debug!("Excluding {}", rel);
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }

                if entry.file_type().is_dir() {
                    zip.add_directory(format!("{}/", rel), options)?;
                } else if entry.file_type().is_file() {
                    zip.start_file(rel, options)?;
                    let mut f = File::open(entry.path())?;
                    io::copy(&mut f, &mut zip)?;
                }
            }
            zip.finish()?;
        }
        tmp.flush()?;
        tmp.persist(dest_file).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Copies one world off the device in the configured layout.
pub struct WorldArchiver<'a> {
    bridge: &'a dyn Bridge,
    packager: &'a dyn Packager,
    dest: PathBuf,
    layout: BackupLayout,
}

impl<'a> WorldArchiver<'a> {
    pub fn new(bridge: &'a dyn Bridge, packager: &'a dyn Packager, dest: PathBuf, layout: BackupLayout) -> Self {
        Self { bridge, packager, dest, layout }
    }

    /// Returns the path of the created folder or archive.
    pub fn backup(&self, root: &str, entry: &CatalogEntry) -> Result<PathBuf> {
        fs::create_dir_all(&self.dest)?;

        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let base = backup_stem(entry, &stamp);
        let target = match self.layout {
            BackupLayout::Folder => self.dest.join(&base),
            BackupLayout::Export => self.dest.join(format!("{}.{}", base, EXPORT_EXTENSION)),
        };
        if target.exists() {
            return Err(BackupError::DestinationExists(target));
        }

        // Staging lives under dest so the final rename stays on one filesystem.
        let staging = tempfile::Builder::new().prefix(".mcbackup-").tempdir_in(&self.dest)?;
        let pulled = staging.path().join(&entry.id);
        let remote = remote_join(root, &entry.id);
        debug!("Pulling {} into {:?}", remote, pulled);
        self.bridge.pull_dir(&remote, &pulled)?;

        if !pulled.is_dir() {
            return Err(BackupError::Archive(format!("Pull of {} produced no directory", remote)));
        }

        match self.layout {
            BackupLayout::Folder => fs::rename(&pulled, &target)?,
            BackupLayout::Export => self.packager.package(&pulled, &target)?,
        }
        Ok(target)
    }
}

/// File-system safe name for a backup, based on the display name.
pub fn sanitize_name(entry: &CatalogEntry) -> String {
    let name = sanitize_component(&entry.display_name);
    if !name.is_empty() {
        return name;
    }
    let id = sanitize_component(&entry.id);
    if id.is_empty() {
        "world".to_string()
    } else {
        id
    }
}

/// `<name>_<id>_<stamp>`. The id keeps worlds that share a display name apart;
/// it is left out when the name already is the id.
pub fn backup_stem(entry: &CatalogEntry, stamp: &str) -> String {
    let name = sanitize_name(entry);
    let id = sanitize_component(&entry.id);
    if id.is_empty() || id == name {
        format!("{}_{}", name, stamp)
    } else {
        format!("{}_{}_{}", name, id, stamp)
    }
}

fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        let e = |name: &str| CatalogEntry::new("Xy0AAA==", Some(name.to_string()), 0);
        assert_eq!(sanitize_name(&e("My World")), "My World");
        assert_eq!(sanitize_name(&e("a/b:c*d")), "a_b_c_d");
        assert_eq!(sanitize_name(&e("..")), "Xy0AAA__");
        assert_eq!(sanitize_name(&e(" .hidden. ")), "hidden");
        assert_eq!(sanitize_name(&e("Überwelt")), "Überwelt");
    }

    #[test]
    fn test_backup_stem_includes_id() {
        let stamp = "2026-10-19_15-54-14";
        let named = CatalogEntry::new("Xy0AAA==", Some("My World".into()), 0);
        assert_eq!(backup_stem(&named, stamp), "My World_Xy0AAA___2026-10-19_15-54-14");

        let other = CatalogEntry::new("bbb", Some("My World".into()), 0);
        assert_ne!(backup_stem(&named, stamp), backup_stem(&other, stamp));

        let unnamed = CatalogEntry::new("def", None, 0);
        assert_eq!(backup_stem(&unnamed, stamp), "def_2026-10-19_15-54-14");
    }

    #[test]
    fn test_zip_packager_layout_and_excludes() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("levelname.txt"), "Survival\n").unwrap();
        fs::create_dir(src.path().join("db")).unwrap();
        fs::write(src.path().join("db").join("000005.ldb"), b"data").unwrap();
        fs::write(src.path().join("db").join("LOCK"), b"").unwrap();
        fs::create_dir(src.path().join("logs")).unwrap();
        fs::write(src.path().join("logs").join("latest.log"), b"noise").unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join("world.mcworld");
        let packager = ZipPackager::new(&["logs".to_string(), "**/LOCK".to_string()]).unwrap();
        packager.package(src.path(), &dest).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["db/", "db/000005.ldb", "levelname.txt"]);

        let mut content = String::new();
        archive.by_name("levelname.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "Survival\n");
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let err = ZipPackager::new(&["[unclosed".to_string()]);
        assert!(matches!(err, Err(BackupError::Pattern(_))));
    }
}
