//! The staging area: an on-disk copy of the merged view.
//!
//! [`materialize`] writes a finished [`OverlayPlan`] into the staging directory,
//! one write per winning logical path. [`unpack`] and [`overlay`] are the direct
//! forms that write every source in turn and rely on later writes overwriting
//! earlier ones; they produce the same tree.

use crate::discover::{discover_loose_files, LooseFile};
use crate::error::{Error, Result};
use crate::plan::{AssetOrigin, OverlayPlan};
use camino::{Utf8Path, Utf8PathBuf};
use filetime::FileTime;
use qk_pak::{Pak, PakEntry, PakExtractor};
use std::collections::BTreeMap;
use std::fs;
use std::io;

/// A staging directory owned by one run.
#[derive(Debug)]
pub struct StagingArea {
    root: Utf8PathBuf,
}

impl StagingArea {
    /// Remove anything left at `root` by an earlier run and create it empty.
    pub fn create_fresh(root: impl Into<Utf8PathBuf>) -> Result<Self> {
        let root = root.into();
        remove_dir_if_exists(&root)?;
        fs::create_dir_all(root.as_std_path()).map_err(Error::io_write(&root))?;
        tracing::debug!("Created staging area {}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Where `logical_path` lives inside the staging area.
    pub fn path_for(&self, logical_path: &str) -> Utf8PathBuf {
        self.root.join(logical_path)
    }
}

/// Write every winner of `plan` into the staging area.
///
/// Each archive is mounted once and its winning entries are extracted; loose
/// winners are copied. `on_asset` is called after each write. Returns the
/// number of files written, which equals `plan.len()`.
pub fn materialize<F>(plan: &OverlayPlan, staging: &StagingArea, mut on_asset: F) -> Result<usize>
where
    F: FnMut(&str, &AssetOrigin),
{
    let mut by_archive: BTreeMap<&Utf8Path, Vec<(&str, &PakEntry, &AssetOrigin)>> = BTreeMap::new();
    let mut loose = Vec::new();
    for (logical_path, origin) in plan.iter() {
        match origin {
            AssetOrigin::ArchiveEntry { archive, entry } => by_archive
                .entry(archive.as_path())
                .or_default()
                .push((logical_path, entry, origin)),
            AssetOrigin::LooseFile { path } => loose.push((logical_path, path, origin)),
        }
    }

    let mut written = 0;
    for (archive, entries) in by_archive {
        let mut pak = Pak::open(archive).map_err(|e| Error::archive_read(archive, e))?;
        let mut extractor = PakExtractor::new(&mut pak);
        for (logical_path, entry, origin) in entries {
            extractor
                .extract_entry_to(entry, &staging.path_for(logical_path))
                .map_err(|e| Error::archive_read(archive, e))?;
            written += 1;
            on_asset(logical_path, origin);
        }
    }

    for (logical_path, path, origin) in loose {
        copy_file(path, &staging.path_for(logical_path))?;
        written += 1;
        on_asset(logical_path, origin);
    }

    tracing::debug!("Materialized {} assets into {}", written, staging.root());
    Ok(written)
}

/// Extract every entry of `archive` into `staging_dir`, overwriting silently.
///
/// Returns the number of entries extracted.
pub fn unpack(archive: &Utf8Path, staging_dir: &Utf8Path) -> Result<usize> {
    let mut pak = Pak::open(archive).map_err(|e| Error::archive_read(archive, e))?;
    let written = PakExtractor::new(&mut pak)
        .extract_all(staging_dir)
        .map_err(|e| Error::archive_read(archive, e))?;
    tracing::debug!("Unpacked {} entries from {}", written.len(), archive);
    Ok(written.len())
}

/// Copy every loose file of `source_dir` into `staging_dir` at its logical path.
///
/// Archive-suffixed files are skipped. Returns the number of files copied.
pub fn overlay(source_dir: &Utf8Path, staging_dir: &Utf8Path, archive_extension: &str) -> Result<usize> {
    let files = discover_loose_files(source_dir, archive_extension)?;
    for LooseFile { logical_path, path } in &files {
        copy_file(path, &staging_dir.join(logical_path))?;
    }
    Ok(files.len())
}

/// Copy `from` to `to`, creating parents and keeping the modification time when possible.
fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    let data = fs::read(from.as_std_path()).map_err(Error::io_read(from))?;
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent.as_std_path()).map_err(Error::io_write(parent))?;
    }
    fs::write(to.as_std_path(), &data).map_err(Error::io_write(to))?;

    match fs::metadata(from.as_std_path()) {
        Ok(metadata) => {
            let mtime = FileTime::from_last_modification_time(&metadata);
            if let Err(e) = filetime::set_file_mtime(to.as_std_path(), mtime) {
                tracing::debug!("Could not preserve mtime of {}: {}", to, e);
            }
        }
        Err(e) => tracing::debug!("Could not read mtime of {}: {}", from, e),
    }

    tracing::trace!("Copied {} -> {}", from, to);
    Ok(())
}

/// Remove `dir` and everything below it. A missing directory is not an error.
pub fn remove_dir_if_exists(dir: &Utf8Path) -> Result<()> {
    match fs::remove_dir_all(dir.as_std_path()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io_write(dir)(e)),
    }
}
