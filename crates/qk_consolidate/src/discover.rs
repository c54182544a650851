//! Source discovery: which archives and loose files a gamedir contributes.

use crate::error::{Error, Result};
use crate::utils::{has_archive_extension, normalize_logical_path, utf8_or_warn};
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// A loose file found in the gamedir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseFile {
    /// Normalized path relative to the gamedir.
    pub logical_path: String,
    /// Location of the file on disk.
    pub path: Utf8PathBuf,
}

/// List the archives directly inside `source_dir`, in precedence order.
///
/// Only regular files (or symlinks to them) whose name ends in the archive
/// extension count; the extension is case-sensitive, so `PAK1.PAK` is not an
/// archive under the default `pak`. They are sorted by file name in ascending byte order; later
/// archives override earlier ones, matching the engine's `pak0`, `pak1`, ...
/// load order.
pub fn discover_archives(source_dir: &Utf8Path, extension: &str) -> Result<Vec<Utf8PathBuf>> {
    let mut archives = Vec::new();
    for entry in std::fs::read_dir(source_dir.as_std_path()).map_err(Error::io_read(source_dir))? {
        let entry = entry.map_err(Error::io_read(source_dir))?;
        let Some(path) = utf8_or_warn(entry.path()) else {
            continue;
        };
        let Some(name) = path.file_name() else {
            continue;
        };
        if !has_archive_extension(name, extension) {
            continue;
        }
        if !path.as_std_path().is_file() {
            tracing::debug!("Ignoring non-file archive candidate {}", path);
            continue;
        }
        archives.push(path);
    }

    archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(archives)
}

/// List every loose file under `source_dir`, recursively, in a pinned order.
///
/// Files and directories whose name ends in the archive extension are skipped
/// at any depth; a skipped directory is not descended into. Symlinks are followed. The walk visits entries sorted by file name at every
/// level, so the result is the same on every run.
pub fn discover_loose_files(source_dir: &Utf8Path, extension: &str) -> Result<Vec<LooseFile>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(source_dir.as_std_path())
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let is_archive = entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| has_archive_extension(name, extension));
            if is_archive {
                tracing::trace!("Skipping {} during loose scan", entry.path().display());
            }
            !is_archive
        });

    for entry in walker {
        let entry = entry.map_err(|err| walk_error(source_dir, err))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(path) = utf8_or_warn(entry.into_path()) else {
            continue;
        };

        let rel = path
            .strip_prefix(source_dir)
            .map_err(|_| Error::UnsafePath(path.to_string()))?;
        let logical_path = normalize_logical_path(rel.as_str())?;
        files.push(LooseFile { logical_path, path });
    }

    Ok(files)
}

fn walk_error(root: &Utf8Path, err: walkdir::Error) -> Error {
    let path = err
        .path()
        .and_then(Utf8Path::from_path)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    Error::IoRead {
        path,
        source: err.into(),
    }
}
