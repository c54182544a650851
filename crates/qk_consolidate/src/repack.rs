//! Re-encoding the staging area into a single archive.

use crate::error::{Error, Result};
use crate::utils::{normalize_logical_path, utf8_or_warn};
use camino::{Utf8Path, Utf8PathBuf};
use qk_pak::{PakBuilder, PakBuilderError, PakEntryBuilder};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use walkdir::WalkDir;

/// What a repack wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepackStats {
    pub entries_written: usize,
    pub bytes_written: u64,
}

/// Write every regular file under `staging_dir` into a new archive at `output_archive`.
///
/// The walk is sorted by file name at every level, so entry order depends
/// only on the staged tree. Entry names are forward-slash relative paths.
/// `on_entry` is called with each entry name and the file it came from, in
/// archive order. The output is created or truncated; its parent directory
/// is created if needed.
pub fn repack<F>(staging_dir: &Utf8Path, output_archive: &Utf8Path, mut on_entry: F) -> Result<RepackStats>
where
    F: FnMut(&str, &Utf8Path),
{
    let mut builder = PakBuilder::default();
    let mut sources: HashMap<String, Utf8PathBuf> = HashMap::new();

    let walker = WalkDir::new(staging_dir.as_std_path())
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .and_then(Utf8Path::from_path)
                .map(Utf8Path::to_path_buf)
                .unwrap_or_else(|| staging_dir.to_path_buf());
            Error::IoRead {
                path,
                source: err.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = utf8_or_warn(entry.into_path()) else {
            continue;
        };
        let Ok(rel) = path.strip_prefix(staging_dir) else {
            continue;
        };
        let name = normalize_logical_path(rel.as_str())?;

        let entry_builder = PakEntryBuilder::new()
            .with_name(name.clone())
            .map_err(|e| Error::archive_write(output_archive, e))?;
        builder
            .add_entry(entry_builder)
            .map_err(|e| Error::archive_write(output_archive, e))?;
        sources.insert(name, path);
    }

    if let Some(parent) = output_archive.parent() {
        fs::create_dir_all(parent.as_std_path()).map_err(Error::io_write(parent))?;
    }
    let mut file = File::create(output_archive.as_std_path())
        .map_err(|e| Error::archive_write(output_archive, PakBuilderError::IoError(e)))?;

    let mut stats = RepackStats::default();
    builder
        .build_to_writer(&mut file, |entry, cursor| {
            let Some(path) = sources.get(entry.name()) else {
                return Err(PakBuilderError::InvalidEntryName(entry.name().to_string()));
            };
            let data = fs::read(path.as_std_path())?;
            cursor.write_all(&data)?;

            stats.entries_written += 1;
            stats.bytes_written += data.len() as u64;
            on_entry(entry.name(), path);
            tracing::trace!("Packed {} ({} bytes)", entry.name(), data.len());
            Ok(())
        })
        .map_err(|e| Error::archive_write(output_archive, e))?;

    tracing::info!(
        "Wrote {} entries ({} bytes) to {}",
        stats.entries_written,
        stats.bytes_written,
        output_archive
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qk_pak::Pak;

    fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_repack_sorted_forward_slash_names() {
        let (_dir, root) = utf8_tempdir();
        let staging = root.join("staging");
        fs::create_dir_all(staging.join("maps")).unwrap();
        fs::create_dir_all(staging.join("progs")).unwrap();
        fs::write(staging.join("progs/player.mdl"), "mdl").unwrap();
        fs::write(staging.join("maps/e1m1.bsp"), "bsp").unwrap();
        fs::write(staging.join("autoexec.cfg"), "cfg").unwrap();

        let output = root.join("out/pak0.pak");
        let mut order = Vec::new();
        let stats = repack(&staging, &output, |name, _| order.push(name.to_string())).unwrap();

        assert_eq!(stats.entries_written, 3);
        assert_eq!(stats.bytes_written, 9);
        assert_eq!(order, ["autoexec.cfg", "maps/e1m1.bsp", "progs/player.mdl"]);

        let mut pak = Pak::open(&output).unwrap();
        let names: Vec<&str> = pak.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, order);
        assert_eq!(&*pak.load_entry_by_name("maps/e1m1.bsp").unwrap(), b"bsp");
    }

    #[test]
    fn test_repack_empty_staging() {
        let (_dir, root) = utf8_tempdir();
        let staging = root.join("staging");
        fs::create_dir_all(&staging).unwrap();
        let output = root.join("pak0.pak");

        let stats = repack(&staging, &output, |_, _| {}).unwrap();

        assert_eq!(stats, RepackStats::default());
        assert_eq!(fs::metadata(&output).unwrap().len(), 12);
        assert!(Pak::open(&output).unwrap().is_empty());
    }

    #[test]
    fn test_repack_truncates_existing_output() {
        let (_dir, root) = utf8_tempdir();
        let staging = root.join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("a.txt"), "a").unwrap();
        let output = root.join("pak0.pak");
        fs::write(&output, vec![0xAB; 4096]).unwrap();

        repack(&staging, &output, |_, _| {}).unwrap();

        assert_eq!(fs::metadata(&output).unwrap().len(), 12 + 1 + 64);
    }

    #[test]
    fn test_repack_name_too_long() {
        let (_dir, root) = utf8_tempdir();
        let staging = root.join("staging");
        let deep = staging.join("a".repeat(40));
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join(format!("{}.txt", "b".repeat(20))), "x").unwrap();

        let result = repack(&staging, &root.join("pak0.pak"), |_, _| {});

        assert!(matches!(
            result,
            Err(Error::ArchiveWrite {
                source: PakBuilderError::NameTooLong(_),
                ..
            })
        ));
    }
}
