use camino::{Utf8Path, Utf8PathBuf};
use std::io::{Read, Seek};

use crate::{error::PakError, utils::normalize_entry_name, Pak, PakEntry};

/// Writes entries of a mounted [`Pak`] to the filesystem.
///
/// Entry names are normalized with [`normalize_entry_name`] before being joined
/// onto the output directory, so an entry can never be written outside it.
/// Existing files are overwritten.
pub struct PakExtractor<'pak, TSource: Read + Seek> {
    pak: &'pak mut Pak<TSource>,
}

impl<'pak, TSource: Read + Seek> PakExtractor<'pak, TSource> {
    pub fn new(pak: &'pak mut Pak<TSource>) -> Self {
        Self { pak }
    }

    /// Extract every entry in directory order, returning the written paths.
    ///
    /// If the directory names the same path twice the later entry's data is
    /// what remains on disk.
    pub fn extract_all(
        &mut self,
        output_dir: impl AsRef<Utf8Path>,
    ) -> Result<Vec<Utf8PathBuf>, PakError> {
        let output_dir = output_dir.as_ref();
        let entries = self.pak.entries().to_vec();
        let mut written = Vec::with_capacity(entries.len());
        for entry in &entries {
            written.push(self.extract_entry(entry, output_dir)?);
        }
        Ok(written)
    }

    /// Extract one entry below `output_dir` at its normalized path.
    pub fn extract_entry(
        &mut self,
        entry: &PakEntry,
        output_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, PakError> {
        let rel = normalize_entry_name(&entry.name)
            .ok_or_else(|| PakError::UnsafeEntryPath(entry.name.clone()))?;
        let destination = output_dir.join(rel);
        self.extract_entry_to(entry, &destination)?;
        Ok(destination)
    }

    /// Extract one entry to an exact destination path, creating parent directories.
    pub fn extract_entry_to(
        &mut self,
        entry: &PakEntry,
        destination: &Utf8Path,
    ) -> Result<(), PakError> {
        let data = self.pak.load_entry(entry)?;

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent.as_std_path()).map_err(|source| {
                PakError::Extract {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }
        std::fs::write(destination.as_std_path(), &data).map_err(|source| PakError::Extract {
            path: destination.to_path_buf(),
            source,
        })?;

        tracing::trace!("Extracted {} -> {}", entry.name, destination);
        Ok(())
    }
}
