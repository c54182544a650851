//! Quake PAK archive reader/writer.
//!
//! A PAK file is a flat container: a 12 byte header (`PACK`, directory offset,
//! directory length) followed by entry data and a directory of 64 byte records,
//! each holding a NUL-padded 56 byte name, a data offset and a data length. All
//! integers are little-endian `i32`.
//!
//! - [`Pak`] mounts an archive and loads entry data on demand.
//! - [`PakExtractor`] writes entries to the filesystem.
//! - [`PakBuilder`](builder::PakBuilder) writes new archives.

use std::io::{Read, Seek, SeekFrom};

pub mod builder;
mod entry;
mod error;
mod extractor;
mod read;
pub mod utils;

pub use builder::{PakBuilder, PakBuilderError, PakEntryBuilder};
pub use entry::{PakEntry, DIR_ENTRY_SIZE, MAX_NAME_LEN, NAME_FIELD_LEN};
pub use error::PakError;
pub use extractor::PakExtractor;
pub use utils::normalize_entry_name;

/// Magic bytes at the start of every PAK archive.
pub const MAGIC: [u8; 4] = *b"PACK";

/// Size of the archive header in bytes.
pub const HEADER_SIZE: usize = 12;

/// A mounted PAK archive.
#[derive(Debug)]
pub struct Pak<TSource: Read + Seek> {
    /// Directory entries in on-disk order.
    entries: Vec<PakEntry>,

    /// The original byte source.
    source: TSource,
}

impl<TSource: Read + Seek> Pak<TSource> {
    /// Directory entries in on-disk order.
    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its exact stored name.
    ///
    /// When the directory holds the same name more than once, the last record wins.
    pub fn entry(&self, name: &str) -> Option<&PakEntry> {
        self.entries.iter().rev().find(|entry| entry.name == name)
    }

    /// Load the data of an entry into memory.
    pub fn load_entry(&mut self, entry: &PakEntry) -> Result<Box<[u8]>, PakError> {
        let mut data = vec![0; entry.length as usize];
        self.source.seek(SeekFrom::Start(entry.offset as u64))?;
        self.source.read_exact(&mut data)?;
        Ok(data.into_boxed_slice())
    }

    /// Load the data of an entry by name.
    pub fn load_entry_by_name(&mut self, name: &str) -> Result<Box<[u8]>, PakError> {
        let entry = self
            .entry(name)
            .cloned()
            .ok_or_else(|| PakError::MissingEntry(name.to_string()))?;
        self.load_entry(&entry)
    }
}
