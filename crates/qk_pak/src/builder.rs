use binrw::BinWrite;
use byteorder::{WriteBytesExt, LE};
use std::collections::HashSet;
use std::io::{self, BufWriter, Cursor, SeekFrom, Write};

use crate::entry::{RawDirEntry, DIR_ENTRY_SIZE, MAX_NAME_LEN};
use crate::{HEADER_SIZE, MAGIC};

#[derive(Debug, thiserror::Error)]
pub enum PakBuilderError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),

    #[error("binrw error: {0}")]
    BinWriteError(#[from] binrw::Error),

    #[error("entry name '{0}' is longer than {max} bytes", max = MAX_NAME_LEN)]
    NameTooLong(String),

    #[error("invalid entry name: '{0}'")]
    InvalidEntryName(String),

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("archive exceeds the 2 GiB limit of the PAK format")]
    ArchiveTooLarge,
}

/// Builds a PAK archive from an ordered list of entries.
///
/// Entries are written in insertion order. Entry data is requested lazily from
/// a provider closure passed to [`build_to_writer`](Self::build_to_writer), so
/// callers never need to hold every file in memory at once.
#[derive(Debug, Clone, Default)]
pub struct PakBuilder {
    entries: Vec<PakEntryBuilder>,
    names: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PakEntryBuilder {
    name: String,
}

impl PakEntryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry name.
    ///
    /// The name must be non-empty, contain no NUL bytes and fit the 56 byte
    /// name field including its terminator.
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, PakBuilderError> {
        let name = name.into();
        if name.is_empty() || name.contains('\0') {
            return Err(PakBuilderError::InvalidEntryName(name));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(PakBuilderError::NameTooLong(name));
        }
        self.name = name;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PakBuilder {
    /// Add an entry to the builder.
    ///
    /// Unlike a map insert this never replaces an existing entry; a second
    /// entry with the same name is rejected.
    pub fn with_entry(mut self, entry: PakEntryBuilder) -> Result<Self, PakBuilderError> {
        self.add_entry(entry)?;
        Ok(self)
    }

    pub fn add_entry(&mut self, entry: PakEntryBuilder) -> Result<(), PakBuilderError> {
        if entry.name.is_empty() {
            return Err(PakBuilderError::InvalidEntryName(entry.name));
        }
        if !self.names.insert(entry.name.clone()) {
            return Err(PakBuilderError::DuplicateEntry(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[PakEntryBuilder] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the PAK archive and write it to the given writer.
    ///
    /// * `writer` - The writer to write the archive to. Offsets are relative to
    ///   the writer's position when this is called.
    /// * `provide_entry_data` - A function that writes the raw data for each entry.
    pub fn build_to_writer<
        TWriter: io::Write + io::Seek,
        TEntryDataProvider: FnMut(&PakEntryBuilder, &mut Cursor<Vec<u8>>) -> Result<(), PakBuilderError>,
    >(
        self,
        writer: &mut TWriter,
        mut provide_entry_data: TEntryDataProvider,
    ) -> Result<(), PakBuilderError> {
        let start = writer.stream_position()?;
        let mut writer = BufWriter::new(writer);

        // Reserve space for the header, patched once the directory is placed
        writer.write_all(&[0; HEADER_SIZE])?;
        let mut position = HEADER_SIZE as u64;

        let mut directory = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let mut cursor = Cursor::new(Vec::new());
            provide_entry_data(entry, &mut cursor)?;
            let data = cursor.into_inner();

            let offset = to_i32(position)?;
            let length = to_i32(data.len() as u64)?;
            offset
                .checked_add(length)
                .ok_or(PakBuilderError::ArchiveTooLarge)?;

            writer.write_all(&data)?;
            position += data.len() as u64;
            directory.push(RawDirEntry::new(&entry.name, offset, length));
        }

        let dir_offset = to_i32(position)?;
        let dir_length = to_i32((directory.len() * DIR_ENTRY_SIZE) as u64)?;
        dir_offset
            .checked_add(dir_length)
            .ok_or(PakBuilderError::ArchiveTooLarge)?;

        for raw in &directory {
            raw.write(&mut writer)?;
        }

        Self::write_header(&mut writer, start, dir_offset, dir_length)?;
        writer.flush()?;

        tracing::debug!(
            "Built PAK entries={} directory_offset={} size={}",
            directory.len(),
            dir_offset,
            position + dir_length as u64
        );

        Ok(())
    }

    fn write_header<W: io::Write + io::Seek>(
        writer: &mut W,
        start: u64,
        dir_offset: i32,
        dir_length: i32,
    ) -> Result<(), PakBuilderError> {
        let end = writer.stream_position()?;
        writer.seek(SeekFrom::Start(start))?;
        writer.write_all(&MAGIC)?;
        writer.write_i32::<LE>(dir_offset)?;
        writer.write_i32::<LE>(dir_length)?;
        writer.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

fn to_i32(value: u64) -> Result<i32, PakBuilderError> {
    i32::try_from(value).map_err(|_| PakBuilderError::ArchiveTooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_too_long() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        let result = PakEntryBuilder::new().with_name(name);
        assert!(matches!(result, Err(PakBuilderError::NameTooLong(_))));
    }

    #[test]
    fn test_entry_name_at_limit() {
        let name = "a".repeat(MAX_NAME_LEN);
        let entry = PakEntryBuilder::new().with_name(name.clone()).unwrap();
        assert_eq!(entry.name(), name);
    }

    #[test]
    fn test_entry_name_empty() {
        let result = PakEntryBuilder::new().with_name("");
        assert!(matches!(result, Err(PakBuilderError::InvalidEntryName(_))));
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let builder = PakBuilder::default()
            .with_entry(PakEntryBuilder::new().with_name("a.txt").unwrap())
            .unwrap();
        let result = builder.with_entry(PakEntryBuilder::new().with_name("a.txt").unwrap());
        assert!(matches!(result, Err(PakBuilderError::DuplicateEntry(name)) if name == "a.txt"));
    }

    #[test]
    fn test_empty_archive_layout() {
        let mut cursor = Cursor::new(Vec::new());
        PakBuilder::default()
            .build_to_writer(&mut cursor, |_, _| Ok(()))
            .unwrap();

        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[..4], b"PACK");
        assert_eq!(i32::from_le_bytes(bytes[4..8].try_into().unwrap()), 12);
        assert_eq!(i32::from_le_bytes(bytes[8..12].try_into().unwrap()), 0);
    }

    #[test]
    fn test_data_precedes_directory() {
        let mut cursor = Cursor::new(Vec::new());
        PakBuilder::default()
            .with_entry(PakEntryBuilder::new().with_name("maps/e1m1.bsp").unwrap())
            .unwrap()
            .build_to_writer(&mut cursor, |_, data| {
                data.write_all(b"bsp")?;
                Ok(())
            })
            .unwrap();

        let bytes = cursor.into_inner();
        assert_eq!(&bytes[12..15], b"bsp");
        assert_eq!(i32::from_le_bytes(bytes[4..8].try_into().unwrap()), 15);
        assert_eq!(i32::from_le_bytes(bytes[8..12].try_into().unwrap()), 64);
        assert_eq!(bytes.len(), 15 + 64);
        assert_eq!(&bytes[15..28], b"maps/e1m1.bsp");
    }

    #[test]
    fn test_provider_error_propagates() {
        let mut cursor = Cursor::new(Vec::new());
        let result = PakBuilder::default()
            .with_entry(PakEntryBuilder::new().with_name("a.txt").unwrap())
            .unwrap()
            .build_to_writer(&mut cursor, |_, _| {
                Err(io::Error::new(io::ErrorKind::NotFound, "gone").into())
            });
        assert!(matches!(result, Err(PakBuilderError::IoError(_))));
    }
}
