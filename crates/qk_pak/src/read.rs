use binrw::BinRead;
use byteorder::{ReadBytesExt, LE};
use camino::Utf8Path;
use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
};

use crate::{
    entry::{RawDirEntry, DIR_ENTRY_SIZE},
    error::PakError,
    Pak, HEADER_SIZE, MAGIC,
};

impl<TSource: Read + Seek> Pak<TSource> {
    /// Mount a PAK archive, reading and validating its header and directory.
    ///
    /// Entry data is not read until [`load_entry`](Self::load_entry) is called.
    pub fn mount_from_reader(mut source: TSource) -> Result<Self, PakError> {
        let file_size = source.seek(SeekFrom::End(0))?;
        if file_size < HEADER_SIZE as u64 {
            return Err(PakError::TooSmall(file_size));
        }
        source.seek(SeekFrom::Start(0))?;

        let entries = {
            let mut reader = BufReader::new(&mut source);

            let mut magic = [0u8; 4];
            reader.read_exact(&mut magic)?;
            if magic != MAGIC {
                return Err(PakError::InvalidMagic(magic));
            }

            let dir_offset = reader.read_i32::<LE>()?;
            let dir_length = reader.read_i32::<LE>()?;
            validate_directory(dir_offset, dir_length, file_size)?;

            reader.seek(SeekFrom::Start(dir_offset as u64))?;
            let entry_count = dir_length as usize / DIR_ENTRY_SIZE;
            let mut entries = Vec::with_capacity(entry_count);
            for index in 0..entry_count {
                let raw = RawDirEntry::read(&mut reader)?;
                entries.push(raw.into_entry(index, file_size)?);
            }
            entries
        };

        tracing::debug!("Mounted PAK entries={} size={}", entries.len(), file_size);

        Ok(Self { entries, source })
    }
}

impl Pak<BufReader<File>> {
    /// Open and mount the PAK archive at `path`.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, PakError> {
        let file = File::open(path.as_ref().as_std_path())?;
        Self::mount_from_reader(BufReader::new(file))
    }
}

fn validate_directory(offset: i32, length: i32, file_size: u64) -> Result<(), PakError> {
    let valid = offset >= 0
        && length >= 0
        && length as usize % DIR_ENTRY_SIZE == 0
        && offset as u64 + length as u64 <= file_size;
    if valid {
        Ok(())
    } else {
        Err(PakError::InvalidDirectory {
            offset,
            length,
            file_size,
        })
    }
}
