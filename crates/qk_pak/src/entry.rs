use binrw::binrw;

use crate::error::PakError;

/// Size of the fixed name field of a directory entry, NUL terminator included.
pub const NAME_FIELD_LEN: usize = 56;

/// Longest entry name that still leaves room for the NUL terminator.
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;

/// On-disk size of one directory entry.
pub const DIR_ENTRY_SIZE: usize = 64;

/// A single file stored in a PAK archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakEntry {
    /// Entry name exactly as stored in the directory.
    pub name: String,
    /// Absolute offset of the entry data from the start of the archive.
    pub offset: u32,
    /// Length of the entry data in bytes.
    pub length: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawDirEntry {
    pub name: [u8; NAME_FIELD_LEN],
    pub offset: i32,
    pub length: i32,
}

impl RawDirEntry {
    /// Encode a name into the NUL-padded name field. Callers validate the length.
    pub(crate) fn new(name: &str, offset: i32, length: i32) -> Self {
        let mut field = [0u8; NAME_FIELD_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        field[..len].copy_from_slice(&bytes[..len]);
        Self {
            name: field,
            offset,
            length,
        }
    }

    pub(crate) fn into_entry(self, index: usize, file_size: u64) -> Result<PakEntry, PakError> {
        let nul = self
            .name
            .iter()
            .position(|&b| b == 0)
            .ok_or(PakError::UnterminatedName(index))?;
        let name = std::str::from_utf8(&self.name[..nul])
            .ok()
            .filter(|name| !name.is_empty())
            .ok_or(PakError::InvalidName(index))?
            .to_string();

        let in_bounds = self.offset >= 0
            && self.length >= 0
            && self.offset as u64 + self.length as u64 <= file_size;
        if !in_bounds {
            return Err(PakError::EntryOutOfBounds {
                name,
                offset: self.offset,
                length: self.length,
            });
        }

        Ok(PakEntry {
            name,
            offset: self.offset as u32,
            length: self.length as u32,
        })
    }
}
