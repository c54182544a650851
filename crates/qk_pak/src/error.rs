use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or extracting a PAK archive.
#[derive(Error, Debug)]
pub enum PakError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("binrw error: {0}")]
    BinRead(#[from] binrw::Error),

    #[error("file is too small to be a PAK archive ({0} bytes)")]
    TooSmall(u64),

    #[error("invalid magic: {0:02x?}")]
    InvalidMagic([u8; 4]),

    #[error("invalid directory (offset {offset}, length {length}, file size {file_size})")]
    InvalidDirectory {
        offset: i32,
        length: i32,
        file_size: u64,
    },

    #[error("entry '{name}' lies outside the archive (offset {offset}, length {length})")]
    EntryOutOfBounds {
        name: String,
        offset: i32,
        length: i32,
    },

    #[error("entry name at index {0} is not NUL-terminated")]
    UnterminatedName(usize),

    #[error("entry name at index {0} is empty or not valid UTF-8")]
    InvalidName(usize),

    #[error("unsafe entry path: {0}")]
    UnsafeEntryPath(String),

    #[error("missing entry: {0}")]
    MissingEntry(String),

    /// Writing an extracted entry to disk failed.
    #[error("failed to write '{path}': {source}")]
    Extract {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
