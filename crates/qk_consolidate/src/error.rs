//! Error types for consolidation.
//!
//! Every fallible function in this crate returns [`Result<T>`]. The variants
//! carry the archive or file path involved so a failure can be diagnosed
//! without re-running. [`Consolidator::run`](crate::Consolidator::run) wraps the
//! error in a [`ConsolidateError`] that also records the failing stage.

use crate::consolidator::ConsolidateStage;
use camino::{Utf8Path, Utf8PathBuf};
use qk_pak::{PakBuilderError, PakError};
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while consolidating a gamedir.
#[derive(Error, Debug)]
pub enum Error {
    /// A source archive is missing, corrupt or unreadable.
    #[error("Failed to read archive '{archive}': {source}")]
    ArchiveRead {
        archive: Utf8PathBuf,
        #[source]
        source: PakError,
    },

    /// The output archive could not be created or an entry could not be written.
    #[error("Failed to write archive '{archive}': {source}")]
    ArchiveWrite {
        archive: Utf8PathBuf,
        #[source]
        source: PakBuilderError,
    },

    /// Reading a loose file or walking a directory failed.
    #[error("Failed to read '{path}': {source}")]
    IoRead {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing into the staging or output directory failed.
    #[error("Failed to write '{path}': {source}")]
    IoWrite {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source directory or the options are invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A loose file resolves to a path that cannot be stored as a logical path.
    #[error("Unsafe asset path: {0}")]
    UnsafePath(String),

    /// Another run holds the lock for this source directory.
    #[error("Another consolidation of this gamedir is running (lock: {0})")]
    Busy(Utf8PathBuf),

    /// The cancellation flag was raised between stages.
    #[error("Consolidation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn io_read(path: &Utf8Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
        move |source| Error::IoRead {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn io_write(path: &Utf8Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
        move |source| Error::IoWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Map a PAK reader error for `archive`.
    ///
    /// Failures writing extracted data land on the staging side and are
    /// reported as [`Error::IoWrite`]; everything else is an archive read error.
    pub(crate) fn archive_read(archive: &Utf8Path, err: PakError) -> Error {
        match err {
            PakError::Extract { path, source } => Error::IoWrite { path, source },
            source => Error::ArchiveRead {
                archive: archive.to_path_buf(),
                source,
            },
        }
    }

    pub(crate) fn archive_write(archive: &Utf8Path, source: PakBuilderError) -> Error {
        Error::ArchiveWrite {
            archive: archive.to_path_buf(),
            source,
        }
    }
}

/// A consolidation failure together with the stage it happened in.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct ConsolidateError {
    pub stage: ConsolidateStage,
    #[source]
    pub error: Error,
}

impl ConsolidateError {
    pub fn new(stage: ConsolidateStage, error: Error) -> Self {
        Self { stage, error }
    }

    /// The underlying error, without the stage context.
    pub fn into_inner(self) -> Error {
        self.error
    }
}
