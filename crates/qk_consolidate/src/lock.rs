use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;

/// Exclusive advisory lock over one gamedir's consolidation.
///
/// The lock file is removed when the guard is dropped, before the lock is
/// released. A run that opened the file before the removal can still lock the
/// unlinked file afterwards while a later run locks a freshly created one; that
/// window is narrow but not closed.
#[derive(Debug)]
pub(crate) struct SourceLock {
    file: File,
    path: Utf8PathBuf,
}

impl SourceLock {
    /// Take the lock at `path`, failing with [`Error::Busy`] if another run holds it.
    pub(crate) fn acquire(path: &Utf8Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path.as_std_path())
            .map_err(Error::io_write(path))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired lock {}", path);
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(err) if is_contended(&err) => Err(Error::Busy(path.to_path_buf())),
            Err(err) => Err(Error::io_write(path)(err)),
        }
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        &self.path
    }
}

fn is_contended(err: &io::Error) -> bool {
    if err.kind() == fs2::lock_contended_error().kind() {
        return true;
    }
    #[cfg(windows)]
    if matches!(err.raw_os_error(), Some(32 | 33)) {
        return true;
    }
    false
}

impl Drop for SourceLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(self.path.as_std_path()) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove lock file {}: {}", self.path, e);
            }
        }
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to unlock {}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("id1_consolidate.lock")).unwrap();

        let lock = SourceLock::acquire(&path).unwrap();
        assert!(matches!(SourceLock::acquire(&path), Err(Error::Busy(p)) if p == path));

        drop(lock);
        assert!(!path.exists());
        SourceLock::acquire(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_file_unlinked_on_drop() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("id1_consolidate.lock")).unwrap();

        let lock = SourceLock::acquire(&path).unwrap();
        let stale = File::open(path.as_std_path()).unwrap();
        drop(lock);

        assert_eq!(stale.metadata().unwrap().nlink(), 0);
        let fresh = SourceLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(fresh);
    }
}
