//! Path normalization helpers.
//!
//! A *logical path* identifies one asset regardless of which archive or loose
//! file supplies it: relative, `/`-separated, with no empty, `.` or `..`
//! components. Backslashes are separators too, so a loose file named
//! `textures\wall.png` and an archive entry `textures/wall.png` are the same
//! asset.

use crate::error::{Error, Result};
use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Normalize a relative path or archive entry name into a logical path.
pub fn normalize_logical_path(path: &str) -> Result<String> {
    qk_pak::normalize_entry_name(path).ok_or_else(|| Error::UnsafePath(path.to_string()))
}

/// Whether `file_name` ends in `.{extension}`. The match is case-sensitive.
pub fn has_archive_extension(file_name: &str, extension: &str) -> bool {
    file_name
        .strip_suffix(extension)
        .is_some_and(|stem| stem.ends_with('.'))
}

/// Convert a `PathBuf` to UTF-8, logging and returning `None` when it isn't.
pub(crate) fn utf8_or_warn(path: PathBuf) -> Option<Utf8PathBuf> {
    match Utf8PathBuf::from_path_buf(path) {
        Ok(p) => Some(p),
        Err(p) => {
            tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslash_and_slash_agree() {
        assert_eq!(
            normalize_logical_path("textures\\wall.png").unwrap(),
            normalize_logical_path("textures/wall.png").unwrap()
        );
    }

    #[test]
    fn test_unsafe_path_rejected() {
        assert!(matches!(
            normalize_logical_path("../id1/pak0.pak"),
            Err(Error::UnsafePath(_))
        ));
    }

    #[test]
    fn test_archive_extension_case_sensitive() {
        assert!(has_archive_extension("pak0.pak", "pak"));
        assert!(!has_archive_extension("PAK1.PAK", "pak"));
        assert!(!has_archive_extension("pak1.Pak", "pak"));
        assert!(!has_archive_extension("pak0.pak.bak", "pak"));
        assert!(!has_archive_extension("readme.txt", "pak"));
    }

    #[test]
    fn test_bare_extension_is_archive() {
        assert!(has_archive_extension(".pak", "pak"));
    }
}
