//! Consolidation options and the on-disk layout derived from them.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Tunables for a consolidation run.
///
/// Deserializable from the `[consolidate]` table of a TOML config file; every
/// field falls back to its default when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidateOptions {
    /// Extension (without the dot) identifying archive files, matched case-sensitively.
    pub archive_extension: String,
    /// File name of the consolidated archive inside the output directory.
    pub output_file_name: String,
    /// Suffix appended to the gamedir name for the staging directory.
    pub staging_suffix: String,
    /// Suffix appended to the gamedir name for the output directory.
    pub output_suffix: String,
    /// Suffix appended to the gamedir name for the run lock file.
    pub lock_suffix: String,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            archive_extension: "pak".to_string(),
            output_file_name: "pak0.pak".to_string(),
            staging_suffix: "_temp".to_string(),
            output_suffix: "_consolidated".to_string(),
            lock_suffix: "_consolidate.lock".to_string(),
        }
    }
}

impl ConsolidateOptions {
    /// Check that the options describe a usable layout.
    pub fn validate(&self) -> Result<()> {
        let ext = &self.archive_extension;
        if ext.is_empty() || ext.contains(|c: char| matches!(c, '.' | '/' | '\\')) {
            return Err(Error::Config(format!(
                "archive extension '{ext}' must be a bare extension such as 'pak'"
            )));
        }

        let name = &self.output_file_name;
        if name.is_empty() || name.contains(is_separator) {
            return Err(Error::Config(format!(
                "output file name '{name}' must be a plain file name"
            )));
        }
        if !crate::utils::has_archive_extension(name, ext) {
            return Err(Error::Config(format!(
                "output file name '{name}' must end in .{ext}"
            )));
        }

        let suffixes = [&self.staging_suffix, &self.output_suffix, &self.lock_suffix];
        if suffixes.iter().any(|s| s.is_empty() || s.contains(is_separator)) {
            return Err(Error::Config(
                "staging, output and lock suffixes must be non-empty and contain no separators"
                    .to_string(),
            ));
        }
        if self.staging_suffix == self.output_suffix
            || self.staging_suffix == self.lock_suffix
            || self.output_suffix == self.lock_suffix
        {
            return Err(Error::Config(
                "staging, output and lock suffixes must differ".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Paths used by one consolidation of `source_dir`.
///
/// Given a gamedir `D`, the staging directory, output directory and lock file
/// are siblings of `D` named `D_temp`, `D_consolidated` and
/// `D_consolidate.lock` (with default options).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidateLayout {
    pub source_dir: Utf8PathBuf,
    pub staging_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub output_archive: Utf8PathBuf,
    pub lock_file: Utf8PathBuf,
}

impl ConsolidateLayout {
    /// Derive the layout for `source_dir`, which must be an existing directory.
    pub fn resolve(source_dir: &Utf8Path, options: &ConsolidateOptions) -> Result<Self> {
        if !source_dir.as_std_path().is_dir() {
            return Err(Error::Config(format!(
                "gamedir '{source_dir}' does not exist or is not a directory"
            )));
        }

        // Paths like `.` or `..` have no usable name; fall back to the canonical form
        let source_dir = match source_dir.file_name() {
            Some(_) => source_dir.to_path_buf(),
            None => {
                let canonical = source_dir
                    .as_std_path()
                    .canonicalize()
                    .map_err(Error::io_read(source_dir))?;
                Utf8PathBuf::from_path_buf(canonical).map_err(|p| {
                    Error::Config(format!("gamedir '{}' is not valid UTF-8", p.display()))
                })?
            }
        };

        let name = source_dir.file_name().ok_or_else(|| {
            Error::Config(format!(
                "cannot place sibling directories next to '{source_dir}'"
            ))
        })?;
        let parent = source_dir.parent().unwrap_or(Utf8Path::new(""));

        let staging_dir = parent.join(format!("{name}{}", options.staging_suffix));
        let output_dir = parent.join(format!("{name}{}", options.output_suffix));
        let output_archive = output_dir.join(&options.output_file_name);
        let lock_file = parent.join(format!("{name}{}", options.lock_suffix));

        Ok(Self {
            source_dir,
            staging_dir,
            output_dir,
            output_archive,
            lock_file,
        })
    }
}
