//! In-memory precedence resolution.
//!
//! An [`OverlayPlan`] maps every logical path to the single source that wins it.
//! Sources are applied in precedence order (archives in ascending name order,
//! then loose files) and each insert replaces whatever was there before, which
//! is exactly the engine's last-write-wins rule. Because the plan is plain data
//! the precedence rule can be exercised without touching a filesystem; the
//! staging area is only written once the plan is final.

use crate::discover::{discover_loose_files, LooseFile};
use crate::error::{Error, Result};
use crate::utils::normalize_logical_path;
use camino::{Utf8Path, Utf8PathBuf};
use qk_pak::{Pak, PakEntry};
use std::collections::BTreeMap;

/// Where the final bytes for a logical path come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// An entry inside a source archive.
    ArchiveEntry {
        archive: Utf8PathBuf,
        entry: PakEntry,
    },
    /// A loose file in the gamedir.
    LooseFile { path: Utf8PathBuf },
}

impl AssetOrigin {
    /// The archive or loose file this origin reads from.
    pub fn source_path(&self) -> &Utf8Path {
        match self {
            AssetOrigin::ArchiveEntry { archive, .. } => archive,
            AssetOrigin::LooseFile { path } => path,
        }
    }
}

/// Resolved mapping from logical path to winning origin.
///
/// Iteration is in logical path order.
#[derive(Debug, Clone, Default)]
pub struct OverlayPlan {
    winners: BTreeMap<String, AssetOrigin>,
    archives: Vec<Utf8PathBuf>,
    loose_files: usize,
    overrides: usize,
}

impl OverlayPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `origin` as the winner for `logical_path`.
    ///
    /// Returns the origin it displaced, if any.
    pub fn insert(&mut self, logical_path: String, origin: AssetOrigin) -> Option<AssetOrigin> {
        let previous = self.winners.insert(logical_path, origin);
        if previous.is_some() {
            self.overrides += 1;
        }
        previous
    }

    /// Open `archive` and apply all of its entries.
    ///
    /// `on_entry` is called with each entry's logical path and whether it
    /// replaced an earlier winner. Fails with [`Error::ArchiveRead`] if the
    /// archive cannot be opened, is malformed, or names an unsafe path.
    pub fn apply_archive<F>(&mut self, archive: &Utf8Path, on_entry: F) -> Result<usize>
    where
        F: FnMut(&str, bool),
    {
        let pak = Pak::open(archive).map_err(|e| Error::archive_read(archive, e))?;
        tracing::debug!("Archive {} lists {} entries", archive, pak.len());
        self.apply_archive_entries(archive, pak.entries(), on_entry)
    }

    /// Apply an already-listed set of archive entries, in directory order.
    pub fn apply_archive_entries<F>(
        &mut self,
        archive: &Utf8Path,
        entries: &[PakEntry],
        mut on_entry: F,
    ) -> Result<usize>
    where
        F: FnMut(&str, bool),
    {
        // Validate every name first so a bad archive leaves the plan untouched
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            let logical_path = normalize_logical_path(&entry.name).map_err(|_| {
                Error::archive_read(
                    archive,
                    qk_pak::PakError::UnsafeEntryPath(entry.name.clone()),
                )
            })?;
            resolved.push((logical_path, entry));
        }

        for (logical_path, entry) in resolved {
            let origin = AssetOrigin::ArchiveEntry {
                archive: archive.to_path_buf(),
                entry: entry.clone(),
            };
            let replaced = self.insert(logical_path.clone(), origin).is_some();
            if replaced {
                tracing::debug!("{} overrides {}", archive, logical_path);
            }
            on_entry(&logical_path, replaced);
        }

        self.archives.push(archive.to_path_buf());
        Ok(entries.len())
    }

    /// Discover the loose files of `source_dir` and apply them on top of
    /// everything applied so far.
    ///
    /// Archive-suffixed files are skipped at any depth. `on_file` is called with
    /// each file and whether it replaced an earlier winner.
    pub fn apply_loose_files<F>(
        &mut self,
        source_dir: &Utf8Path,
        archive_extension: &str,
        on_file: F,
    ) -> Result<usize>
    where
        F: FnMut(&LooseFile, bool),
    {
        let files = discover_loose_files(source_dir, archive_extension)?;
        tracing::debug!("Found {} loose files in {}", files.len(), source_dir);
        Ok(self.apply_files(files, on_file))
    }

    /// Apply an already-discovered set of loose files, in the given order.
    pub fn apply_files<I, F>(&mut self, files: I, mut on_file: F) -> usize
    where
        I: IntoIterator<Item = LooseFile>,
        F: FnMut(&LooseFile, bool),
    {
        let mut applied = 0;
        for file in files {
            let origin = AssetOrigin::LooseFile {
                path: file.path.clone(),
            };
            let replaced = self.insert(file.logical_path.clone(), origin).is_some();
            if replaced {
                tracing::debug!("Loose file {} overrides archive entry", file.logical_path);
            }
            on_file(&file, replaced);
            applied += 1;
        }
        self.loose_files += applied;
        applied
    }

    pub fn get(&self, logical_path: &str) -> Option<&AssetOrigin> {
        self.winners.get(logical_path)
    }

    /// Iterate winners in logical path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetOrigin)> {
        self.winners.iter().map(|(path, origin)| (path.as_str(), origin))
    }

    /// Number of distinct logical paths.
    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Archives applied so far, in application order.
    pub fn archives(&self) -> &[Utf8PathBuf] {
        &self.archives
    }

    /// Number of loose files applied.
    pub fn loose_files(&self) -> usize {
        self.loose_files
    }

    /// Number of inserts that displaced an earlier winner.
    pub fn overrides(&self) -> usize {
        self.overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> PakEntry {
        PakEntry {
            name: name.to_string(),
            offset: 12,
            length: 1,
        }
    }

    fn loose(logical_path: &str) -> LooseFile {
        LooseFile {
            logical_path: logical_path.to_string(),
            path: Utf8PathBuf::from("/gamedir").join(logical_path),
        }
    }

    fn winner(plan: &OverlayPlan, path: &str) -> String {
        plan.get(path).unwrap().source_path().to_string()
    }

    #[test]
    fn test_later_archive_wins() {
        let mut plan = OverlayPlan::new();
        plan.apply_archive_entries(
            Utf8Path::new("/gamedir/pak0.pak"),
            &[entry("a.txt"), entry("b.txt")],
            |_, _| {},
        )
        .unwrap();
        plan.apply_archive_entries(
            Utf8Path::new("/gamedir/pak1.pak"),
            &[entry("b.txt"), entry("c.txt")],
            |_, _| {},
        )
        .unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(winner(&plan, "a.txt"), "/gamedir/pak0.pak");
        assert_eq!(winner(&plan, "b.txt"), "/gamedir/pak1.pak");
        assert_eq!(winner(&plan, "c.txt"), "/gamedir/pak1.pak");
        assert_eq!(plan.overrides(), 1);
    }

    #[test]
    fn test_loose_file_beats_archives() {
        let mut plan = OverlayPlan::new();
        plan.apply_archive_entries(Utf8Path::new("/gamedir/pak0.pak"), &[entry("a.txt")], |_, _| {})
            .unwrap();
        plan.apply_archive_entries(Utf8Path::new("/gamedir/pak1.pak"), &[entry("a.txt")], |_, _| {})
            .unwrap();

        let mut replaced_flags = Vec::new();
        plan.apply_files(vec![loose("a.txt"), loose("d.txt")], |_, replaced| {
            replaced_flags.push(replaced)
        });

        assert_eq!(replaced_flags, [true, false]);
        assert!(matches!(
            plan.get("a.txt"),
            Some(AssetOrigin::LooseFile { .. })
        ));
        assert_eq!(plan.loose_files(), 2);
        assert_eq!(plan.overrides(), 2);
    }

    #[test]
    fn test_duplicate_within_archive_last_wins() {
        let mut plan = OverlayPlan::new();
        let first = PakEntry {
            name: "b.txt".to_string(),
            offset: 12,
            length: 3,
        };
        let second = PakEntry {
            name: "b.txt".to_string(),
            offset: 15,
            length: 3,
        };
        plan.apply_archive_entries(Utf8Path::new("/gamedir/pak0.pak"), &[first, second.clone()], |_, _| {})
            .unwrap();

        match plan.get("b.txt") {
            Some(AssetOrigin::ArchiveEntry { entry, .. }) => assert_eq!(entry, &second),
            other => panic!("unexpected origin: {other:?}"),
        }
    }

    #[test]
    fn test_backslash_entry_matches_loose_slash_path() {
        let mut plan = OverlayPlan::new();
        plan.apply_archive_entries(
            Utf8Path::new("/gamedir/pak0.pak"),
            &[entry("textures\\wall.png")],
            |_, _| {},
        )
        .unwrap();
        plan.apply_files(vec![loose("textures/wall.png")], |_, _| {});

        assert_eq!(plan.len(), 1);
        assert!(matches!(
            plan.get("textures/wall.png"),
            Some(AssetOrigin::LooseFile { .. })
        ));
    }

    #[test]
    fn test_unsafe_entry_leaves_plan_untouched() {
        let mut plan = OverlayPlan::new();
        let result = plan.apply_archive_entries(
            Utf8Path::new("/gamedir/pak0.pak"),
            &[entry("a.txt"), entry("../escape.cfg")],
            |_, _| {},
        );

        assert!(matches!(result, Err(Error::ArchiveRead { .. })));
        assert!(plan.is_empty());
        assert!(plan.archives().is_empty());
    }

    #[test]
    fn test_iteration_in_path_order() {
        let mut plan = OverlayPlan::new();
        plan.apply_files(vec![loose("progs/b.mdl"), loose("a.cfg"), loose("maps/x.bsp")], |_, _| {});

        let order: Vec<&str> = plan.iter().map(|(path, _)| path).collect();
        assert_eq!(order, ["a.cfg", "maps/x.bsp", "progs/b.mdl"]);
    }
}
