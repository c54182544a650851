//! The consolidation pipeline.
//!
//! [`Consolidator::run`] drives one gamedir through the fixed stage sequence
//! `Init -> UnpackAll -> Overlay -> Repack -> Cleanup`:
//!
//! 1. **Init**: validate options, resolve the sibling layout, take the source
//!    lock, and recreate the staging and output directories.
//! 2. **UnpackAll**: apply every archive to the [`OverlayPlan`] in ascending
//!    file name order. Later archives override earlier ones.
//! 3. **Overlay**: apply the loose files on top, then write the plan's winners
//!    into the staging area, one write per logical path.
//! 4. **Repack**: encode the staging area into the output archive.
//! 5. **Cleanup**: always runs. Removes the staging area, and the output
//!    directory too if an earlier stage failed, then releases the lock.
//!
//! The cancellation flag is checked before each of UnpackAll, Overlay and
//! Repack. Once the output archive is written the run completes.

use crate::discover::discover_archives;
use crate::error::{ConsolidateError, Error, Result};
use crate::lock::SourceLock;
use crate::options::{ConsolidateLayout, ConsolidateOptions};
use crate::plan::{AssetOrigin, OverlayPlan};
use crate::repack::repack;
use crate::stage::{materialize, remove_dir_if_exists, StagingArea};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stages of the consolidation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsolidateStage {
    Init,
    UnpackAll,
    Overlay,
    Repack,
    Cleanup,
}

impl fmt::Display for ConsolidateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsolidateStage::Init => "init",
            ConsolidateStage::UnpackAll => "unpack",
            ConsolidateStage::Overlay => "overlay",
            ConsolidateStage::Repack => "repack",
            ConsolidateStage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Progress events emitted while a run executes.
///
/// Events arrive in pipeline order. `EntryProcessed` is emitted once per
/// archive entry applied, per loose file applied, and per entry packed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConsolidateEvent {
    /// A stage began. `target` is the directory or archive it writes to, if any.
    StageStarted {
        stage: ConsolidateStage,
        source: Utf8PathBuf,
        target: Option<Utf8PathBuf>,
    },
    /// An archive is about to be applied. `current` is 1-based.
    ArchiveStarted {
        archive: Utf8PathBuf,
        staging_dir: Utf8PathBuf,
        current: usize,
        total: usize,
    },
    /// One logical path was handled by `stage`.
    EntryProcessed {
        stage: ConsolidateStage,
        path: String,
        source: Utf8PathBuf,
        /// Whether this displaced an earlier winner for the same path.
        replaced: bool,
    },
    /// The output archive is complete.
    Complete { output: Utf8PathBuf, entries: usize },
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct ConsolidateResult {
    /// The archive that was written.
    pub output_archive: Utf8PathBuf,
    /// Number of entries in the output archive.
    pub entries_written: usize,
    /// Number of source archives applied.
    pub archives_processed: usize,
    /// Number of loose files applied.
    pub loose_files_applied: usize,
    /// How many times a source replaced an earlier winner.
    pub paths_overridden: usize,
    /// Wall-clock time for the whole run.
    pub elapsed: Duration,
}

type ProgressCallback = Arc<dyn Fn(ConsolidateEvent) + Send + Sync>;

/// Consolidates one gamedir into a single archive.
///
/// Create with [`new`](Self::new), optionally configure with
/// [`with_options`](Self::with_options), [`with_reporter`](Self::with_reporter)
/// and [`with_cancel_flag`](Self::with_cancel_flag), then call [`run`](Self::run).
pub struct Consolidator {
    source_dir: Utf8PathBuf,
    options: ConsolidateOptions,
    reporter: Option<ProgressCallback>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Consolidator {
    pub fn new(source_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            options: ConsolidateOptions::default(),
            reporter: None,
            cancel: None,
        }
    }

    pub fn with_options(mut self, options: ConsolidateOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a callback that receives [`ConsolidateEvent`]s as the run progresses.
    pub fn with_reporter<F>(mut self, callback: F) -> Self
    where
        F: Fn(ConsolidateEvent) + Send + Sync + 'static,
    {
        self.reporter = Some(Arc::new(callback));
        self
    }

    /// Share a flag that aborts the run with [`Error::Cancelled`] at the next stage boundary.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &ConsolidateOptions {
        &self.options
    }

    /// Resolve the directories this run would use, without touching the filesystem.
    pub fn layout(&self) -> Result<ConsolidateLayout> {
        self.options.validate()?;
        ConsolidateLayout::resolve(&self.source_dir, &self.options)
    }

    /// Run the pipeline once.
    ///
    /// On failure the error carries the stage it happened in. Staging and
    /// output directories are removed before it is returned.
    pub fn run(&self) -> std::result::Result<ConsolidateResult, ConsolidateError> {
        let start_time = Instant::now();
        let init_err = |error| ConsolidateError::new(ConsolidateStage::Init, error);

        let layout = self.layout().map_err(init_err)?;
        let lock = SourceLock::acquire(&layout.lock_file).map_err(init_err)?;
        tracing::info!("Consolidating {}", layout.source_dir);
        tracing::debug!("Holding lock {}", lock.path());

        let mut stage = ConsolidateStage::Init;
        let outcome = self.run_stages(&layout, &mut stage);

        self.emit(ConsolidateEvent::StageStarted {
            stage: ConsolidateStage::Cleanup,
            source: layout.staging_dir.clone(),
            target: None,
        });
        cleanup_dir(&layout.staging_dir);
        if outcome.is_err() {
            cleanup_dir(&layout.output_dir);
        }
        drop(lock);

        let (entries_written, plan) = outcome.map_err(|error| {
            tracing::error!("Consolidation failed during {}: {}", stage, error);
            ConsolidateError::new(stage, error)
        })?;

        self.emit(ConsolidateEvent::Complete {
            output: layout.output_archive.clone(),
            entries: entries_written,
        });

        let result = ConsolidateResult {
            output_archive: layout.output_archive,
            entries_written,
            archives_processed: plan.archives().len(),
            loose_files_applied: plan.loose_files(),
            paths_overridden: plan.overrides(),
            elapsed: start_time.elapsed(),
        };
        tracing::info!(
            "Consolidated {} entries into {} in {:?}",
            result.entries_written,
            result.output_archive,
            result.elapsed
        );
        Ok(result)
    }

    /// Everything between lock acquisition and cleanup. `stage` tracks the current stage.
    fn run_stages(
        &self,
        layout: &ConsolidateLayout,
        stage: &mut ConsolidateStage,
    ) -> Result<(usize, OverlayPlan)> {
        *stage = ConsolidateStage::Init;
        self.emit(ConsolidateEvent::StageStarted {
            stage: *stage,
            source: layout.source_dir.clone(),
            target: Some(layout.staging_dir.clone()),
        });
        remove_dir_if_exists(&layout.output_dir)?;
        std::fs::create_dir_all(layout.output_dir.as_std_path())
            .map_err(Error::io_write(&layout.output_dir))?;
        let staging = StagingArea::create_fresh(&layout.staging_dir)?;

        self.check_cancelled()?;
        *stage = ConsolidateStage::UnpackAll;
        let plan = self.unpack_all(layout)?;

        self.check_cancelled()?;
        *stage = ConsolidateStage::Overlay;
        let plan = self.overlay(layout, plan, &staging)?;

        self.check_cancelled()?;
        *stage = ConsolidateStage::Repack;
        self.emit(ConsolidateEvent::StageStarted {
            stage: *stage,
            source: layout.staging_dir.clone(),
            target: Some(layout.output_archive.clone()),
        });
        let stats = repack(staging.root(), &layout.output_archive, |name, path| {
            self.emit(ConsolidateEvent::EntryProcessed {
                stage: ConsolidateStage::Repack,
                path: name.to_string(),
                source: path.to_path_buf(),
                replaced: false,
            })
        })?;

        *stage = ConsolidateStage::Cleanup;
        Ok((stats.entries_written, plan))
    }

    fn unpack_all(&self, layout: &ConsolidateLayout) -> Result<OverlayPlan> {
        let archives = discover_archives(&layout.source_dir, &self.options.archive_extension)?;
        tracing::info!("Found {} archives in {}", archives.len(), layout.source_dir);
        self.emit(ConsolidateEvent::StageStarted {
            stage: ConsolidateStage::UnpackAll,
            source: layout.source_dir.clone(),
            target: Some(layout.staging_dir.clone()),
        });

        let mut plan = OverlayPlan::new();
        let total = archives.len();
        for (index, archive) in archives.iter().enumerate() {
            self.emit(ConsolidateEvent::ArchiveStarted {
                archive: archive.clone(),
                staging_dir: layout.staging_dir.clone(),
                current: index + 1,
                total,
            });
            let count = plan.apply_archive(archive, |path, replaced| {
                self.emit(ConsolidateEvent::EntryProcessed {
                    stage: ConsolidateStage::UnpackAll,
                    path: path.to_string(),
                    source: archive.clone(),
                    replaced,
                })
            })?;
            tracing::info!("Applied {} entries from {}", count, archive);
        }
        Ok(plan)
    }

    fn overlay(
        &self,
        layout: &ConsolidateLayout,
        mut plan: OverlayPlan,
        staging: &StagingArea,
    ) -> Result<OverlayPlan> {
        self.emit(ConsolidateEvent::StageStarted {
            stage: ConsolidateStage::Overlay,
            source: layout.source_dir.clone(),
            target: Some(layout.staging_dir.clone()),
        });

        let applied = plan.apply_loose_files(
            &layout.source_dir,
            &self.options.archive_extension,
            |file, replaced| {
                self.emit(ConsolidateEvent::EntryProcessed {
                    stage: ConsolidateStage::Overlay,
                    path: file.logical_path.clone(),
                    source: file.path.clone(),
                    replaced,
                })
            },
        )?;
        tracing::info!("Applied {} loose files", applied);

        let written = materialize(&plan, staging, log_materialized)?;
        tracing::info!(
            "Staged {} assets ({} overrides) in {}",
            written,
            plan.overrides(),
            staging.root()
        );
        Ok(plan)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                tracing::info!("Cancellation requested");
                Err(Error::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// Emit a progress event if a reporter was registered.
    fn emit(&self, event: ConsolidateEvent) {
        if let Some(callback) = &self.reporter {
            callback(event);
        }
    }
}

fn log_materialized(path: &str, origin: &AssetOrigin) {
    match origin {
        AssetOrigin::ArchiveEntry { archive, .. } => {
            tracing::debug!("Staged {} from {}", path, archive)
        }
        AssetOrigin::LooseFile { path: file } => tracing::debug!("Staged {} from {}", path, file),
    }
}

fn cleanup_dir(dir: &Utf8Path) {
    if let Err(e) = remove_dir_if_exists(dir) {
        tracing::warn!("Cleanup failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(ConsolidateStage::UnpackAll.to_string(), "unpack");
        assert_eq!(ConsolidateStage::Cleanup.to_string(), "cleanup");
    }

    #[test]
    fn test_layout_rejects_bad_options() {
        let dir = tempfile::tempdir().unwrap();
        let options = ConsolidateOptions {
            output_file_name: "out/pak0.pak".to_string(),
            ..Default::default()
        };
        let consolidator = Consolidator::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
        )
        .with_options(options);

        assert!(matches!(consolidator.layout(), Err(Error::Config(_))));
    }

    #[test]
    fn test_cancel_before_unpack() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let source = root.join("id1");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("autoexec.cfg"), "exec").unwrap();

        let flag = Arc::new(AtomicBool::new(true));
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = events.clone();
        let err = Consolidator::new(&source)
            .with_cancel_flag(flag)
            .with_reporter(move |event| sink.lock().unwrap().push(event))
            .run()
            .unwrap_err();

        assert_eq!(err.stage, ConsolidateStage::Init);
        assert!(matches!(err.error, Error::Cancelled));
        assert!(!root.join("id1_temp").exists());
        assert!(!root.join("id1_consolidated").exists());
        assert!(!root.join("id1_consolidate.lock").exists());

        let events = events.lock().unwrap();
        assert!(!events
            .iter()
            .any(|e| matches!(e, ConsolidateEvent::ArchiveStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(ConsolidateEvent::StageStarted {
                stage: ConsolidateStage::Cleanup,
                ..
            })
        ));
    }
}
