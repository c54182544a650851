//! Quake gamedir consolidation.
//!
//! A Quake gamedir layers its assets: `pak0.pak`, `pak1.pak`, ... are mounted in
//! ascending name order and loose files in the directory override all of them.
//! This crate resolves that layering into one archive holding exactly the
//! assets the engine would see.
//!
//! # Architecture
//!
//! - [`OverlayPlan`] maps each logical path to the source that wins it.
//!   Precedence is decided here, in memory.
//! - [`stage`] writes the winners to a staging directory.
//! - [`repack`](repack::repack) encodes the staging directory as a single PAK.
//! - [`Consolidator`] runs the stages in order, reports progress, and cleans
//!   up the staging directory whether the run succeeds or fails.
//!
//! # Usage
//!
//! ```no_run
//! use qk_consolidate::Consolidator;
//!
//! let result = Consolidator::new("quake/id1")
//!     .with_reporter(|event| println!("{event:?}"))
//!     .run()?;
//! println!("{} entries in {}", result.entries_written, result.output_archive);
//! # Ok::<(), qk_consolidate::ConsolidateError>(())
//! ```

pub mod consolidator;
pub mod discover;
pub mod error;
mod lock;
pub mod options;
pub mod plan;
pub mod repack;
pub mod stage;
pub mod utils;

pub use consolidator::{ConsolidateEvent, ConsolidateResult, ConsolidateStage, Consolidator};
pub use discover::{discover_archives, discover_loose_files, LooseFile};
pub use error::{ConsolidateError, Error, Result};
pub use options::{ConsolidateLayout, ConsolidateOptions};
pub use plan::{AssetOrigin, OverlayPlan};
pub use repack::{repack, RepackStats};
pub use stage::StagingArea;
