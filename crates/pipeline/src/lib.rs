//! camsift Pipeline — orchestration of the full motion review flow.
//!
//! Glues the other crates together: event collection (`camsift-event-log`),
//! consolidation (`camsift-event-model`), frame scoring (`camsift-detect`),
//! and clip assembly (`camsift-assemble`). The sources behind a run are
//! trait objects so the CLI and tests can swap in local files.

pub mod run;
pub mod sources;

pub use run::{MotionPipeline, PipelineConfig, RunOutcome};
pub use sources::{FootageSource, LocalFootage};
