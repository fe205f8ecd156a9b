//! camsift Event Model
//!
//! Typed data model for the motion pipeline:
//! - **MotionEvent:** smallest vendor-reported time-bounded motion episode
//! - **Incident:** consolidation of adjacent events within a gap tolerance
//! - **Segment:** one raw footage file with its wall-clock range
//!
//! This crate is pure data plus the consolidation algorithm — no I/O.

pub mod event;
pub mod incident;
pub mod segment;

pub use event::{MotionEvent, TimeWindow};
pub use incident::{consolidate, Incident};
pub use segment::Segment;
