//! camsift Detect — frame-level motion detection.
//!
//! Stateful reference-frame differencing over a decoded frame sequence:
//! - **Normalize:** resize, grayscale, blur each frame
//! - **Diff:** absolute difference against a periodically refreshed
//!   reference frame, binarize, dilate, extract connected regions
//! - **Annotate:** draw bounding boxes for surviving regions
//! - **Decide:** count motion-bearing frames against a qualification bar
//!
//! This crate is pure computation on `image` buffers — no I/O, no codecs.
//! The reference frame is owned by one `FrameDiffer` and never shared
//! across incidents.

pub mod contour;
pub mod differ;
pub mod frame_span;

pub use contour::MotionRegion;
pub use differ::{DetectionReport, DetectorConfig, FrameDiffer, FrameOutcome, FrameRecord, SkipReason};
pub use frame_span::{merge_motion_frames, FrameSpan};
