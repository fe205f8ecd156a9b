//! camsift Event Log
//!
//! One canonical parsing interface over incompatible vendor motion logs:
//!
//! - [`parser`] — paginated `items[n].field=value` text batches, paired by
//!   a begin/end state machine (doorbell-style vendors).
//! - [`records`] — discrete JSON motion-file records with explicit
//!   start/end per record (PoE NVR-style vendors).
//!
//! Both produce the same chronological `Vec<MotionEvent>` through the
//! [`EventLogSource`] trait; the pipeline never sees vendor shapes.

pub mod parser;
pub mod records;

use camsift_common::error::CamsiftResult;
use camsift_event_model::{MotionEvent, TimeWindow};

/// Canonical interface for anything that can yield motion events.
///
/// Implementations take `&mut self` because vendor retrieval is typically
/// a stateful paginated session. An empty result is valid, not an error.
pub trait EventLogSource {
    fn motion_events(&mut self, window: &TimeWindow) -> CamsiftResult<Vec<MotionEvent>>;
}

pub use parser::{BatchLogParser, LogBatchSource, TextLogFile};
pub use records::RecordLogFile;
