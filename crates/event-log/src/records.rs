//! Discrete JSON motion-record adapter.
//!
//! NVR-style vendors return the motion index as a list of file records
//! with explicit start/end per record, so no begin/end pairing is needed —
//! only deserialization, ordering, and window filtering.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use camsift_common::error::CamsiftResult;
use camsift_event_model::{MotionEvent, TimeWindow};

use crate::EventLogSource;

/// One vendor motion-file record.
#[derive(Debug, Clone, Deserialize)]
pub struct MotionRecord {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// Remote footage filename associated with the episode, when known.
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub channel: Option<u32>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl From<MotionRecord> for MotionEvent {
    fn from(record: MotionRecord) -> Self {
        MotionEvent::new(
            record.start,
            record.end,
            record.region.unwrap_or_default(),
            record.channel.unwrap_or(0),
            record.kind.unwrap_or_else(|| "motion detect".to_string()),
        )
    }
}

/// Parse a JSON array of motion records into chronological events.
pub fn parse_records(json: &str) -> CamsiftResult<Vec<MotionEvent>> {
    let records: Vec<MotionRecord> = serde_json::from_str(json)?;
    let mut events: Vec<MotionEvent> = records.into_iter().map(Into::into).collect();
    events.sort_by_key(|e| e.start);
    Ok(events)
}

/// A JSON record dump in a local file.
#[derive(Debug, Clone)]
pub struct RecordLogFile {
    pub path: PathBuf,
}

impl RecordLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EventLogSource for RecordLogFile {
    fn motion_events(&mut self, window: &TimeWindow) -> CamsiftResult<Vec<MotionEvent>> {
        let json = std::fs::read_to_string(&self.path)?;
        let mut events = parse_records(&json)?;
        events.retain(|e| window.overlaps(e.start, e.end));
        debug!(count = events.len(), "Motion records in window");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_sort() {
        let json = r#"[
            {"start": "2026-08-25T10:05:00Z", "end": "2026-08-25T10:05:30Z"},
            {"start": "2026-08-25T10:00:00Z", "end": "2026-08-25T10:00:30Z",
             "region": "Porch", "channel": 1, "type": "Motion Detect",
             "filename": "rec_001.mp4"}
        ]"#;

        let events = parse_records(json).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].start < events[1].start);
        assert_eq!(events[0].region, "porch");
        assert_eq!(events[0].channel, 1);
    }

    #[test]
    fn test_reversed_record_endpoints_normalized() {
        let json = r#"[
            {"start": "2026-08-25T10:05:30Z", "end": "2026-08-25T10:05:00Z"}
        ]"#;
        let events = parse_records(json).unwrap();
        assert!(events[0].start <= events[0].end);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_records("not json").is_err());
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(parse_records("[]").unwrap().is_empty());
    }
}
