//! Vendor-reported motion events and query windows.
//!
//! A `MotionEvent` is immutable once built: the log parser is the only
//! producer, and everything downstream treats the list as read-only.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Smallest vendor-reported time-bounded motion episode.
///
/// Invariant: `start <= end`. Constructors enforce it; deserialized values
/// are checked by the parser before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// Wall-clock start of the episode.
    pub start: DateTime<Utc>,

    /// Wall-clock end of the episode.
    pub end: DateTime<Utc>,

    /// Vendor region name, lowercased (e.g. "backyard").
    pub region: String,

    /// Vendor channel number.
    pub channel: u32,

    /// Vendor event type, lowercased (e.g. "motion detect").
    pub kind: String,
}

impl MotionEvent {
    /// Create an event from an explicit start/end pair.
    ///
    /// Swaps the endpoints if the vendor delivered them reversed, so the
    /// `start <= end` invariant always holds.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        region: impl Into<String>,
        channel: u32,
        kind: impl Into<String>,
    ) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            region: region.into().to_lowercase(),
            channel,
            kind: kind.into().to_lowercase(),
        }
    }

    /// Create an event from an end time only, estimating the start with a
    /// lookbehind. Used when a vendor window opens mid-episode and the
    /// first record is an end marker.
    pub fn from_end(
        end: DateTime<Utc>,
        lookbehind_secs: i64,
        region: impl Into<String>,
        channel: u32,
        kind: impl Into<String>,
    ) -> Self {
        Self::new(
            end - Duration::seconds(lookbehind_secs),
            end,
            region,
            channel,
            kind,
        )
    }

    /// Episode length in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// Half-open query window handed to event and footage sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window ending now and reaching back `minutes`.
    pub fn last_minutes(minutes: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::minutes(minutes),
            end,
        }
    }

    /// Whether a `[start, end]` range overlaps this window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, 12, secs / 60, secs % 60)
            .unwrap()
    }

    #[test]
    fn test_reversed_endpoints_are_swapped() {
        let event = MotionEvent::new(ts(30), ts(10), "yard", 0, "Motion Detect");
        assert!(event.start <= event.end);
        assert_eq!(event.duration_secs(), 20);
    }

    #[test]
    fn test_from_end_applies_lookbehind() {
        let event = MotionEvent::from_end(ts(90), 60, "porch", 1, "Motion Detect");
        assert_eq!(event.end, ts(90));
        assert_eq!(event.start, ts(30));
    }

    #[test]
    fn test_metadata_is_lowercased() {
        let event = MotionEvent::new(ts(0), ts(5), "Backyard", 2, "Motion Detect");
        assert_eq!(event.region, "backyard");
        assert_eq!(event.kind, "motion detect");
    }

    #[test]
    fn test_window_overlap() {
        let window = TimeWindow::new(ts(100), ts(200));
        assert!(window.overlaps(ts(150), ts(250)));
        assert!(window.overlaps(ts(50), ts(150)));
        assert!(!window.overlaps(ts(200), ts(300)));
        assert!(!window.overlaps(ts(0), ts(100)));
    }
}
