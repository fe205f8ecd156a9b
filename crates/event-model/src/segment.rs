//! Raw footage segments and boundary-trim arithmetic.
//!
//! Cameras name recorded files after their wall-clock range, e.g.
//! `2026-08-25_05.00.01-05.01.00.mp4`. That embedded range is the only
//! timing metadata the assembler needs: segment boundaries drive both
//! window-overlap matching and first/last-segment trimming.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;

use camsift_common::error::{CamsiftError, CamsiftResult};

use crate::event::TimeWindow;

/// One raw footage file with its wall-clock range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Date, then start and end times with either ':' or '.' separators.
        Regex::new(
            r"(\d{4})-(\d{2})-(\d{2})_(\d{2})[:.](\d{2})[:.](\d{2})-(\d{2})[:.](\d{2})[:.](\d{2})",
        )
        .expect("segment filename regex")
    })
}

impl Segment {
    pub fn new(path: impl Into<PathBuf>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            start,
            end,
        }
    }

    /// Parse the wall-clock range embedded in a segment filename.
    ///
    /// An end time earlier than the start time means the segment crossed
    /// midnight; the end date rolls forward one day.
    pub fn from_path(path: impl AsRef<Path>) -> CamsiftResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CamsiftError::parse(format!("segment path has no filename: {:?}", path)))?;

        let caps = filename_regex().captures(name).ok_or_else(|| {
            CamsiftError::parse(format!("no timestamp range in segment filename: {name}"))
        })?;

        let field = |i: usize| caps[i].parse::<u32>().expect("regex digit group");

        let date = NaiveDate::from_ymd_opt(caps[1].parse().expect("year"), field(2), field(3))
            .ok_or_else(|| CamsiftError::parse(format!("invalid date in filename: {name}")))?;
        let start_time = NaiveTime::from_hms_opt(field(4), field(5), field(6))
            .ok_or_else(|| CamsiftError::parse(format!("invalid start time in filename: {name}")))?;
        let end_time = NaiveTime::from_hms_opt(field(7), field(8), field(9))
            .ok_or_else(|| CamsiftError::parse(format!("invalid end time in filename: {name}")))?;

        let start = Utc.from_utc_datetime(&date.and_time(start_time));
        let mut end = Utc.from_utc_datetime(&date.and_time(end_time));
        if end < start {
            end += Duration::days(1);
        }

        Ok(Self::new(path, start, end))
    }

    /// Segment length in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Whether this segment overlaps the given window at all.
    pub fn overlaps(&self, window: &TimeWindow) -> bool {
        window.overlaps(self.start, self.end)
    }

    /// In-segment offsets that align this segment with the desired window.
    ///
    /// Returns `(start_offset_secs, end_offset_secs)` measured from the
    /// segment's own start: seek to the first, stop at the second when
    /// present. Interior segments of a window yield `(0.0, None)` — only
    /// boundary segments get trimmed.
    pub fn trim_offsets(&self, window: &TimeWindow) -> (f64, Option<f64>) {
        let start_offset = if window.start > self.start {
            (window.start - self.start).num_milliseconds() as f64 / 1000.0
        } else {
            0.0
        };

        let end_offset = if self.end > window.end {
            Some((window.end - self.start).num_milliseconds() as f64 / 1000.0)
        } else {
            None
        };

        (start_offset, end_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_dotted_filename() {
        let seg = Segment::from_path("/tmp/2026-08-25_05.00.01-05.01.00.mp4").unwrap();
        assert_eq!(seg.start, at(5, 0, 1));
        assert_eq!(seg.end, at(5, 1, 0));
    }

    #[test]
    fn test_parse_colon_filename() {
        let seg = Segment::from_path("/tmp/2026-08-25_05:00:01-05:01:00.mp4").unwrap();
        assert_eq!(seg.start, at(5, 0, 1));
    }

    #[test]
    fn test_cross_midnight_rolls_end_date() {
        let seg = Segment::from_path("/tmp/2026-08-25_23.59.30-00.00.30.mp4").unwrap();
        assert_eq!(seg.start, at(23, 59, 30));
        assert_eq!(
            seg.end,
            Utc.with_ymd_and_hms(2026, 8, 26, 0, 0, 30).unwrap()
        );
        assert!((seg.duration_secs() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unparseable_filename_is_parse_error() {
        let err = Segment::from_path("/tmp/notes.txt").unwrap_err();
        assert!(matches!(err, CamsiftError::Parse { .. }));
    }

    #[test]
    fn test_interior_segment_untouched() {
        let seg = Segment::new("a.mp4", at(5, 1, 0), at(5, 2, 0));
        let window = TimeWindow::new(at(5, 0, 0), at(5, 10, 0));
        assert_eq!(seg.trim_offsets(&window), (0.0, None));
    }

    #[test]
    fn test_first_segment_trimmed_from_start() {
        let seg = Segment::new("a.mp4", at(5, 0, 0), at(5, 1, 0));
        let window = TimeWindow::new(at(5, 0, 30), at(5, 10, 0));
        let (start, end) = seg.trim_offsets(&window);
        assert!((start - 30.0).abs() < f64::EPSILON);
        assert_eq!(end, None);
    }

    #[test]
    fn test_last_segment_trimmed_from_end() {
        let seg = Segment::new("a.mp4", at(5, 9, 0), at(5, 11, 0));
        let window = TimeWindow::new(at(5, 0, 0), at(5, 10, 0));
        let (start, end) = seg.trim_offsets(&window);
        assert_eq!(start, 0.0);
        assert!((end.unwrap() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overlap_matching() {
        let seg = Segment::new("a.mp4", at(5, 0, 0), at(5, 1, 0));
        assert!(seg.overlaps(&TimeWindow::new(at(5, 0, 30), at(5, 2, 0))));
        assert!(!seg.overlaps(&TimeWindow::new(at(5, 1, 0), at(5, 2, 0))));
    }
}
