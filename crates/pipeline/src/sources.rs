//! Footage discovery.

use std::path::PathBuf;

use tracing::{debug, warn};

use camsift_common::error::CamsiftResult;
use camsift_event_model::{Segment, TimeWindow};

/// Where raw footage segments come from.
pub trait FootageSource {
    /// All segments whose wall-clock range overlaps the window, sorted by
    /// start time.
    fn find_segments(&mut self, window: &TimeWindow) -> CamsiftResult<Vec<Segment>>;
}

/// A directory of camera recordings named after their time range.
///
/// Files whose names carry no parseable timestamp range are ignored;
/// cameras drop index files and snapshots next to the footage.
#[derive(Debug, Clone)]
pub struct LocalFootage {
    pub dir: PathBuf,
}

impl LocalFootage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FootageSource for LocalFootage {
    fn find_segments(&mut self, window: &TimeWindow) -> CamsiftResult<Vec<Segment>> {
        let mut segments = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match Segment::from_path(&path) {
                Ok(segment) if segment.overlaps(window) => segments.push(segment),
                Ok(_) => {}
                Err(_) => debug!(path = %path.display(), "Not a footage segment"),
            }
        }

        segments.sort_by_key(|s| s.start);
        debug!(count = segments.len(), dir = %self.dir.display(), "Footage segments in window");
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_scans_and_filters_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2026-08-25_05.00.00-05.01.00.mp4",
            "2026-08-25_05.01.00-05.02.00.mp4",
            "2026-08-25_09.00.00-09.01.00.mp4",
            "index.dat",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 8, 25, 5, 0, 30).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 25, 5, 1, 30).unwrap(),
        );

        let mut source = LocalFootage::new(dir.path());
        let segments = source.find_segments(&window).unwrap();

        assert_eq!(segments.len(), 2);
        assert!(segments[0].start < segments[1].start);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let mut source = LocalFootage::new("/nonexistent/footage");
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 8, 25, 5, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 25, 6, 0, 0).unwrap(),
        );
        assert!(source.find_segments(&window).is_err());
    }
}
