//! Frame-index span merging.
//!
//! The same gap-tolerance rule used to merge wall-clock events into
//! incidents, applied to frame indices: sorted motion-bearing frames whose
//! gap to the open span's end is at most the tolerance (inclusive) merge.

use serde::{Deserialize, Serialize};

/// An inclusive run of frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpan {
    pub start: u32,
    pub end: u32,
}

impl FrameSpan {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Number of frames covered, endpoints included.
    pub fn frame_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// Merge sorted motion-frame indices into contiguous spans.
///
/// A frame joins the open span when `frame - span.end <= gap`; a gap
/// exactly equal to the tolerance still merges. Unsorted input is sorted
/// and deduplicated first.
pub fn merge_motion_frames(frames: &[u32], gap: u32) -> Vec<FrameSpan> {
    let mut sorted: Vec<u32> = frames.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut spans: Vec<FrameSpan> = Vec::new();
    for &frame in &sorted {
        match spans.last_mut() {
            Some(open) if frame - open.end <= gap => open.end = frame,
            _ => spans.push(FrameSpan::new(frame, frame)),
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(merge_motion_frames(&[], 5).is_empty());
    }

    #[test]
    fn test_single_frame() {
        let spans = merge_motion_frames(&[7], 5);
        assert_eq!(spans, vec![FrameSpan::new(7, 7)]);
    }

    #[test]
    fn test_gap_at_tolerance_merges() {
        let spans = merge_motion_frames(&[0, 5], 5);
        assert_eq!(spans, vec![FrameSpan::new(0, 5)]);
    }

    #[test]
    fn test_gap_past_tolerance_splits() {
        let spans = merge_motion_frames(&[0, 6], 5);
        assert_eq!(spans, vec![FrameSpan::new(0, 0), FrameSpan::new(6, 6)]);
    }

    #[test]
    fn test_mixed_runs() {
        let spans = merge_motion_frames(&[1, 2, 3, 10, 11, 30], 3);
        assert_eq!(
            spans,
            vec![
                FrameSpan::new(1, 3),
                FrameSpan::new(10, 11),
                FrameSpan::new(30, 30),
            ]
        );
    }

    #[test]
    fn test_unsorted_duplicated_input() {
        let spans = merge_motion_frames(&[11, 2, 3, 2, 1, 10], 3);
        assert_eq!(spans, vec![FrameSpan::new(1, 3), FrameSpan::new(10, 11)]);
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(FrameSpan::new(5, 20).frame_count(), 16);
        assert_eq!(FrameSpan::new(9, 9).frame_count(), 1);
    }
}
