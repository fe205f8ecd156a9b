//! The frame differencer: per-frame motion scoring for one incident.
//!
//! # Algorithm
//!
//! 1. **Normalize** each decoded frame: resize to a fixed target width
//!    (aspect preserved), grayscale, Gaussian blur.
//! 2. The first normalized frame becomes the reference; it scores zero.
//! 3. Later frames diff against the reference, binarize, dilate, and
//!    extract connected regions; small regions are dropped, optionally
//!    deduplicated by shape, and the survivors are boxed onto a copy of
//!    the frame.
//! 4. Every `ref_frame_turnover` frames the reference is replaced with the
//!    current frame. The frame right after a reset diffs against fresh
//!    content, which produces a known one-frame false-positive spike;
//!    that is accepted behavior and deliberately not smoothed.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use camsift_common::error::{CamsiftError, CamsiftResult};

use crate::contour::{self, ShapeSignature};
use crate::frame_span::{merge_motion_frames, FrameSpan};

/// Configuration for the frame differencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Width every frame is resized to before differencing.
    pub target_width: u32,

    /// Gaussian blur sigma applied after grayscale conversion.
    pub blur_sigma: f32,

    /// Pixel-delta binarization threshold. Valid range 1..=254.
    pub threshold: u8,

    /// Minimum connected-region area in pixels.
    pub min_area: u32,

    /// An incident qualifies only when strictly more than this many
    /// frames carry at least one motion region.
    pub min_frames: u32,

    /// Replace the reference frame every this many scored frames.
    pub ref_frame_turnover: u32,

    /// Deduplicate regions against every shape retained so far in the
    /// incident, suppressing the same static object recounting as new.
    pub unique_only: bool,

    /// Minimum shape distance for a region to count as new when
    /// `unique_only` is set. Historical tuning value; calibration is
    /// undocumented, so it stays caller-tunable.
    pub shape_distance_limit: f64,

    /// Frame-count gap tolerance when merging motion-bearing frames into
    /// contiguous spans.
    pub span_gap_frames: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_width: 640,
            blur_sigma: 3.5,
            threshold: 25,
            min_area: 500,
            min_frames: 10,
            ref_frame_turnover: 20,
            unique_only: false,
            shape_distance_limit: 10.0,
            span_gap_frames: 10,
        }
    }
}

impl DetectorConfig {
    /// Fail fast on values no later stage can repair.
    pub fn validate(&self) -> CamsiftResult<()> {
        if self.threshold == 0 || self.threshold > 254 {
            return Err(CamsiftError::config(format!(
                "threshold must be in 1..=254, got {}",
                self.threshold
            )));
        }
        if self.target_width == 0 {
            return Err(CamsiftError::config("target_width must be positive"));
        }
        if self.ref_frame_turnover == 0 {
            return Err(CamsiftError::config("ref_frame_turnover must be positive"));
        }
        if self.blur_sigma <= 0.0 {
            return Err(CamsiftError::config(format!(
                "blur_sigma must be positive, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}

/// Why a frame was excluded from scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Zero-sized frame buffer.
    EmptyFrame,
    /// Frame too small to survive normalization.
    Undersized { width: u32, height: u32 },
    /// Normalized geometry disagrees with the incident's reference frame
    /// (the source changed aspect ratio mid-sequence).
    DimensionMismatch { width: u32, height: u32 },
}

/// Outcome of processing one decoded frame.
#[derive(Debug)]
pub enum FrameOutcome {
    Processed(FrameRecord),
    Skipped(SkipReason),
}

/// One scored frame.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Position within the incident's scored sequence.
    pub index: u32,

    /// Normalized frame with bounding boxes drawn.
    pub annotated: RgbImage,

    /// Number of motion regions drawn.
    pub region_count: u32,
}

/// Stateful per-incident motion detector.
///
/// The reference frame and retained shape set belong to exactly one
/// incident; build a fresh differ per incident.
pub struct FrameDiffer {
    config: DetectorConfig,
    reference: Option<GrayImage>,
    retained: Vec<ShapeSignature>,
    next_index: u32,
}

impl FrameDiffer {
    /// Create a differ, validating configuration up front.
    pub fn new(config: DetectorConfig) -> CamsiftResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            reference: None,
            retained: Vec::new(),
            next_index: 0,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Resize, grayscale, and blur a frame, or say why it cannot be used.
    fn normalize(&self, frame: &RgbImage) -> Result<(RgbImage, GrayImage), SkipReason> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(SkipReason::EmptyFrame);
        }

        let target_w = self.config.target_width;
        let target_h =
            ((height as u64 * target_w as u64) / width as u64).min(u32::MAX as u64) as u32;
        if target_h == 0 {
            return Err(SkipReason::Undersized { width, height });
        }

        let resized = imageops::resize(frame, target_w, target_h, FilterType::Triangle);
        let gray = imageops::blur(&imageops::grayscale(&resized), self.config.blur_sigma);
        Ok((resized, gray))
    }

    /// Score one frame against the current reference.
    pub fn process(&mut self, frame: &RgbImage) -> FrameOutcome {
        let (mut annotated, gray) = match self.normalize(frame) {
            Ok(pair) => pair,
            Err(reason) => {
                debug!(?reason, "Skipping frame");
                return FrameOutcome::Skipped(reason);
            }
        };

        // Normalization fixes the width but derives the height from the
        // source aspect ratio; a frame that no longer matches the
        // reference geometry cannot be diffed against it.
        if let Some(reference) = self.reference.as_ref() {
            if reference.dimensions() != gray.dimensions() {
                let (width, height) = gray.dimensions();
                debug!(width, height, "Skipping frame with mismatched geometry");
                return FrameOutcome::Skipped(SkipReason::DimensionMismatch { width, height });
            }
        }

        let index = self.next_index;
        self.next_index += 1;

        let Some(reference) = self.reference.as_ref() else {
            // No prior baseline: adopt and emit zero motion.
            self.reference = Some(gray);
            return FrameOutcome::Processed(FrameRecord {
                index,
                annotated,
                region_count: 0,
            });
        };

        let diff = contour::abs_diff(reference, &gray);
        let regions = contour::find_regions(&diff, self.config.threshold, self.config.min_area);

        let mut drawn = 0;
        for region in &regions {
            if self.config.unique_only {
                let is_new = self
                    .retained
                    .iter()
                    .all(|seen| region.signature.distance(seen) >= self.config.shape_distance_limit);
                if !is_new {
                    continue;
                }
                self.retained.push(region.signature);
            }
            contour::draw_bounding_box(&mut annotated, region, 2);
            drawn += 1;
        }

        trace!(index, regions = drawn, "Frame scored");

        // Periodic reference turnover. The current frame was scored
        // against the old baseline first; the next frame diffs against
        // this one.
        if index % self.config.ref_frame_turnover == 0 {
            self.reference = Some(gray);
        }

        FrameOutcome::Processed(FrameRecord {
            index,
            annotated,
            region_count: drawn,
        })
    }

    /// Run the differ over an entire decoded sequence.
    pub fn run<'a>(&mut self, frames: impl IntoIterator<Item = &'a RgbImage>) -> DetectionReport {
        let mut records = Vec::new();
        let mut skipped = 0u32;

        for frame in frames {
            match self.process(frame) {
                FrameOutcome::Processed(record) => records.push(record),
                FrameOutcome::Skipped(_) => skipped += 1,
            }
        }

        DetectionReport { records, skipped }
    }
}

/// Per-incident detection output.
#[derive(Debug)]
pub struct DetectionReport {
    /// Ordered scored frames.
    pub records: Vec<FrameRecord>,

    /// Frames excluded by normalization.
    pub skipped: u32,
}

impl DetectionReport {
    /// Number of frames carrying at least one motion region.
    pub fn motion_frame_count(&self) -> u32 {
        self.records.iter().filter(|r| r.region_count > 0).count() as u32
    }

    /// Qualification rule: strictly more motion frames than `min_frames`.
    pub fn qualifies(&self, min_frames: u32) -> bool {
        self.motion_frame_count() > min_frames
    }

    /// Contiguous motion-bearing frame spans, merged with the same
    /// gap-tolerance rule used for wall-clock incidents.
    pub fn motion_spans(&self, gap_frames: u32) -> Vec<FrameSpan> {
        let indices: Vec<u32> = self
            .records
            .iter()
            .filter(|r| r.region_count > 0)
            .map(|r| r.index)
            .collect();
        merge_motion_frames(&indices, gap_frames)
    }

    /// The overall motion extent: first to last motion-bearing frame.
    pub fn motion_extent(&self, gap_frames: u32) -> Option<FrameSpan> {
        let spans = self.motion_spans(gap_frames);
        match (spans.first(), spans.last()) {
            (Some(first), Some(last)) => Some(FrameSpan::new(first.start, last.end)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn config() -> DetectorConfig {
        DetectorConfig {
            target_width: 64,
            blur_sigma: 0.8,
            threshold: 25,
            min_area: 30,
            min_frames: 10,
            ref_frame_turnover: 20,
            unique_only: false,
            shape_distance_limit: 10.0,
            span_gap_frames: 3,
        }
    }

    fn blank() -> RgbImage {
        RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]))
    }

    fn with_square(x: u32, y: u32) -> RgbImage {
        let mut frame = blank();
        for py in y..y + 16 {
            for px in x..x + 16 {
                frame.put_pixel(px, py, Rgb([255, 255, 255]));
            }
        }
        frame
    }

    /// 30-frame sequence with motion (a white square) only at the given
    /// frame indices; all other frames match the baseline.
    fn sequence(motion_frames: &[u32]) -> Vec<RgbImage> {
        (0..30)
            .map(|i| {
                if motion_frames.contains(&i) {
                    with_square(20, 20)
                } else {
                    blank()
                }
            })
            .collect()
    }

    #[test]
    fn test_first_frame_is_baseline() {
        let mut differ = FrameDiffer::new(config()).unwrap();
        let frames = sequence(&[]);
        let report = differ.run(frames.iter());
        assert_eq!(report.records.len(), 30);
        assert_eq!(report.records[0].region_count, 0);
        assert_eq!(report.motion_frame_count(), 0);
    }

    #[test]
    fn test_too_few_motion_frames_rejected() {
        // Motion in frames 10..=14 only: 5 motion frames <= min_frames 10.
        let frames = sequence(&[10, 11, 12, 13, 14]);
        let mut differ = FrameDiffer::new(config()).unwrap();
        let report = differ.run(frames.iter());
        assert_eq!(report.motion_frame_count(), 5);
        assert!(!report.qualifies(10));
    }

    #[test]
    fn test_enough_motion_frames_qualify() {
        // Motion in frames 2..=17: 16 motion frames > min_frames 10.
        let motion: Vec<u32> = (2..=17).collect();
        let frames = sequence(&motion);
        let mut differ = FrameDiffer::new(config()).unwrap();
        let report = differ.run(frames.iter());
        assert_eq!(report.motion_frame_count(), 16);
        assert!(report.qualifies(10));

        let extent = report.motion_extent(3).unwrap();
        assert_eq!(extent.start, 2);
        assert_eq!(extent.end, 17);
    }

    #[test]
    fn test_reference_turnover_rebases_scoring() {
        // Square appears at frame 20 and stays. With turnover 20, frame 20
        // is scored against frame 0 (motion), then becomes the reference,
        // so frame 21 diffs against identical content and scores zero.
        let motion: Vec<u32> = (20..30).collect();
        let frames = sequence(&motion);
        let mut differ = FrameDiffer::new(config()).unwrap();
        let report = differ.run(frames.iter());

        assert!(report.records[20].region_count > 0);
        assert_eq!(report.records[21].region_count, 0);
    }

    #[test]
    fn test_min_frames_monotonicity() {
        let motion: Vec<u32> = (5..=20).collect();
        let frames = sequence(&motion);
        let mut differ = FrameDiffer::new(config()).unwrap();
        let report = differ.run(frames.iter());

        // Raising the bar can only flip qualification off, never on.
        for low in 0..20u32 {
            for high in low..20u32 {
                if report.qualifies(high) {
                    assert!(report.qualifies(low));
                }
            }
        }
    }

    #[test]
    fn test_min_area_monotonicity() {
        let motion: Vec<u32> = (5..=20).collect();
        let frames = sequence(&motion);

        let loose = FrameDiffer::new(DetectorConfig {
            min_area: 10,
            ..config()
        })
        .unwrap()
        .run(frames.iter())
        .motion_frame_count();

        let strict = FrameDiffer::new(DetectorConfig {
            min_area: 1000,
            ..config()
        })
        .unwrap()
        .run(frames.iter())
        .motion_frame_count();

        assert!(strict <= loose);
    }

    #[test]
    fn test_unique_only_suppresses_static_shape() {
        // The same square in the same place every frame: unique-only mode
        // counts it once, then treats the recurring shape as known.
        let motion: Vec<u32> = (1..10).collect();
        let frames = sequence(&motion);

        let mut differ = FrameDiffer::new(DetectorConfig {
            unique_only: true,
            shape_distance_limit: 0.05,
            ..config()
        })
        .unwrap();
        let report = differ.run(frames.iter());
        assert_eq!(report.motion_frame_count(), 1);

        let mut differ = FrameDiffer::new(config()).unwrap();
        let report = differ.run(frames.iter());
        assert_eq!(report.motion_frame_count(), 9);
    }

    #[test]
    fn test_empty_frame_skipped_with_reason() {
        let mut differ = FrameDiffer::new(config()).unwrap();
        let empty = RgbImage::new(0, 0);
        match differ.process(&empty) {
            FrameOutcome::Skipped(SkipReason::EmptyFrame) => {}
            other => panic!("expected EmptyFrame skip, got {:?}", other),
        }
    }

    #[test]
    fn test_aspect_change_skipped_not_scored() {
        // At target width 64, a 64x64 frame normalizes to 64x64 and a
        // 128x64 frame to 64x32; the latter cannot be diffed against the
        // established reference.
        let mut differ = FrameDiffer::new(config()).unwrap();
        assert!(matches!(differ.process(&blank()), FrameOutcome::Processed(_)));

        let wide = RgbImage::from_pixel(128, 64, Rgb([0, 0, 0]));
        match differ.process(&wide) {
            FrameOutcome::Skipped(SkipReason::DimensionMismatch {
                width: 64,
                height: 32,
            }) => {}
            other => panic!("expected dimension-mismatch skip, got {:?}", other),
        }

        // A conforming frame still scores against the original reference.
        match differ.process(&with_square(20, 20)) {
            FrameOutcome::Processed(record) => assert!(record.region_count > 0),
            other => panic!("expected processed frame, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_threshold_fails_fast() {
        let bad = DetectorConfig {
            threshold: 255,
            ..config()
        };
        assert!(FrameDiffer::new(bad).is_err());

        let bad = DetectorConfig {
            threshold: 0,
            ..config()
        };
        assert!(FrameDiffer::new(bad).is_err());
    }

    #[test]
    fn test_motion_spans_merge_across_small_gaps() {
        let frames = sequence(&[5, 6, 7, 10, 11, 25, 26]);
        let mut differ = FrameDiffer::new(config()).unwrap();
        let report = differ.run(frames.iter());

        // Gap 10->7 = 3 merges at tolerance 3; 25->11 = 14 splits.
        let spans = report.motion_spans(3);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], FrameSpan::new(5, 11));
        assert_eq!(spans[1], FrameSpan::new(25, 26));
    }
}
