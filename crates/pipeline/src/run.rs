//! End-to-end pipeline run.
//!
//! One run covers one review window: collect vendor motion events,
//! consolidate them into incidents, assemble the matching footage per
//! incident, score the frames, develop drawn clips for qualifying
//! incidents, and join everything into a single reviewable artifact.
//!
//! Configuration problems abort the run immediately. Everything else is
//! contained at the incident boundary: a segment that will not decode or
//! an incident whose footage is missing is logged and skipped, and the
//! run carries on with the rest.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn};

use camsift_assemble as assemble;
use camsift_assemble::{AssemblyConfig, DrawnClip};
use camsift_common::error::{CamsiftError, CamsiftResult};
use camsift_detect::{DetectorConfig, FrameDiffer};
use camsift_event_log::EventLogSource;
use camsift_event_model::{consolidate, Incident, TimeWindow};

use crate::sources::FootageSource;

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Camera identity, prefixed onto every artifact name so runs for
    /// different cameras can share an output directory.
    pub camera: String,

    /// Gap tolerance when merging events into incidents, in seconds.
    pub gap_tolerance_secs: i64,

    pub detector: DetectorConfig,
    pub assembly: AssemblyConfig,

    /// Where finished artifacts land.
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    pub fn validate(&self) -> CamsiftResult<()> {
        if self.camera.trim().is_empty() {
            return Err(CamsiftError::config("camera name must not be empty"));
        }
        if self.gap_tolerance_secs < 0 {
            return Err(CamsiftError::config(
                "gap_tolerance_secs must not be negative",
            ));
        }
        self.detector.validate()?;
        self.assembly.validate()?;
        Ok(())
    }
}

/// What one pipeline run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Whether any incident passed the motion bar.
    pub qualifies: bool,

    /// Final joined clip, present only when something qualified.
    pub artifact: Option<PathBuf>,

    /// Total duration of the developed clips in seconds.
    pub total_duration_secs: Option<f64>,

    /// Incidents that passed the motion bar; zero when nothing qualified.
    pub incident_count: usize,

    /// Incidents examined but discarded.
    pub discarded_count: usize,
}

impl RunOutcome {
    fn discarded(discarded_count: usize) -> Self {
        Self {
            qualifies: false,
            artifact: None,
            total_duration_secs: None,
            incident_count: 0,
            discarded_count,
        }
    }

    /// Human-readable one-line summary for notifications.
    pub fn summary(&self) -> String {
        if !self.qualifies {
            return format!(
                "No motion worth reviewing ({} incident(s) discarded)",
                self.discarded_count
            );
        }

        let total = self.total_duration_secs.unwrap_or(0.0);
        let minutes = (total / 60.0) as u64;
        let seconds = (total % 60.0).round() as u64;
        format!(
            "{count} incident(s) with motion, {count} clip(s) joined. Total duration: {minutes}m{seconds}s",
            count = self.incident_count,
        )
    }
}

/// The orchestrator: owns the event and footage sources for one camera.
pub struct MotionPipeline<E, F> {
    config: PipelineConfig,
    events: E,
    footage: F,
}

impl<E: EventLogSource, F: FootageSource> MotionPipeline<E, F> {
    pub fn new(config: PipelineConfig, events: E, footage: F) -> CamsiftResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            events,
            footage,
        })
    }

    /// Run the full pipeline over one review window.
    pub fn run(&mut self, window: &TimeWindow) -> CamsiftResult<RunOutcome> {
        let events = {
            let _span = info_span!("collect_events").entered();
            self.events.motion_events(window)?
        };
        info!(count = events.len(), "Motion events in window");

        let incidents = consolidate(&events, self.config.gap_tolerance_secs);
        info!(count = incidents.len(), "Consolidated incidents");
        if incidents.is_empty() {
            return Ok(RunOutcome::discarded(0));
        }

        let segments = self.footage.find_segments(window)?;
        if segments.is_empty() {
            warn!("No footage covers the review window");
            return Ok(RunOutcome::discarded(incidents.len()));
        }

        std::fs::create_dir_all(&self.config.output_dir)?;

        let mut drawn: Vec<DrawnClip> = Vec::new();
        for (i, incident) in incidents.iter().enumerate() {
            let span = info_span!("incident", index = i).entered();
            match self.develop_incident(incident, &segments) {
                Ok(Some(clip)) => drawn.push(clip),
                Ok(None) => {}
                Err(err) => {
                    error!(error = %err, start = %incident.start, "Incident failed, skipping");
                }
            }
            drop(span);
        }

        if drawn.is_empty() {
            return Ok(RunOutcome::discarded(incidents.len()));
        }

        let artifact = self
            .config
            .output_dir
            .join(artifact_file_name(&self.config.camera, window));
        let clip_paths: Vec<PathBuf> = drawn.iter().map(|c| c.path.clone()).collect();
        assemble::concat_clips(&clip_paths, &artifact)?;

        let total: f64 = drawn.iter().map(|c| c.duration_secs).sum();
        info!(
            artifact = %artifact.display(),
            clips = drawn.len(),
            total_duration_secs = total,
            "Pipeline run complete"
        );

        Ok(RunOutcome {
            qualifies: true,
            artifact: Some(artifact),
            total_duration_secs: Some(total),
            incident_count: drawn.len(),
            discarded_count: incidents.len() - drawn.len(),
        })
    }

    /// Assemble, score, and develop one incident.
    ///
    /// Returns `Ok(None)` when the incident has no usable footage or does
    /// not pass the motion bar.
    fn develop_incident(
        &self,
        incident: &Incident,
        segments: &[camsift_event_model::Segment],
    ) -> CamsiftResult<Option<DrawnClip>> {
        let window = TimeWindow::new(incident.start, incident.end);
        let staging = tempfile::tempdir()?;

        let assembled = staging.path().join("incident.mp4");
        let Some(assembled) =
            assemble::assemble_window(segments, &window, &self.config.assembly, &assembled)?
        else {
            warn!(start = %incident.start, "Incident has no usable footage");
            return Ok(None);
        };

        let frames_dir = staging.path().join("frames");
        let frame_paths = assemble::extract_frames(&assembled, &frames_dir)?;
        let frames = load_frames(&frame_paths)?;

        let mut differ = FrameDiffer::new(self.config.detector.clone())?;
        let report = differ.run(frames.iter());
        let motion_frames = report.motion_frame_count();

        if !report.qualifies(self.config.detector.min_frames) {
            info!(
                motion_frames,
                min_frames = self.config.detector.min_frames,
                "Incident below motion bar, discarding"
            );
            return Ok(None);
        }

        let Some(extent) = report.motion_extent(self.config.detector.span_gap_frames) else {
            return Ok(None);
        };

        let output = self
            .config
            .output_dir
            .join(incident_file_name(&self.config.camera, incident.start));
        let clip = assemble::develop_drawn_clip(
            &report.records,
            &extent,
            &assembled,
            &self.config.assembly,
            &output,
        )?;
        info!(
            motion_frames,
            clip = %clip.path.display(),
            duration_secs = clip.duration_secs,
            "Developed drawn clip"
        );
        Ok(Some(clip))
    }
}

/// Final artifact name: camera plus the full review window, so concurrent
/// runs for different cameras or windows never collide in one directory.
fn artifact_file_name(camera: &str, window: &TimeWindow) -> String {
    format!(
        "{camera}_motion_{}_{}.mp4",
        window.start.format("%Y-%m-%d_%H%M%S"),
        window.end.format("%Y-%m-%d_%H%M%S"),
    )
}

/// Per-incident clip name, keyed on the camera and the incident's start.
fn incident_file_name(camera: &str, start: DateTime<Utc>) -> String {
    format!(
        "{camera}_incident_{}.mp4",
        start.format("%Y-%m-%d_%H%M%S")
    )
}

/// Decode extracted frame files into image buffers.
fn load_frames(paths: &[PathBuf]) -> CamsiftResult<Vec<image::RgbImage>> {
    paths
        .iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.to_rgb8())
                .map_err(|e| CamsiftError::decode(format!("{}: {e}", path.display())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camsift_event_model::{MotionEvent, Segment};
    use chrono::{TimeZone, Utc};
    use std::path::Path;

    struct StubEvents(Vec<MotionEvent>);

    impl EventLogSource for StubEvents {
        fn motion_events(&mut self, _window: &TimeWindow) -> CamsiftResult<Vec<MotionEvent>> {
            Ok(self.0.clone())
        }
    }

    struct StubFootage(Vec<Segment>);

    impl FootageSource for StubFootage {
        fn find_segments(&mut self, _window: &TimeWindow) -> CamsiftResult<Vec<Segment>> {
            Ok(self.0.clone())
        }
    }

    fn config(output_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            camera: "porch".to_string(),
            gap_tolerance_secs: 60,
            detector: DetectorConfig::default(),
            assembly: AssemblyConfig::default(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 8, 25, 5, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 25, 6, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_no_events_is_discarded_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = MotionPipeline::new(
            config(dir.path()),
            StubEvents(Vec::new()),
            StubFootage(Vec::new()),
        )
        .unwrap();

        let outcome = pipeline.run(&window()).unwrap();
        assert!(!outcome.qualifies);
        assert!(outcome.artifact.is_none());
        assert_eq!(outcome.incident_count, 0);
        assert_eq!(outcome.discarded_count, 0);
    }

    #[test]
    fn test_events_without_footage_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let event = MotionEvent::new(
            Utc.with_ymd_and_hms(2026, 8, 25, 5, 10, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 25, 5, 10, 30).unwrap(),
            "porch",
            0,
            "motion detect",
        );
        let mut pipeline = MotionPipeline::new(
            config(dir.path()),
            StubEvents(vec![event]),
            StubFootage(Vec::new()),
        )
        .unwrap();

        let outcome = pipeline.run(&window()).unwrap();
        assert!(!outcome.qualifies);
        // Nothing qualified, so the qualifying count is zero; the lone
        // consolidated incident shows up as discarded.
        assert_eq!(outcome.incident_count, 0);
        assert_eq!(outcome.discarded_count, 1);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = config(dir.path());
        bad.gap_tolerance_secs = -1;

        let result =
            MotionPipeline::new(bad, StubEvents(Vec::new()), StubFootage(Vec::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_summary_formats() {
        let outcome = RunOutcome {
            qualifies: true,
            artifact: Some(PathBuf::from("/tmp/motion.mp4")),
            total_duration_secs: Some(95.0),
            incident_count: 2,
            discarded_count: 1,
        };
        assert_eq!(
            outcome.summary(),
            "2 incident(s) with motion, 2 clip(s) joined. Total duration: 1m35s"
        );

        let outcome = RunOutcome::discarded(3);
        assert_eq!(
            outcome.summary(),
            "No motion worth reviewing (3 incident(s) discarded)"
        );
    }

    #[test]
    fn test_artifact_name_keyed_on_camera_and_window() {
        let w = window();
        let porch = artifact_file_name("porch", &w);
        let garage = artifact_file_name("garage", &w);
        assert_ne!(porch, garage);
        assert!(porch.starts_with("porch_"));
        assert!(porch.contains("2026-08-25_050000"));
        assert!(porch.contains("2026-08-25_060000"));

        let later = TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 8, 25, 6, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 25, 7, 0, 0).unwrap(),
        );
        assert_ne!(porch, artifact_file_name("porch", &later));
    }

    #[test]
    fn test_incident_clip_names_do_not_collide() {
        let first = Utc.with_ymd_and_hms(2026, 8, 25, 5, 10, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 8, 25, 5, 42, 0).unwrap();
        assert_ne!(
            incident_file_name("porch", first),
            incident_file_name("porch", second)
        );
        assert_ne!(
            incident_file_name("porch", first),
            incident_file_name("garage", first)
        );
    }

    #[test]
    fn test_empty_camera_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = config(dir.path());
        bad.camera = "  ".to_string();

        let result =
            MotionPipeline::new(bad, StubEvents(Vec::new()), StubFootage(Vec::new()));
        assert!(result.is_err());
    }
}
