//! Full pipeline run over a recent review window.

use std::path::PathBuf;

use camsift_assemble::AssemblyConfig;
use camsift_common::config::AppConfig;
use camsift_common::error::CamsiftResult;
use camsift_detect::DetectorConfig;
use camsift_event_log::{EventLogSource, RecordLogFile, TextLogFile};
use camsift_event_model::{MotionEvent, TimeWindow};
use camsift_pipeline::{LocalFootage, MotionPipeline, PipelineConfig};
use tracing::info;

/// Either vendor log shape behind one source.
pub(crate) enum LogInput {
    Text(TextLogFile),
    Records(RecordLogFile),
}

impl LogInput {
    pub(crate) fn open(path: PathBuf, records: bool, lookbehind_secs: i64) -> Self {
        if records {
            Self::Records(RecordLogFile::new(path))
        } else {
            Self::Text(TextLogFile::new(path, lookbehind_secs))
        }
    }
}

impl EventLogSource for LogInput {
    fn motion_events(&mut self, window: &TimeWindow) -> CamsiftResult<Vec<MotionEvent>> {
        match self {
            Self::Text(source) => source.motion_events(window),
            Self::Records(source) => source.motion_events(window),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    log: PathBuf,
    records: bool,
    footage: PathBuf,
    minutes: i64,
    output: PathBuf,
    gap_secs: Option<i64>,
    min_frames: u32,
    speed: f64,
    resize: f64,
    unique_only: bool,
) -> anyhow::Result<()> {
    let app = AppConfig::load();
    let gap_tolerance_secs = gap_secs.unwrap_or(app.consolidation.gap_tolerance_secs);

    let config = PipelineConfig {
        camera: app.camera.clone(),
        gap_tolerance_secs,
        detector: DetectorConfig {
            min_frames,
            unique_only,
            ..DetectorConfig::default()
        },
        assembly: AssemblyConfig {
            speed_x: speed,
            resize_perc: resize,
            ..AssemblyConfig::default()
        },
        output_dir: output,
    };

    let events = LogInput::open(log, records, app.consolidation.default_lookbehind_secs);
    let segments = LocalFootage::new(footage);

    let window = TimeWindow::last_minutes(minutes);
    info!(start = %window.start, end = %window.end, "Review window");

    let mut pipeline = MotionPipeline::new(config, events, segments)?;
    let outcome = pipeline.run(&window)?;

    println!("{}", outcome.summary());
    if let Some(artifact) = &outcome.artifact {
        println!("Artifact: {}", artifact.display());
    }
    Ok(())
}
