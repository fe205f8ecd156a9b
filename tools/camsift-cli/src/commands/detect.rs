//! Score one clip for motion, optionally developing an annotated clip.

use std::path::PathBuf;

use camsift_assemble::AssemblyConfig;
use camsift_detect::{DetectorConfig, FrameDiffer};

pub fn run(
    clip: PathBuf,
    output: Option<PathBuf>,
    min_frames: u32,
    min_area: u32,
    threshold: u8,
    unique_only: bool,
) -> anyhow::Result<()> {
    let config = DetectorConfig {
        min_frames,
        min_area,
        threshold,
        unique_only,
        ..DetectorConfig::default()
    };

    let staging = tempfile::tempdir()?;
    let frame_paths = camsift_assemble::extract_frames(&clip, &staging.path().join("frames"))?;
    let frames = frame_paths
        .iter()
        .map(|p| image::open(p).map(|img| img.to_rgb8()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut differ = FrameDiffer::new(config.clone())?;
    let report = differ.run(frames.iter());

    let motion_frames = report.motion_frame_count();
    let qualifies = report.qualifies(config.min_frames);

    println!("Frames scored: {}", report.records.len());
    if report.skipped > 0 {
        println!("Frames skipped: {}", report.skipped);
    }
    println!("Motion frames: {motion_frames}");
    for span in report.motion_spans(config.span_gap_frames) {
        println!("  motion frames {} .. {}", span.start, span.end);
    }
    println!(
        "Verdict: {}",
        if qualifies { "motion" } else { "no motion" }
    );

    if let Some(output) = output {
        if !qualifies {
            println!("Clip does not qualify; skipping develop");
            return Ok(());
        }
        let Some(extent) = report.motion_extent(config.span_gap_frames) else {
            return Ok(());
        };
        let drawn = camsift_assemble::develop_drawn_clip(
            &report.records,
            &extent,
            &clip,
            &AssemblyConfig::default(),
            &output,
        )?;
        println!(
            "Developed {} ({:.1}s)",
            drawn.path.display(),
            drawn.duration_secs
        );
    }
    Ok(())
}
