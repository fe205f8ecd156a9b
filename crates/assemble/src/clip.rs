//! Clip assembly: trim, concat, transform, and drawn-clip development.
//!
//! Every multi-step job stages its intermediates in a [`tempfile::TempDir`]
//! so a failed run leaves nothing behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use camsift_common::error::{CamsiftError, CamsiftResult};
use camsift_detect::{FrameRecord, FrameSpan};
use camsift_event_model::{Segment, TimeWindow};

use crate::ffmpeg::{self, FfmpegCommand};

/// Configuration for clip assembly and transformation.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Output frame rate.
    pub fps: f64,

    /// Fraction of the source resolution to keep, in (0, 1].
    pub resize_perc: f64,

    /// Playback speed multiplier applied to the assembled clip.
    pub speed_x: f64,

    /// Seconds of context kept on each side of the motion span when
    /// developing a drawn clip.
    pub buffer_secs: f64,

    /// x264 constant rate factor.
    pub crf: u8,

    /// x264 preset.
    pub preset: String,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            fps: 20.0,
            resize_perc: 0.5,
            speed_x: 6.0,
            buffer_secs: 0.5,
            crf: 23,
            preset: "veryfast".to_string(),
        }
    }
}

impl AssemblyConfig {
    pub fn validate(&self) -> CamsiftResult<()> {
        if self.fps <= 0.0 {
            return Err(CamsiftError::config(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.resize_perc <= 0.0 || self.resize_perc > 1.0 {
            return Err(CamsiftError::config(format!(
                "resize_perc must be in (0, 1], got {}",
                self.resize_perc
            )));
        }
        if self.speed_x <= 0.0 {
            return Err(CamsiftError::config(format!(
                "speed_x must be positive, got {}",
                self.speed_x
            )));
        }
        if self.buffer_secs < 0.0 {
            return Err(CamsiftError::config("buffer_secs must not be negative"));
        }
        Ok(())
    }
}

/// A finished annotated clip.
#[derive(Debug, Clone)]
pub struct DrawnClip {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Assemble all footage overlapping `window` into one clip at `output`.
///
/// Each overlapping segment is trimmed to the window boundaries from its
/// filename timestamps, re-encoded to a uniform resolution so mixed-size
/// sources concatenate cleanly, joined, and finally sped up. Segments that
/// fail to probe or trim are skipped with a warning. Returns `Ok(None)`
/// when no segment produced usable footage.
pub fn assemble_window(
    segments: &[Segment],
    window: &TimeWindow,
    config: &AssemblyConfig,
    output: &Path,
) -> CamsiftResult<Option<PathBuf>> {
    config.validate()?;

    let mut overlapping: Vec<&Segment> = segments.iter().filter(|s| s.overlaps(window)).collect();
    overlapping.sort_by_key(|s| s.start);

    if overlapping.is_empty() {
        debug!(window = %window.start, "No footage overlaps window");
        return Ok(None);
    }

    let staging = TempDir::new()?;
    let mut parts: Vec<PathBuf> = Vec::new();
    let mut target: Option<(u32, u32)> = None;

    for (i, segment) in overlapping.iter().enumerate() {
        match prepare_part(segment, window, config, staging.path(), i, &mut target) {
            Ok(part) => parts.push(part),
            Err(err) => {
                warn!(
                    path = %segment.path.display(),
                    error = %err,
                    "Skipping unreadable segment"
                );
            }
        }
    }

    if parts.is_empty() {
        warn!(window = %window.start, "All overlapping segments were unusable");
        return Ok(None);
    }

    let joined = staging.path().join("joined.mp4");
    concat_parts(&parts, &joined)?;

    // Speed transform as a separate pass over the joined clip.
    let mut cmd = FfmpegCommand::new(&joined, output)
        .video_filter(format!("setpts=PTS/{}", config.speed_x))
        .video_codec("libx264")
        .crf(config.crf)
        .preset(config.preset.clone())
        .frame_rate(config.fps);
    cmd = match atempo_chain(config.speed_x) {
        Some(chain) => cmd.audio_filter(chain).audio_codec("aac"),
        None => cmd.audio_codec("copy"),
    };
    ffmpeg::run(&cmd)?;

    info!(
        parts = parts.len(),
        output = %output.display(),
        "Assembled window clip"
    );
    Ok(Some(output.to_path_buf()))
}

/// Trim and normalize one segment into a uniform intermediate part.
fn prepare_part(
    segment: &Segment,
    window: &TimeWindow,
    config: &AssemblyConfig,
    staging: &Path,
    index: usize,
    target: &mut Option<(u32, u32)>,
) -> CamsiftResult<PathBuf> {
    let info = ffmpeg::probe(&segment.path)?;

    // The first usable segment fixes the output resolution; later segments
    // are scaled to match so the concat demuxer accepts them.
    let (width, height) = *target.get_or_insert_with(|| {
        (
            even_dim(info.width, config.resize_perc),
            even_dim(info.height, config.resize_perc),
        )
    });

    let (start_off, end_off) = segment.trim_offsets(window);
    let part = staging.join(format!("part_{index:03}.mp4"));

    let mut cmd = FfmpegCommand::new(&segment.path, &part);
    if start_off > 0.0 {
        cmd = cmd.seek(start_off);
    }
    if let Some(end_off) = end_off {
        cmd = cmd.duration(end_off - start_off);
    }
    let cmd = cmd
        .video_filter(format!("scale={width}:{height}"))
        .video_codec("libx264")
        .crf(config.crf)
        .preset(config.preset.clone())
        .frame_rate(config.fps)
        .audio_codec("aac");
    ffmpeg::run(&cmd)?;

    Ok(part)
}

/// Concatenate uniformly encoded parts with the concat demuxer.
fn concat_parts(parts: &[PathBuf], output: &Path) -> CamsiftResult<()> {
    // The demuxer list is an intermediate; keep it out of the output
    // directory.
    let staging = TempDir::new()?;
    let list_path = staging.path().join("concat.txt");
    let mut list = fs::File::create(&list_path)?;
    for part in parts {
        writeln!(list, "{}", concat_list_entry(part))?;
    }

    let cmd = FfmpegCommand::new(&list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .output_args(["-c", "copy"]);
    ffmpeg::run(&cmd)
}

/// Concatenate finished clips into one artifact.
pub fn concat_clips(clips: &[PathBuf], output: &Path) -> CamsiftResult<PathBuf> {
    if clips.is_empty() {
        return Err(CamsiftError::consistency("No clips to concatenate"));
    }
    concat_parts(clips, output)?;
    Ok(output.to_path_buf())
}

/// Decode a clip into a PNG frame sequence under `dir`.
///
/// Returns the frame paths in decode order.
pub fn extract_frames(clip: &Path, dir: &Path) -> CamsiftResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let pattern = dir.join("frame_%05d.png");
    let cmd = FfmpegCommand::new(clip, &pattern);
    ffmpeg::run(&cmd)?;

    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    frames.sort();

    if frames.is_empty() {
        return Err(CamsiftError::decode(format!(
            "{}: no frames decoded",
            clip.display()
        )));
    }
    Ok(frames)
}

/// Develop the annotated motion frames into a standalone clip.
///
/// The motion span is padded by `buffer_secs` on each side (clamped to the
/// clip), the padded annotated frames are re-encoded at the configured rate,
/// and when the source carries audio, the matching slice is mapped across
/// proportionally and muxed in. `-shortest` reconciles any length mismatch
/// by truncating the longer stream.
pub fn develop_drawn_clip(
    records: &[FrameRecord],
    span: &FrameSpan,
    source_clip: &Path,
    config: &AssemblyConfig,
    output: &Path,
) -> CamsiftResult<DrawnClip> {
    config.validate()?;
    if records.is_empty() {
        return Err(CamsiftError::consistency("No frames to develop"));
    }

    let info = ffmpeg::probe(source_clip)?;
    let total_frames = records.len() as u32;

    let (start_secs, end_secs) =
        padded_span(span, config.fps, config.buffer_secs, info.duration_secs);
    let first = (start_secs * config.fps).floor() as u32;
    let last = ((end_secs * config.fps).ceil() as u32).min(total_frames.saturating_sub(1));
    if first > last {
        return Err(CamsiftError::consistency(format!(
            "Padded span {start_secs:.2}..{end_secs:.2}s maps to no frames"
        )));
    }

    let staging = TempDir::new()?;
    for (seq, record) in records[first as usize..=last as usize].iter().enumerate() {
        let frame_path = staging.path().join(format!("frame_{seq:05}.png"));
        record
            .annotated
            .save(&frame_path)
            .map_err(|e| CamsiftError::decode(format!("Failed to write frame: {e}")))?;
    }

    let silent = staging.path().join("silent.mp4");
    let cmd = FfmpegCommand::new(staging.path().join("frame_%05d.png"), &silent)
        .input_args(["-framerate", &format!("{}", config.fps)])
        .video_codec("libx264")
        .crf(config.crf)
        .preset(config.preset.clone())
        .output_args(["-pix_fmt", "yuv420p"]);
    ffmpeg::run(&cmd)?;

    let frame_count = last - first + 1;
    let duration_secs = frame_count as f64 / config.fps;

    if !info.has_audio {
        fs::copy(&silent, output)?;
        return Ok(DrawnClip {
            path: output.to_path_buf(),
            duration_secs,
        });
    }

    // Frame indices map to source time proportionally, not via the source
    // frame rate, so dropped or duplicated decode frames stay in sync.
    let (audio_start, audio_end) = audio_window(first, last, total_frames, info.duration_secs);
    let audio = staging.path().join("audio.m4a");
    let cmd = FfmpegCommand::new(source_clip, &audio)
        .seek(audio_start)
        .duration(audio_end - audio_start)
        .output_arg("-vn")
        .audio_codec("aac");
    ffmpeg::run(&cmd)?;

    let cmd = FfmpegCommand::new(&silent, output)
        .extra_input(&audio)
        .video_codec("copy")
        .audio_codec("aac")
        .shortest();
    ffmpeg::run(&cmd)?;

    Ok(DrawnClip {
        path: output.to_path_buf(),
        duration_secs,
    })
}

/// Pad a motion span by the buffer, clamped to the clip bounds.
///
/// Returns `(start_secs, end_secs)` with `start < end`.
pub fn padded_span(span: &FrameSpan, fps: f64, buffer_secs: f64, clip_duration_secs: f64) -> (f64, f64) {
    let start = (span.start as f64 / fps - buffer_secs).max(0.0);
    let end = ((span.end + 1) as f64 / fps + buffer_secs).min(clip_duration_secs.max(start));
    (start, end.max(start))
}

/// Map an inclusive frame range onto source time proportionally.
pub fn audio_window(first: u32, last: u32, total_frames: u32, duration_secs: f64) -> (f64, f64) {
    let total = total_frames.max(1) as f64;
    let start = first as f64 / total * duration_secs;
    let end = ((last + 1) as f64 / total * duration_secs).min(duration_secs);
    (start, end.max(start))
}

/// Audio tempo filter chain for a speed multiplier.
///
/// ffmpeg's atempo accepts 0.5..=2.0 per instance, so larger factors are
/// decomposed into a chain. Returns `None` at unity speed.
pub fn atempo_chain(speed: f64) -> Option<String> {
    if (speed - 1.0).abs() < 1e-9 {
        return None;
    }

    let mut remaining = speed;
    let mut stages: Vec<String> = Vec::new();
    while remaining > 2.0 {
        stages.push("atempo=2.0".to_string());
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push("atempo=0.5".to_string());
        remaining /= 0.5;
    }
    stages.push(format!("atempo={remaining:.6}"));
    Some(stages.join(","))
}

/// One `file` line for the concat demuxer, with single quotes escaped.
fn concat_list_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', "'\\''");
    format!("file '{escaped}'")
}

/// Scale a dimension by the resize fraction, rounded down to even for
/// yuv420p.
fn even_dim(dim: u32, resize_perc: f64) -> u32 {
    let scaled = (dim as f64 * resize_perc) as u32;
    (scaled / 2 * 2).max(2)
}
