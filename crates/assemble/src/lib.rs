//! camsift Assemble — turning footage segments into clips.
//!
//! Wraps ffmpeg/ffprobe subprocess invocations behind a small command
//! builder, and layers the assembly operations on top:
//! - trim overlapping footage segments to an incident window and join them
//! - speed/resize transforms on the joined clip
//! - decode a clip to frames and re-encode annotated frames, with the
//!   matching audio slice mapped across proportionally
//!
//! All intermediates live in temporary directories; only the final clip
//! lands at the caller's output path.

pub mod clip;
pub mod ffmpeg;

pub use clip::{
    assemble_window, concat_clips, develop_drawn_clip, extract_frames, AssemblyConfig, DrawnClip,
};
pub use ffmpeg::{check_ffmpeg, check_ffprobe, probe, ClipInfo, FfmpegCommand};
