//! camsift CLI — Command-line interface for the motion review pipeline.
//!
//! Usage:
//!   camsift run [OPTIONS]        Full pipeline: events -> incidents -> clips
//!   camsift events <LOG>         Parse a vendor log and print incidents
//!   camsift detect <CLIP>        Score one clip for motion
//!   camsift check                Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "camsift",
    about = "Camera motion review: consolidate events, detect motion, develop clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a recent review window
    Run {
        /// Vendor motion log file
        #[arg(long)]
        log: PathBuf,

        /// Treat the log as JSON motion-file records instead of a
        /// paginated text log
        #[arg(long)]
        records: bool,

        /// Directory of raw footage segments
        #[arg(long)]
        footage: PathBuf,

        /// Review window: the last N minutes
        #[arg(long, default_value = "60")]
        minutes: i64,

        /// Output directory for finished clips
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Gap tolerance between events that still merge, in seconds
        #[arg(long)]
        gap_secs: Option<i64>,

        /// Motion-frame bar an incident must clear
        #[arg(long, default_value = "10")]
        min_frames: u32,

        /// Playback speed multiplier for assembled clips
        #[arg(long, default_value = "6.0")]
        speed: f64,

        /// Fraction of the source resolution to keep
        #[arg(long, default_value = "0.5")]
        resize: f64,

        /// Count each detected shape only once per incident
        #[arg(long)]
        unique_only: bool,
    },

    /// Parse a vendor motion log and print consolidated incidents
    Events {
        /// Vendor motion log file
        log: PathBuf,

        /// Treat the log as JSON motion-file records
        #[arg(long)]
        records: bool,

        /// Review window: the last N minutes
        #[arg(long, default_value = "60")]
        minutes: i64,

        /// Gap tolerance in seconds
        #[arg(long)]
        gap_secs: Option<i64>,
    },

    /// Score one clip for motion
    Detect {
        /// Clip to analyze
        clip: PathBuf,

        /// Write an annotated clip here when the footage qualifies
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Motion-frame bar the clip must clear
        #[arg(long, default_value = "10")]
        min_frames: u32,

        /// Minimum connected-region area in pixels
        #[arg(long, default_value = "500")]
        min_area: u32,

        /// Pixel-delta binarization threshold (1-254)
        #[arg(long, default_value = "25")]
        threshold: u8,

        /// Count each detected shape only once
        #[arg(long)]
        unique_only: bool,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    camsift_common::logging::init_logging(&camsift_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Run {
            log,
            records,
            footage,
            minutes,
            output,
            gap_secs,
            min_frames,
            speed,
            resize,
            unique_only,
        } => commands::run::run(
            log,
            records,
            footage,
            minutes,
            output,
            gap_secs,
            min_frames,
            speed,
            resize,
            unique_only,
        ),
        Commands::Events {
            log,
            records,
            minutes,
            gap_secs,
        } => commands::events::run(log, records, minutes, gap_secs),
        Commands::Detect {
            clip,
            output,
            min_frames,
            min_area,
            threshold,
            unique_only,
        } => commands::detect::run(clip, output, min_frames, min_area, threshold, unique_only),
        Commands::Check => commands::check::run(),
    }
}
