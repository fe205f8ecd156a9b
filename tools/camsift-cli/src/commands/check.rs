//! Check system capabilities.

use camsift_common::config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    println!("camsift System Check");
    println!("{}", "=".repeat(50));

    match camsift_assemble::check_ffmpeg() {
        Ok(path) => println!("[OK] ffmpeg: {}", path.display()),
        Err(_) => println!("[FAIL] ffmpeg not found in PATH"),
    }
    match camsift_assemble::check_ffprobe() {
        Ok(path) => println!("[OK] ffprobe: {}", path.display()),
        Err(_) => println!("[FAIL] ffprobe not found in PATH"),
    }

    let config = AppConfig::load();
    println!();
    println!("Configuration:");
    println!("  camera: {}", config.camera);
    println!(
        "  gap tolerance: {}s",
        config.consolidation.gap_tolerance_secs
    );
    println!(
        "  default lookbehind: {}s",
        config.consolidation.default_lookbehind_secs
    );

    match config.validate() {
        Ok(()) => println!("\nConfiguration is valid. camsift is ready."),
        Err(err) => println!("\nConfiguration problem: {err}"),
    }
    Ok(())
}
