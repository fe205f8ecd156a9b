//! Parse a vendor motion log and print consolidated incidents.

use std::path::PathBuf;

use camsift_common::config::AppConfig;
use camsift_event_log::EventLogSource;
use camsift_event_model::{consolidate, TimeWindow};

use super::run::LogInput;

pub fn run(
    log: PathBuf,
    records: bool,
    minutes: i64,
    gap_secs: Option<i64>,
) -> anyhow::Result<()> {
    let app = AppConfig::load();
    let gap = gap_secs.unwrap_or(app.consolidation.gap_tolerance_secs);

    let window = TimeWindow::last_minutes(minutes);
    let mut source = LogInput::open(log, records, app.consolidation.default_lookbehind_secs);
    let events = source.motion_events(&window)?;
    let incidents = consolidate(&events, gap);

    println!(
        "{} event(s) -> {} incident(s) in the last {} minute(s)",
        events.len(),
        incidents.len(),
        minutes
    );
    for (i, incident) in incidents.iter().enumerate() {
        println!(
            "  [{}] {} .. {}  ({} event(s))",
            i,
            incident.start.format("%Y-%m-%d %H:%M:%S"),
            incident.end.format("%H:%M:%S"),
            incident.events.len()
        );
    }
    Ok(())
}
