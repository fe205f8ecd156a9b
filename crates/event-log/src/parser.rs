//! Paginated vendor text-log parsing.
//!
//! Doorbell-style vendors expose their event log as repeated lines of
//! `items[n].Field=value`, fetched in bounded batches through a "find
//! next" call that reports a `found=N` count. Motion episodes arrive as
//! separate `Event Begin` / `Event End` rows that must be paired back
//! together. Pagination ends when a batch reports `found=0`; batches run
//! newest-first and are reversed to chronological before pairing.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::{debug, warn};

use camsift_common::error::CamsiftResult;
use camsift_event_model::{MotionEvent, TimeWindow};

use crate::EventLogSource;

/// Yields raw vendor batch text until the log is exhausted.
///
/// Implementations wrap whatever session/token mechanics the vendor uses;
/// the parser only sees text. Returning `None` ends pagination early
/// (equivalent to a `found=0` batch).
pub trait LogBatchSource {
    fn next_batch(&mut self) -> CamsiftResult<Option<String>>;
}

/// Begin/end marker carried by each vendor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Begin,
    End,
}

/// One grouped `items[n].*` record before pairing.
#[derive(Debug, Clone)]
struct RawRecord {
    time: DateTime<Utc>,
    marker: Marker,
    region: String,
    channel: u32,
    kind: String,
}

/// Accumulator for an open begin marker awaiting its end.
#[derive(Debug, Clone)]
struct Pending {
    start: DateTime<Utc>,
    region: String,
    channel: u32,
    kind: String,
}

/// Pairing state machine.
#[derive(Debug)]
enum PairState {
    /// No open accumulator.
    AwaitingItem,
    /// A begin marker opened an accumulator.
    InBegin(Pending),
    /// An end marker completed an event; flushed before the next record.
    InEnd(MotionEvent),
}

/// Parser for paginated `items[n].field=value` vendor logs.
#[derive(Debug, Clone)]
pub struct BatchLogParser {
    /// Synthesized episode length when only one of begin/end is present.
    pub lookbehind_secs: i64,

    /// Only records of this event type (lowercased) are paired; other log
    /// rows (config changes, logins) are dropped.
    pub motion_kind: String,
}

impl Default for BatchLogParser {
    fn default() -> Self {
        Self {
            lookbehind_secs: 60,
            motion_kind: "motion detect".to_string(),
        }
    }
}

fn item_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^items\[(\d+)\]\.(.+?)=(.*)$").expect("item line regex"))
}

fn found_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^found=(\d+)").expect("found line regex"))
}

impl BatchLogParser {
    pub fn new(lookbehind_secs: i64) -> Self {
        Self {
            lookbehind_secs,
            ..Default::default()
        }
    }

    /// Drain a batch source and pair its records into chronological events.
    pub fn collect(&self, source: &mut dyn LogBatchSource) -> CamsiftResult<Vec<MotionEvent>> {
        let mut records = Vec::new();

        loop {
            let Some(batch) = source.next_batch()? else {
                break;
            };
            if let Some(found) = parse_found_count(&batch) {
                if found == 0 {
                    break;
                }
            }
            records.extend(self.group_items(&batch));
        }

        // Vendor order is newest-first; pairing needs chronological.
        records.reverse();
        records.retain(|r| r.kind == self.motion_kind);

        Ok(self.pair(records))
    }

    /// Parse one batch of text into a single-shot event list (no paging).
    pub fn parse_text(&self, text: &str) -> Vec<MotionEvent> {
        let mut records = self.group_items(text);
        records.reverse();
        records.retain(|r| r.kind == self.motion_kind);
        self.pair(records)
    }

    /// Group `items[n].field=value` lines into records by item index.
    ///
    /// Malformed lines are skipped, never fatal; a record missing its time
    /// or type marker is likewise dropped with a debug note.
    fn group_items(&self, text: &str) -> Vec<RawRecord> {
        let mut records = Vec::new();
        let mut current_index: Option<u32> = None;
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            let Some(caps) = item_line_regex().captures(line.trim()) else {
                continue;
            };
            let index: u32 = match caps[1].parse() {
                Ok(i) => i,
                Err(_) => continue,
            };
            let name = normalize_field_name(&caps[2]);
            let value = caps[3].to_string();

            if current_index != Some(index) {
                if let Some(record) = build_record(&fields) {
                    records.push(record);
                }
                fields.clear();
                current_index = Some(index);
            }
            fields.push((name, value));
        }

        if let Some(record) = build_record(&fields) {
            records.push(record);
        }

        records
    }

    /// Pair begin/end markers into events with an explicit state machine.
    fn pair(&self, records: Vec<RawRecord>) -> Vec<MotionEvent> {
        let mut events = Vec::new();
        let mut state = PairState::AwaitingItem;

        for record in records {
            // Flush a completed event before handling the next marker.
            if let PairState::InEnd(event) = state {
                events.push(event);
                state = PairState::AwaitingItem;
            }

            state = match (state, record.marker) {
                (PairState::AwaitingItem, Marker::Begin) => PairState::InBegin(Pending {
                    start: record.time,
                    region: record.region,
                    channel: record.channel,
                    kind: record.kind,
                }),

                // End with no open accumulator: the episode started before
                // the query window. Estimate the start with the lookbehind.
                (PairState::AwaitingItem, Marker::End) => {
                    PairState::InEnd(MotionEvent::from_end(
                        record.time,
                        self.lookbehind_secs,
                        record.region,
                        record.channel,
                        record.kind,
                    ))
                }

                (PairState::InBegin(pending), Marker::End) => PairState::InEnd(MotionEvent::new(
                    pending.start,
                    record.time,
                    pending.region,
                    pending.channel,
                    pending.kind,
                )),

                // Two begins in a row is a vendor quirk; restart from the
                // newer one.
                (PairState::InBegin(stale), Marker::Begin) => {
                    debug!(stale_start = %stale.start, "Unpaired begin marker dropped");
                    PairState::InBegin(Pending {
                        start: record.time,
                        region: record.region,
                        channel: record.channel,
                        kind: record.kind,
                    })
                }

                (PairState::InEnd(_), _) => unreachable!("InEnd flushed above"),
            };
        }

        // Trailing state: a completed event flushes as-is; an open begin
        // never saw its end (episode ran past the window), so synthesize.
        match state {
            PairState::InEnd(event) => events.push(event),
            PairState::InBegin(pending) => {
                let end = pending.start + Duration::seconds(self.lookbehind_secs);
                events.push(MotionEvent::new(
                    pending.start,
                    end,
                    pending.region,
                    pending.channel,
                    pending.kind,
                ));
            }
            PairState::AwaitingItem => {}
        }

        events
    }
}

/// Extract the `found=N` batch count, if the batch carries one.
fn parse_found_count(text: &str) -> Option<u32> {
    found_regex()
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Lowercase, space-to-dash, and strip array suffixes from a field name,
/// so `Detail.Region Name` and `Detail.RegionName[0]` both normalize.
fn normalize_field_name(name: &str) -> String {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let suffix = SUFFIX.get_or_init(|| Regex::new(r"\[\d+\]").expect("suffix regex"));
    suffix
        .replace_all(&name.to_lowercase().replace(' ', "-"), "")
        .to_string()
}

/// Assemble a grouped record, dropping it when time or type is unusable.
fn build_record(fields: &[(String, String)]) -> Option<RawRecord> {
    if fields.is_empty() {
        return None;
    }

    let get = |key: &str| {
        fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    };

    let time_raw = get("time")?;
    let time = match NaiveDateTime::parse_from_str(time_raw, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => Utc.from_utc_datetime(&naive),
        Err(e) => {
            debug!(value = time_raw, error = %e, "Skipping record with unparseable time");
            return None;
        }
    };

    let marker = match get("type")? {
        t if t.contains("Begin") => Marker::Begin,
        t if t.contains("End") => Marker::End,
        other => {
            debug!(value = other, "Skipping record with unknown type marker");
            return None;
        }
    };

    Some(RawRecord {
        time,
        marker,
        region: get("detail.region-name").unwrap_or_default().to_lowercase(),
        channel: get("detail.channel-no.")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0),
        kind: get("detail.event-type").unwrap_or_default().to_lowercase(),
    })
}

/// A whole vendor log dump in a local file, treated as one batch.
///
/// Used by the CLI runner and by tests; live vendor sessions implement
/// [`LogBatchSource`] directly instead.
#[derive(Debug, Clone)]
pub struct TextLogFile {
    pub path: PathBuf,
    pub parser: BatchLogParser,
}

impl TextLogFile {
    pub fn new(path: impl Into<PathBuf>, lookbehind_secs: i64) -> Self {
        Self {
            path: path.into(),
            parser: BatchLogParser::new(lookbehind_secs),
        }
    }
}

impl EventLogSource for TextLogFile {
    fn motion_events(&mut self, window: &TimeWindow) -> CamsiftResult<Vec<MotionEvent>> {
        let text = std::fs::read_to_string(&self.path)?;
        let mut events = self.parser.parse_text(&text);
        let before = events.len();
        events.retain(|e| window.overlaps(e.start, e.end));
        if events.len() < before {
            warn!(
                dropped = before - events.len(),
                "Events outside the query window dropped"
            );
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Batches(Vec<String>);

    impl LogBatchSource for Batches {
        fn next_batch(&mut self) -> CamsiftResult<Option<String>> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.0.remove(0)))
            }
        }
    }

    fn item(n: u32, time: &str, marker: &str) -> String {
        format!(
            "items[{n}].Time=2026-08-25 {time}\n\
             items[{n}].Type=Event {marker}\n\
             items[{n}].Detail.Region Name=Backyard\n\
             items[{n}].Detail.Channel No.=0\n\
             items[{n}].Detail.Event Type=Motion Detect\n"
        )
    }

    #[test]
    fn test_pairs_begin_and_end() {
        // Newest-first: the end marker arrives before its begin.
        let text = format!("found=2\n{}{}", item(0, "10:00:30", "End"), item(1, "10:00:10", "Begin"));
        let mut source = Batches(vec![text, "found=0\n".to_string()]);

        let events = BatchLogParser::default().collect(&mut source).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_secs(), 20);
        assert_eq!(events[0].region, "backyard");
        assert_eq!(events[0].kind, "motion detect");
    }

    #[test]
    fn test_end_only_synthesizes_start() {
        let text = format!("found=1\n{}", item(0, "10:01:00", "End"));
        let mut source = Batches(vec![text, "found=0\n".to_string()]);

        let events = BatchLogParser::new(60).collect(&mut source).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_secs(), 60);
        assert_eq!(
            events[0].start,
            events[0].end - Duration::seconds(60)
        );
    }

    #[test]
    fn test_trailing_begin_synthesizes_end() {
        let text = format!("found=1\n{}", item(0, "10:01:00", "Begin"));
        let mut source = Batches(vec![text, "found=0\n".to_string()]);

        let events = BatchLogParser::new(60).collect(&mut source).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_secs(), 60);
    }

    #[test]
    fn test_pagination_stops_at_found_zero() {
        // The found=0 batch must terminate the loop even though more
        // batches are queued behind it.
        let mut source = Batches(vec![
            format!("found=1\n{}", item(0, "10:00:30", "End")),
            "found=0\n".to_string(),
            format!("found=1\n{}", item(0, "09:00:30", "End")),
        ]);

        let events = BatchLogParser::default().collect(&mut source).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let text = "garbage\nitems[0].Time=not a date\nitems[0].Type=Event End\n\
                    items[0].Detail.Event Type=Motion Detect\n"
            .to_string();
        let events = BatchLogParser::default().parse_text(&text);
        assert!(events.is_empty());
    }

    #[test]
    fn test_non_motion_records_dropped() {
        let text = item(0, "10:00:30", "End").replace("Motion Detect", "Video Loss");
        let events = BatchLogParser::default().parse_text(&text);
        assert!(events.is_empty());
    }

    #[test]
    fn test_newest_first_output_is_chronological() {
        // Two complete episodes, newest first in the raw log.
        let text = format!(
            "{}{}{}{}",
            item(0, "11:00:30", "End"),
            item(1, "11:00:00", "Begin"),
            item(2, "10:00:30", "End"),
            item(3, "10:00:00", "Begin"),
        );
        let events = BatchLogParser::default().parse_text(&text);
        assert_eq!(events.len(), 2);
        assert!(events[0].start < events[1].start);
    }

    #[test]
    fn test_double_begin_restarts_accumulator() {
        let text = format!(
            "{}{}{}",
            item(0, "10:02:00", "End"),
            item(1, "10:01:30", "Begin"),
            item(2, "10:00:00", "Begin"),
        );
        let events = BatchLogParser::default().parse_text(&text);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_secs(), 30);
    }

    #[test]
    fn test_empty_log_is_valid() {
        let mut source = Batches(vec!["found=0\n".to_string()]);
        let events = BatchLogParser::default().collect(&mut source).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_field_name_normalization() {
        assert_eq!(normalize_field_name("Detail.Region Name"), "detail.region-name");
        assert_eq!(normalize_field_name("Detail.RegionName[2]"), "detail.regionname");
    }
}
