//! Event consolidation: merging vendor events into incidents.
//!
//! Vendor motion logs report many short begin/end pairs for what a person
//! would call one episode. Consolidation folds events separated by no more
//! than a gap tolerance into a single `Incident`, preserving the member
//! events for reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::MotionEvent;

/// A consolidated run of motion events.
///
/// Invariants: incidents produced by [`consolidate`] are chronologically
/// ordered and pairwise disjoint, and any two adjacent incidents are
/// separated by strictly more than the gap tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// Member events in chronological order.
    pub events: Vec<MotionEvent>,
}

impl Incident {
    fn seed(event: MotionEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            events: vec![event],
        }
    }

    fn absorb(&mut self, event: MotionEvent) {
        if event.end > self.end {
            self.end = event.end;
        }
        self.events.push(event);
    }

    /// Incident length in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// Merge chronologically ordered events into disjoint incidents.
///
/// For each event after the first, `gap = event.start - accumulator.end`.
/// A gap of at most `gap_tolerance_secs` merges (equality merges); a larger
/// gap finalizes the accumulator and seeds a new one. The final accumulator
/// is always flushed.
///
/// Overlapping events (negative gap) merge; the accumulator end only grows
/// (`end = max(end, event.end)`), so an event fully contained in the
/// accumulator never shrinks it.
pub fn consolidate(events: &[MotionEvent], gap_tolerance_secs: i64) -> Vec<Incident> {
    let mut incidents = Vec::new();
    let mut open: Option<Incident> = None;

    for event in events {
        match open.as_mut() {
            None => open = Some(Incident::seed(event.clone())),
            Some(acc) => {
                let gap = (event.start - acc.end).num_seconds();
                if gap <= gap_tolerance_secs {
                    acc.absorb(event.clone());
                } else {
                    incidents.push(open.take().expect("accumulator present"));
                    open = Some(Incident::seed(event.clone()));
                }
            }
        }
    }

    if let Some(acc) = open {
        incidents.push(acc);
    }

    incidents
}
