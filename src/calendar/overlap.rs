//! Pairwise overlap detection over one listing batch.
//!
//! Intervals are half-open, so events that only touch do not overlap. All-day
//! events never conflict. The scan is quadratic in the batch size, which is
//! bounded by a single listing window; a larger-scale caller would want a
//! sweep over sorted starts instead.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::types::Event;

/// Result of one detection pass. Keys are event ids; every id in the batch
/// has an entry in `flags`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapReport {
    pub flags: BTreeMap<String, bool>,
    pub overlapping: BTreeMap<String, BTreeSet<String>>,
}

impl OverlapReport {
    pub fn has_overlap(&self, id: &str) -> bool {
        self.flags.get(id).copied().unwrap_or(false)
    }

    pub fn overlapping_ids(&self, id: &str) -> Vec<String> {
        self.overlapping
            .get(id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }
}

pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Flag every event in `events` that intersects another one. Events for which
/// `exclude` returns true (e.g. declined by the caller) are flagged `false`
/// and never counted against others.
pub fn detect(events: &[Event], exclude: impl Fn(&Event) -> bool) -> OverlapReport {
    let mut report = OverlapReport::default();
    let mut candidates = Vec::with_capacity(events.len());

    for event in events {
        let Some(id) = event.id.as_deref() else {
            continue;
        };
        report.flags.insert(id.to_string(), false);
        if exclude(event) {
            continue;
        }
        if let Some((start, end)) = event.timed_interval() {
            candidates.push((id, start, end));
        }
    }

    for (i, &(a_id, a_start, a_end)) in candidates.iter().enumerate() {
        for &(b_id, b_start, b_end) in &candidates[i + 1..] {
            if a_id == b_id || !intervals_overlap(a_start, a_end, b_start, b_end) {
                continue;
            }
            for (id, other) in [(a_id, b_id), (b_id, a_id)] {
                report.flags.insert(id.to_string(), true);
                report
                    .overlapping
                    .entry(id.to_string())
                    .or_default()
                    .insert(other.to_string());
            }
        }
    }

    report
}
