// src/ingest/dedup.rs
use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::ingest::types::NormalizedEvent;

/// Same instant, currency and title, but some other column differs
/// (typically an `Actual` back-filled in a later download). Both rows are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearDuplicate {
    pub kept_first: NormalizedEvent,
    pub also_kept: NormalizedEvent,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub events: Vec<NormalizedEvent>,
    pub removed: usize,
    pub near_duplicates: Vec<NearDuplicate>,
}

/// Drop rows equal in every emitted column (first occurrence wins), then
/// stable-sort by datetime so same-instant rows keep encounter order.
pub fn dedup_and_sort(events: Vec<NormalizedEvent>) -> DedupOutcome {
    let before = events.len();
    let mut seen: HashSet<[String; 8]> = HashSet::with_capacity(before);
    let mut keep = Vec::with_capacity(before);

    for ev in events {
        if seen.insert(ev.to_record()) {
            keep.push(ev);
        }
    }
    let removed = before - keep.len();

    keep.sort_by_key(|e| e.datetime);
    let near_duplicates = find_near_duplicates(&keep);

    DedupOutcome {
        events: keep,
        removed,
        near_duplicates,
    }
}

fn find_near_duplicates(events: &[NormalizedEvent]) -> Vec<NearDuplicate> {
    let mut first_by_key: HashMap<(i64, &str, &str), usize> = HashMap::new();
    let mut out = Vec::new();

    for (i, ev) in events.iter().enumerate() {
        let key = (ev.datetime.timestamp(), ev.currency.as_str(), ev.event.as_str());
        match first_by_key.get(&key) {
            Some(&j) => {
                warn!(
                    target: "ingest",
                    datetime = %ev.datetime,
                    currency = %ev.currency,
                    event = %ev.event,
                    "same event with differing values kept twice"
                );
                out.push(NearDuplicate {
                    kept_first: events[j].clone(),
                    also_kept: ev.clone(),
                });
            }
            None => {
                first_by_key.insert(key, i);
            }
        }
    }
    out
}
