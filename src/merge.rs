//! Combine two emitted files with overlapping coverage.
//!
//! Base rows at or after the cutoff are dropped, all overlay rows are
//! appended, then the usual full-row dedup and stable datetime sort apply.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tracing::info;

use crate::emit::{read_events_from_path, write_events_to_path};
use crate::ingest::dedup::{dedup_and_sort, DedupOutcome};
use crate::ingest::error::ExtractError;
use crate::ingest::types::NormalizedEvent;

pub fn merge_events(
    base: Vec<NormalizedEvent>,
    overlay: Vec<NormalizedEvent>,
    cutoff: DateTime<FixedOffset>,
) -> DedupOutcome {
    let mut all: Vec<NormalizedEvent> = base.into_iter().filter(|e| e.datetime < cutoff).collect();
    all.extend(overlay);
    dedup_and_sort(all)
}

pub fn merge_files(
    base: &Path,
    overlay: &Path,
    cutoff: DateTime<FixedOffset>,
    out: &Path,
) -> Result<DedupOutcome, ExtractError> {
    let b = read_events_from_path(base)?;
    let o = read_events_from_path(overlay)?;
    let (nb, no) = (b.len(), o.len());

    let merged = merge_events(b, o, cutoff);
    write_events_to_path(out, &merged.events)?;

    info!(
        target: "merge",
        base = nb,
        overlay = no,
        written = merged.events.len(),
        removed = merged.removed,
        %cutoff,
        "merged"
    );
    Ok(merged)
}
