// src/ingest/mod.rs
pub mod dedup;
pub mod error;
pub mod loader;
pub mod locator;
pub mod normalize;
pub mod types;

use crate::ingest::dedup::{dedup_and_sort, NearDuplicate};
use crate::ingest::error::ExtractError;
use crate::ingest::loader::{load_source, SourceFile};
use crate::ingest::normalize::{normalize_day, FileContext};
use crate::ingest::types::NormalizedEvent;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("extract_files_total", "Calendar pages processed.");
        describe_counter!(
            "extract_files_skipped_total",
            "Pages skipped (unreadable, no payload, bad JSON)."
        );
        describe_counter!("extract_events_total", "Events normalized from payloads.");
        describe_counter!(
            "extract_record_errors_total",
            "Records rejected (date, time or impact)."
        );
        describe_counter!("extract_dedup_total", "Exact duplicate rows removed.");
        describe_counter!(
            "extract_near_duplicates_total",
            "Same event kept twice with differing values."
        );
        describe_histogram!("extract_parse_ms", "Per-page locate+decode+normalize time in ms.");
    });
}

/// Normalize text: strip tags, decode entities, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) Strip HTML tags (before decoding, so `&lt;` stays text)
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    let out = re_tags.replace_all(s, "");

    // 2) HTML entity decode
    let out = html_escape::decode_html_entities(&out);

    // 3) Collapse whitespace (incl. nbsp)
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Everything one page produced.
#[derive(Debug, Default)]
pub struct FileOutcome {
    pub events: Vec<NormalizedEvent>,
    pub record_errors: Vec<ExtractError>,
    pub days: usize,
    pub sentinel_times: usize,
}

/// Locate, decode and normalize one page's text. File-level failures come
/// back as `Err`; record-level ones are inside the outcome.
pub fn extract_document(
    ctx: &FileContext,
    html: &str,
    state_index: usize,
) -> Result<FileOutcome, ExtractError> {
    let segment =
        locator::locate_state(html, state_index).ok_or_else(|| ExtractError::MissingPayload {
            file: ctx.file.clone(),
        })?;
    let state = locator::decode_state(segment).map_err(|e| ExtractError::MalformedJson {
        file: ctx.file.clone(),
        source: e,
    })?;

    let mut out = FileOutcome::default();
    for day in state.into_days() {
        out.days += 1;
        let d = normalize_day(ctx, &day);
        out.events.extend(d.events);
        out.record_errors.extend(d.errors);
        out.sentinel_times += d.sentinel_times;
    }
    Ok(out)
}

/// Load one page from disk and extract it.
pub fn extract_file(source: &SourceFile, state_index: usize) -> Result<FileOutcome, ExtractError> {
    let ctx = FileContext {
        file: source.label(),
        year: source.year,
    };
    let html = load_source(source)?;
    extract_document(&ctx, &html, state_index)
    // page text dropped here, before the next file is read
}

/// Batch-level accounting handed back with the final rows.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files_total: usize,
    pub skipped_files: Vec<ExtractError>,
    pub record_errors: Vec<ExtractError>,
    pub events_before_dedup: usize,
    pub dedup_removed: usize,
    pub near_duplicates: Vec<NearDuplicate>,
    pub sentinel_times: usize,
}

impl BatchReport {
    pub fn has_record_errors(&self) -> bool {
        !self.record_errors.is_empty()
    }
}

/// Run the whole pipeline over `sources` in order: load → locate → normalize
/// per page, then dedup + sort across all pages.
pub fn run_batch(sources: &[SourceFile], state_index: usize) -> (Vec<NormalizedEvent>, BatchReport) {
    ensure_metrics_described();

    let mut report = BatchReport::default();
    let mut all = Vec::new();

    for src in sources {
        report.files_total += 1;
        counter!("extract_files_total").increment(1);
        let t0 = std::time::Instant::now();

        match extract_file(src, state_index) {
            Ok(fo) => {
                histogram!("extract_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                counter!("extract_events_total").increment(fo.events.len() as u64);
                counter!("extract_record_errors_total").increment(fo.record_errors.len() as u64);
                info!(
                    target: "ingest",
                    file = %src.label(),
                    year = src.year,
                    days = fo.days,
                    events = fo.events.len(),
                    record_errors = fo.record_errors.len(),
                    "page extracted"
                );
                for e in &fo.record_errors {
                    warn!(target: "ingest", error = %e, "record rejected");
                }
                report.sentinel_times += fo.sentinel_times;
                report.record_errors.extend(fo.record_errors);
                all.extend(fo.events);
            }
            Err(e) => {
                warn!(target: "ingest", file = %src.label(), error = %e, "page skipped");
                counter!("extract_files_skipped_total").increment(1);
                report.skipped_files.push(e);
            }
        }
    }

    report.events_before_dedup = all.len();
    let d = dedup_and_sort(all);
    report.dedup_removed = d.removed;
    report.near_duplicates = d.near_duplicates;

    counter!("extract_dedup_total").increment(d.removed as u64);
    counter!("extract_near_duplicates_total").increment(report.near_duplicates.len() as u64);

    (d.events, report)
}
