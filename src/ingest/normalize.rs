// src/ingest/normalize.rs
//! Record normalizer: day-group label + raw events → `NormalizedEvent`s.
//!
//! - Date labels carry no year (`Wed Jan 1`); the year comes from the caller.
//!   A weekday that contradicts the year but fits year±1 selects that year
//!   (week views straddling New Year).
//! - Times are 12-hour clock labels or one of the non-clock labels
//!   (`All Day`, `Tentative`, `Day N`, empty), which map to 00:00.
//! - Every datetime is tagged -08:00, daylight saving or not.
//! - Impact indicators map onto the closed set or fail the record.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::ingest::error::ExtractError;
use crate::ingest::normalize_text;
use crate::ingest::types::{Impact, NormalizedEvent, RawDay, RawEvent, TimeKind};

/// Fixed offset stamped on every output datetime (seconds west of UTC).
pub const SOURCE_OFFSET_WEST_SECS: i32 = 8 * 3600;

pub fn source_offset() -> FixedOffset {
    FixedOffset::west_opt(SOURCE_OFFSET_WEST_SECS).expect("offset within ±24h")
}

/// Per-file input the payload itself doesn't carry.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub file: String,
    pub year: i32,
}

/// Result of normalizing one day-group. Errors are per record; the rest of
/// the day still comes through.
#[derive(Debug, Default)]
pub struct DayOutcome {
    pub events: Vec<NormalizedEvent>,
    pub errors: Vec<ExtractError>,
    pub sentinel_times: usize,
}

/* ----------------------------
Time of day
---------------------------- */

static RE_CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*(am|pm)$").expect("clock regex"));
static RE_MULTI_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^day\s*(\d{1,2})$").expect("multi-day regex"));

/// Classify a time label. `None` means the label is none of the recognized forms.
pub fn parse_time_label(label: &str) -> Option<TimeKind> {
    let s = label.trim();
    if s.is_empty() {
        return Some(TimeKind::Unspecified);
    }
    if s.eq_ignore_ascii_case("all day") {
        return Some(TimeKind::AllDay);
    }
    if s.eq_ignore_ascii_case("tentative") {
        return Some(TimeKind::Tentative);
    }
    if let Some(caps) = RE_MULTI_DAY.captures(s) {
        return caps[1].parse::<u8>().ok().map(TimeKind::MultiDay);
    }

    let caps = RE_CLOCK.captures(s)?;
    let hh: u32 = caps[1].parse().ok()?;
    let mm: u32 = caps[2].parse().ok()?;
    if !(1..=12).contains(&hh) {
        return None;
    }
    let pm = caps[3].eq_ignore_ascii_case("pm");
    let hour = match (hh, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, mm, 0).map(TimeKind::Clock)
}

/* ----------------------------
Day-group date
---------------------------- */

static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:([a-z]{3})[a-z]*\.?,?\s+)?([a-z]{3})[a-z]*\.?\s+(\d{1,2})$")
        .expect("date label regex")
});

fn weekday_from_abbr(s: &str) -> Option<Weekday> {
    Some(match s.to_ascii_lowercase().as_str() {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    })
}

fn month_from_abbr(s: &str) -> Option<u32> {
    Some(match s.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    })
}

/// Resolve a day-group label (`Wed Jan 1`, `Wed <span>Jan 1</span>`, `Jan 1`)
/// against the supplied year.
pub fn resolve_day_date(label: &str, year: i32) -> Option<NaiveDate> {
    let clean = normalize_text(label);
    let caps = RE_DATE.captures(&clean)?;

    let weekday = match caps.get(1) {
        Some(m) => Some(weekday_from_abbr(m.as_str())?),
        None => None,
    };
    let month = month_from_abbr(&caps[2])?;
    let day: u32 = caps[3].parse().ok()?;

    let Some(weekday) = weekday else {
        return NaiveDate::from_ymd_opt(year, month, day);
    };

    for y in [year, year + 1, year - 1] {
        if let Some(d) = NaiveDate::from_ymd_opt(y, month, day) {
            if d.weekday() == weekday {
                if y != year {
                    info!(target: "ingest", label = %clean, year, resolved = y, "date label rolled to neighbour year");
                }
                return Some(d);
            }
        }
    }
    None
}

/* ----------------------------
Impact
---------------------------- */

// Keys are lowercase.
const IMPACT_TABLE: &[(&str, Impact)] = &[
    ("high impact expected", Impact::High),
    ("high", Impact::High),
    ("red", Impact::High),
    ("icon--ff-impact-red", Impact::High),
    ("medium impact expected", Impact::Medium),
    ("medium", Impact::Medium),
    ("orange", Impact::Medium),
    ("ora", Impact::Medium),
    ("icon--ff-impact-ora", Impact::Medium),
    ("low impact expected", Impact::Low),
    ("low", Impact::Low),
    ("yellow", Impact::Low),
    ("yel", Impact::Low),
    ("icon--ff-impact-yel", Impact::Low),
    ("non-economic", Impact::NonEconomic),
    ("non economic", Impact::NonEconomic),
    ("holiday", Impact::NonEconomic),
    ("gray", Impact::NonEconomic),
    ("grey", Impact::NonEconomic),
    ("gra", Impact::NonEconomic),
    ("icon--ff-impact-gra", Impact::NonEconomic),
];

fn lookup_impact(key: &str) -> Option<Impact> {
    let key = key.trim().to_ascii_lowercase();
    IMPACT_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

/// Map one raw indicator onto the closed set.
///
/// A class list (`icon icon--ff-impact-red`) resolves only when every token
/// is either the bare `icon` class or a known indicator, and all known
/// tokens agree.
pub fn map_impact(indicator: &str) -> Option<Impact> {
    if let Some(i) = lookup_impact(indicator) {
        return Some(i);
    }
    let mut found: Option<Impact> = None;
    for tok in indicator.split_whitespace() {
        if tok.eq_ignore_ascii_case("icon") {
            continue;
        }
        let i = lookup_impact(tok)?;
        match found {
            Some(prev) if prev != i => return None,
            _ => found = Some(i),
        }
    }
    found
}

/// Closest known indicator, for error messages only.
pub fn closest_impact_key(indicator: &str) -> Option<String> {
    let key = indicator.trim().to_ascii_lowercase();
    IMPACT_TABLE
        .iter()
        .map(|(k, _)| (*k, strsim::jaro_winkler(k, &key)))
        .filter(|(_, score)| *score >= 0.75)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k.to_string())
}

enum ImpactProblem {
    Unmapped(String),
    Conflicting(Vec<String>),
}

/// Every non-empty indicator on the event must map, and to the same label.
fn resolve_impact(ev: &RawEvent) -> Result<Impact, ImpactProblem> {
    let candidates = ev.impact_candidates();
    let mut resolved: Option<Impact> = None;
    for c in &candidates {
        let i = map_impact(c).ok_or_else(|| ImpactProblem::Unmapped(c.to_string()))?;
        match resolved {
            Some(prev) if prev != i => {
                return Err(ImpactProblem::Conflicting(
                    candidates.iter().map(|s| s.to_string()).collect(),
                ));
            }
            _ => resolved = Some(i),
        }
    }
    resolved.ok_or_else(|| ImpactProblem::Unmapped(String::new()))
}

/* ----------------------------
Records
---------------------------- */

fn stamp(date: NaiveDate, time: NaiveTime) -> Option<DateTime<FixedOffset>> {
    source_offset()
        .from_local_datetime(&date.and_time(time))
        .single()
}

/// Normalize one raw event that belongs to an already resolved day.
pub fn normalize_event(
    ctx: &FileContext,
    day_label: &str,
    date: NaiveDate,
    ev: &RawEvent,
) -> Result<(NormalizedEvent, TimeKind), ExtractError> {
    let event = ev.name.trim().to_string();

    let kind = parse_time_label(&ev.time_label).ok_or_else(|| ExtractError::UnparseableTime {
        file: ctx.file.clone(),
        day: day_label.to_string(),
        event: event.clone(),
        time: ev.time_label.clone(),
    })?;

    let impact = resolve_impact(ev).map_err(|problem| match problem {
        ImpactProblem::Unmapped(indicator) => ExtractError::UnmappedImpact {
            file: ctx.file.clone(),
            day: day_label.to_string(),
            event: event.clone(),
            hint: closest_impact_key(&indicator),
            indicator,
        },
        ImpactProblem::Conflicting(indicators) => ExtractError::ConflictingImpact {
            file: ctx.file.clone(),
            day: day_label.to_string(),
            event: event.clone(),
            indicators,
        },
    })?;

    let datetime = stamp(date, kind.time_of_day()).ok_or_else(|| ExtractError::UnparseableDate {
        file: ctx.file.clone(),
        day: day_label.to_string(),
        year: ctx.year,
    })?;

    let out = NormalizedEvent {
        datetime,
        currency: ev.currency.trim().to_string(),
        impact,
        event,
        actual: ev.actual.trim().to_string(),
        forecast: ev.forecast.trim().to_string(),
        previous: ev.previous.trim().to_string(),
        detail: ev.detail.trim().to_string(),
    };
    Ok((out, kind))
}

/// Normalize a whole day-group, preserving the source order of its events.
pub fn normalize_day(ctx: &FileContext, day: &RawDay) -> DayOutcome {
    let mut outcome = DayOutcome::default();
    let label = normalize_text(&day.date);

    let Some(date) = resolve_day_date(&day.date, ctx.year) else {
        if !day.events.is_empty() {
            outcome.errors.push(ExtractError::UnparseableDate {
                file: ctx.file.clone(),
                day: label,
                year: ctx.year,
            });
        }
        return outcome;
    };

    for ev in &day.events {
        match normalize_event(ctx, &label, date, ev) {
            Ok((rec, kind)) => {
                if kind.is_sentinel() {
                    outcome.sentinel_times += 1;
                    debug!(target: "ingest", file = %ctx.file, day = %label, event = %rec.event, ?kind, "non-clock time, using 00:00");
                }
                outcome.events.push(rec);
            }
            Err(e) => outcome.errors.push(e),
        }
    }
    outcome
}
